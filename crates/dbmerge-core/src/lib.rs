//! Core contracts for dbmerge.
//!
//! This crate defines the schema snapshot types compared by the merge engine
//! (tables, columns, relationships, procedures and the object layer mapped on
//! top of them), plus validation helpers shared by the engine and the CLI.

pub mod constraints;
pub mod error;
pub mod mapping;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{DbJoin, DbRelationship};
pub use error::{Error, Result};
pub use mapping::{ObjAttribute, ObjEntity, ObjRelationship};
pub use schema::{
    DataMap, DbAttribute, DbEntity, EntityKind, Procedure, ProcedureParameter, TableRef,
};
pub use types::{ParameterDirection, SqlType};
pub use validation::validate_data_map;

/// Current contract version for snapshot files.
pub const SNAPSHOT_VERSION: &str = "0.1";
