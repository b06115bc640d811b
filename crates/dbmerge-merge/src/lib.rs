//! Schema merge engine: diffs a reference model against a database
//! snapshot and produces ordered, reversible change tokens.

pub mod adapter;
pub mod apply;
pub mod context;
pub mod dictionary;
pub mod diff;
pub mod error;
pub mod filters;
pub mod merger;
pub mod naming;
pub mod orchestrator;
pub mod report;
pub mod support;
pub mod token;
pub mod value_for_null;

pub use adapter::{DbAdapter, GenericAdapter, PostgresAdapter};
pub use apply::{ApplyPolicy, apply_tokens, reverse_tokens};
pub use context::{
    DefaultModelMergeDelegate, MergerContext, ModelMergeDelegate, RecordingExecutor,
    SharedDataMap, SqlExecutor, lock_model,
};
pub use diff::{DictionaryDiff, DiffPair};
pub use error::{MergeError, Result};
pub use filters::{Filters, FiltersConfig, PatternFilter, SchemaFilter};
pub use naming::{DefaultNameGenerator, ObjectNameGenerator, unique_name};
pub use orchestrator::{DataMapMerger, DataMapMergerBuilder};
pub use report::{IssueSeverity, ValidationIssue, ValidationReport};
pub use support::{EntityMergeListener, EntityMergeSupport};
pub use token::{
    Change, DefaultTokenFactory, MergeDirection, MergerToken, MergerTokenFactory, TokenRecord,
    compare_tokens, sort_tokens,
};
pub use value_for_null::{EmptyValueForNullProvider, StaticValueForNullProvider, ValueForNullProvider};
