//! Change tokens: one directional, reversible unit of schema change.

mod factory;
mod model;

use std::cmp::Ordering;
use std::fmt;

use dbmerge_core::{DbAttribute, DbEntity, DbRelationship, Procedure, TableRef};
use serde::Serialize;
use tracing::{debug, warn};

use crate::adapter::DbAdapter;
use crate::context::MergerContext;
use crate::report::{IssueSeverity, ValidationIssue};

pub use factory::{DefaultTokenFactory, MergerTokenFactory};

/// Which side a token changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDirection {
    /// Change the database to match the reference model.
    ToDb,
    /// Change the reference model to match the database.
    ToModel,
}

impl MergeDirection {
    pub fn reverse(self) -> Self {
        match self {
            Self::ToDb => Self::ToModel,
            Self::ToModel => Self::ToDb,
        }
    }
}

impl fmt::Display for MergeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToDb => f.write_str("To DB"),
            Self::ToModel => f.write_str("To Model"),
        }
    }
}

/// What a token changes. Payloads are owned snapshots of the objects involved.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CreateTable {
        entity: DbEntity,
    },
    DropTable {
        entity: DbEntity,
    },
    AddColumn {
        table: TableRef,
        column: DbAttribute,
    },
    DropColumn {
        table: TableRef,
        column: DbAttribute,
    },
    SetNotNull {
        table: TableRef,
        column: DbAttribute,
    },
    SetAllowNull {
        table: TableRef,
        column: DbAttribute,
    },
    /// Backfill existing NULLs before a NOT NULL constraint is added.
    SetValueForNull {
        table: TableRef,
        column: DbAttribute,
        value: String,
    },
    /// `from` is the column as the changed side currently has it, `to` the
    /// definition it should end up with.
    SetColumnType {
        table: TableRef,
        from: DbAttribute,
        to: DbAttribute,
    },
    SetGeneratedFlag {
        table: TableRef,
        column: DbAttribute,
        generated: bool,
    },
    SetPrimaryKey {
        table: TableRef,
        old_columns: Vec<String>,
        new_columns: Vec<String>,
        constraint_name: Option<String>,
    },
    AddRelationship {
        source: TableRef,
        target: TableRef,
        relationship: DbRelationship,
    },
    DropRelationship {
        source: TableRef,
        target: TableRef,
        relationship: DbRelationship,
    },
    AddProcedure {
        procedure: Procedure,
    },
    DropProcedure {
        procedure: Procedure,
    },
}

impl Change {
    /// Human-readable kind label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "Create Table",
            Self::DropTable { .. } => "Drop Table",
            Self::AddColumn { .. } => "Add Column",
            Self::DropColumn { .. } => "Drop Column",
            Self::SetNotNull { .. } => "Set Not Null",
            Self::SetAllowNull { .. } => "Set Allow Null",
            Self::SetValueForNull { .. } => "Set Value For Null",
            Self::SetColumnType { .. } => "Set Column Type",
            Self::SetGeneratedFlag { .. } => "Set Generated Flag",
            Self::SetPrimaryKey { .. } => "Set Primary Key",
            Self::AddRelationship { .. } => "Add Relationship",
            Self::DropRelationship { .. } => "Drop Relationship",
            Self::AddProcedure { .. } => "Add Procedure",
            Self::DropProcedure { .. } => "Drop Procedure",
        }
    }

    /// Name of the table (or procedure) the change belongs to.
    pub fn entity_name(&self) -> &str {
        match self {
            Self::CreateTable { entity } | Self::DropTable { entity } => &entity.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::SetNotNull { table, .. }
            | Self::SetAllowNull { table, .. }
            | Self::SetValueForNull { table, .. }
            | Self::SetColumnType { table, .. }
            | Self::SetGeneratedFlag { table, .. }
            | Self::SetPrimaryKey { table, .. } => &table.name,
            Self::AddRelationship { source, .. } | Self::DropRelationship { source, .. } => {
                &source.name
            }
            Self::AddProcedure { procedure } | Self::DropProcedure { procedure } => {
                &procedure.name
            }
        }
    }

    /// Column or relationship target inside the entity, if any.
    fn sub_name(&self) -> &str {
        match self {
            Self::AddColumn { column, .. }
            | Self::DropColumn { column, .. }
            | Self::SetNotNull { column, .. }
            | Self::SetAllowNull { column, .. }
            | Self::SetValueForNull { column, .. }
            | Self::SetGeneratedFlag { column, .. } => &column.name,
            Self::SetColumnType { to, .. } => &to.name,
            Self::AddRelationship { target, .. } | Self::DropRelationship { target, .. } => {
                &target.name
            }
            _ => "",
        }
    }

    /// Position of the change in a constraint-safe `TO_DB` run. Foreign keys
    /// are dropped first and added last.
    fn weight(&self) -> u32 {
        match self {
            Self::DropRelationship { .. } => 10,
            Self::DropProcedure { .. } => 20,
            Self::DropColumn { .. } => 30,
            Self::DropTable { .. } => 40,
            Self::CreateTable { .. } => 50,
            Self::AddColumn { .. } => 60,
            Self::SetColumnType { .. } => 70,
            Self::SetAllowNull { .. } => 80,
            Self::SetValueForNull { .. } => 90,
            Self::SetNotNull { .. } => 100,
            Self::SetGeneratedFlag { .. } => 110,
            Self::SetPrimaryKey { .. } => 120,
            Self::AddProcedure { .. } => 130,
            Self::AddRelationship { .. } => 1000,
        }
    }
}

/// A directional, reversible unit of change.
#[derive(Debug, Clone, PartialEq)]
pub struct MergerToken {
    direction: MergeDirection,
    change: Change,
}

impl MergerToken {
    pub fn new(direction: MergeDirection, change: Change) -> Self {
        Self { direction, change }
    }

    pub fn direction(&self) -> MergeDirection {
        self.direction
    }

    pub fn change(&self) -> &Change {
        &self.change
    }

    pub fn token_name(&self) -> &'static str {
        self.change.name()
    }

    /// Longer description of the target, e.g. `PERSON.EMAIL` or
    /// `PAINTING->ARTIST`.
    pub fn token_value(&self) -> String {
        match &self.change {
            Change::CreateTable { entity } | Change::DropTable { entity } => entity.name.clone(),
            Change::AddColumn { table, column }
            | Change::DropColumn { table, column }
            | Change::SetNotNull { table, column }
            | Change::SetAllowNull { table, column }
            | Change::SetValueForNull { table, column, .. }
            | Change::SetGeneratedFlag { table, column, .. } => {
                format!("{}.{}", table.name, column.name)
            }
            Change::SetColumnType { table, to, .. } => format!("{}.{}", table.name, to.name),
            Change::SetPrimaryKey { table, .. } => table.name.clone(),
            Change::AddRelationship { source, target, .. }
            | Change::DropRelationship { source, target, .. } => {
                format!("{}->{}", source.name, target.name)
            }
            Change::AddProcedure { procedure } | Change::DropProcedure { procedure } => {
                procedure.name.clone()
            }
        }
    }

    /// `<name> <value>` label used in reports.
    pub fn label(&self) -> String {
        format!("{} {}", self.token_name(), self.token_value())
    }

    /// SQL statements for a `TO_DB` token. `TO_MODEL` tokens and changes the
    /// dialect cannot express yield an empty list.
    pub fn create_sql(&self, adapter: &dyn DbAdapter) -> Vec<String> {
        if self.direction == MergeDirection::ToModel {
            return Vec::new();
        }
        match &self.change {
            Change::CreateTable { entity } => {
                let mut sql = vec![adapter.create_table_sql(entity)];
                sql.extend(adapter.auto_pk_sql(entity));
                sql
            }
            Change::DropTable { entity } => {
                let mut sql = adapter.drop_table_sql(entity);
                sql.extend(adapter.drop_auto_pk_sql(entity));
                sql
            }
            Change::AddColumn { table, column } => adapter.add_column_sql(table, column),
            Change::DropColumn { table, column } => adapter.drop_column_sql(table, column),
            Change::SetNotNull { table, column } => adapter.set_not_null_sql(table, column),
            Change::SetAllowNull { table, column } => adapter.set_allow_null_sql(table, column),
            Change::SetValueForNull {
                table,
                column,
                value,
            } => adapter.value_for_null_sql(table, column, value),
            Change::SetColumnType { table, from, to } => {
                adapter.set_column_type_sql(table, from, to)
            }
            Change::SetGeneratedFlag {
                table,
                column,
                generated,
            } => adapter.set_generated_sql(table, column, *generated),
            Change::SetPrimaryKey {
                table,
                new_columns,
                constraint_name,
                ..
            } => adapter.set_primary_key_sql(table, new_columns, constraint_name.as_deref()),
            Change::AddRelationship {
                source,
                target,
                relationship,
            } => adapter.add_foreign_key_sql(source, target, relationship),
            Change::DropRelationship {
                source,
                relationship,
                ..
            } => adapter.drop_foreign_key_sql(source, relationship),
            Change::AddProcedure { procedure } => adapter.create_procedure_sql(procedure),
            Change::DropProcedure { procedure } => adapter.drop_procedure_sql(procedure),
        }
    }

    /// Apply the token. `TO_DB` tokens run their SQL through the context's
    /// executor; `TO_MODEL` tokens mutate the shared model. Failures are
    /// recorded in the context's validation report, never returned.
    pub fn execute(&self, ctx: &mut MergerContext) {
        match self.direction {
            MergeDirection::ToDb => self.execute_sql(ctx),
            MergeDirection::ToModel => {
                if let Err(err) = model::apply(&self.change, ctx) {
                    warn!(token = %self.label(), error = %err, "model token failed");
                    ctx.validation.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "model_update_failed",
                        self.label(),
                        err.to_string(),
                        None,
                    ));
                }
            }
        }
    }

    fn execute_sql(&self, ctx: &mut MergerContext) {
        let statements = self.create_sql(ctx.adapter.as_ref());
        if statements.is_empty() {
            debug!(token = %self.label(), "no sql for token");
            return;
        }
        let Some(executor) = ctx.executor.as_mut() else {
            ctx.validation.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "no_executor",
                self.label(),
                "no sql executor configured",
                Some("attach an executor to the merge context".to_string()),
            ));
            return;
        };
        for sql in statements {
            if let Err(message) = executor.execute(&sql) {
                warn!(token = %self.label(), sql = %sql, error = %message, "sql failed");
                ctx.validation.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "sql_failed",
                    self.label(),
                    message,
                    Some(sql),
                ));
            }
        }
    }

    /// The opposite-direction token that undoes this one.
    pub fn create_reverse(&self, factory: &dyn MergerTokenFactory) -> MergerToken {
        let direction = self.direction.reverse();
        match (&self.change, direction) {
            (Change::CreateTable { entity }, MergeDirection::ToDb) => {
                factory.drop_table_to_db(entity)
            }
            (Change::CreateTable { entity }, MergeDirection::ToModel) => {
                factory.drop_table_to_model(entity)
            }
            (Change::DropTable { entity }, MergeDirection::ToDb) => {
                factory.create_table_to_db(entity)
            }
            (Change::DropTable { entity }, MergeDirection::ToModel) => {
                factory.create_table_to_model(entity)
            }
            (Change::AddColumn { table, column }, MergeDirection::ToDb) => {
                factory.drop_column_to_db(table, column)
            }
            (Change::AddColumn { table, column }, MergeDirection::ToModel) => {
                factory.drop_column_to_model(table, column)
            }
            (Change::DropColumn { table, column }, MergeDirection::ToDb) => {
                factory.add_column_to_db(table, column)
            }
            (Change::DropColumn { table, column }, MergeDirection::ToModel) => {
                factory.add_column_to_model(table, column)
            }
            (Change::SetNotNull { table, column }, MergeDirection::ToDb) => {
                factory.set_allow_null_to_db(table, column)
            }
            (Change::SetNotNull { table, column }, MergeDirection::ToModel) => {
                factory.set_allow_null_to_model(table, column)
            }
            (Change::SetAllowNull { table, column }, MergeDirection::ToDb) => {
                factory.set_not_null_to_db(table, column)
            }
            (Change::SetAllowNull { table, column }, MergeDirection::ToModel) => {
                factory.set_not_null_to_model(table, column)
            }
            (
                Change::SetValueForNull {
                    table,
                    column,
                    value,
                },
                MergeDirection::ToDb,
            ) => factory.set_value_for_null_to_db(table, column, value),
            (
                Change::SetValueForNull {
                    table,
                    column,
                    value,
                },
                MergeDirection::ToModel,
            ) => factory.set_value_for_null_to_model(table, column, value),
            (Change::SetColumnType { table, from, to }, MergeDirection::ToDb) => {
                factory.set_column_type_to_db(table, to, from)
            }
            (Change::SetColumnType { table, from, to }, MergeDirection::ToModel) => {
                factory.set_column_type_to_model(table, to, from)
            }
            (
                Change::SetGeneratedFlag {
                    table,
                    column,
                    generated,
                },
                MergeDirection::ToDb,
            ) => factory.set_generated_flag_to_db(table, column, !generated),
            (
                Change::SetGeneratedFlag {
                    table,
                    column,
                    generated,
                },
                MergeDirection::ToModel,
            ) => factory.set_generated_flag_to_model(table, column, !generated),
            (
                Change::SetPrimaryKey {
                    table,
                    old_columns,
                    new_columns,
                    constraint_name,
                },
                MergeDirection::ToDb,
            ) => factory.set_primary_key_to_db(
                table,
                new_columns,
                old_columns,
                constraint_name.as_deref(),
            ),
            (
                Change::SetPrimaryKey {
                    table,
                    old_columns,
                    new_columns,
                    constraint_name,
                },
                MergeDirection::ToModel,
            ) => factory.set_primary_key_to_model(
                table,
                new_columns,
                old_columns,
                constraint_name.as_deref(),
            ),
            (
                Change::AddRelationship {
                    source,
                    target,
                    relationship,
                },
                MergeDirection::ToDb,
            ) => factory.drop_relationship_to_db(source, target, relationship),
            (
                Change::AddRelationship {
                    source,
                    target,
                    relationship,
                },
                MergeDirection::ToModel,
            ) => factory.drop_relationship_to_model(source, target, relationship),
            (
                Change::DropRelationship {
                    source,
                    target,
                    relationship,
                },
                MergeDirection::ToDb,
            ) => factory.add_relationship_to_db(source, target, relationship),
            (
                Change::DropRelationship {
                    source,
                    target,
                    relationship,
                },
                MergeDirection::ToModel,
            ) => factory.add_relationship_to_model(source, target, relationship),
            (Change::AddProcedure { procedure }, MergeDirection::ToDb) => {
                factory.drop_procedure_to_db(procedure)
            }
            (Change::AddProcedure { procedure }, MergeDirection::ToModel) => {
                factory.drop_procedure_to_model(procedure)
            }
            (Change::DropProcedure { procedure }, MergeDirection::ToDb) => {
                factory.add_procedure_to_db(procedure)
            }
            (Change::DropProcedure { procedure }, MergeDirection::ToModel) => {
                factory.add_procedure_to_model(procedure)
            }
        }
    }

    /// Serializable summary of the token with its rendered SQL.
    pub fn record(&self, adapter: &dyn DbAdapter) -> TokenRecord {
        TokenRecord {
            direction: self.direction,
            name: self.token_name().to_string(),
            value: self.token_value(),
            sql: self.create_sql(adapter),
        }
    }
}

impl fmt::Display for MergerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.token_name(),
            self.token_value(),
            self.direction
        )
    }
}

/// Token summary written to run directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub direction: MergeDirection,
    pub name: String,
    pub value: String,
    pub sql: Vec<String>,
}

/// Global token order.
///
/// `TO_DB` tokens sort before `TO_MODEL` ones and among themselves by kind,
/// then entity name and column/target name, ignoring case. `TO_MODEL` tokens
/// compare equal so a stable sort keeps their generation order.
pub fn compare_tokens(a: &MergerToken, b: &MergerToken) -> Ordering {
    match (a.direction, b.direction) {
        (MergeDirection::ToModel, MergeDirection::ToModel) => Ordering::Equal,
        (MergeDirection::ToDb, MergeDirection::ToModel) => Ordering::Less,
        (MergeDirection::ToModel, MergeDirection::ToDb) => Ordering::Greater,
        (MergeDirection::ToDb, MergeDirection::ToDb) => a
            .change
            .weight()
            .cmp(&b.change.weight())
            .then_with(|| cmp_ignore_case(a.change.entity_name(), b.change.entity_name()))
            .then_with(|| cmp_ignore_case(a.change.sub_name(), b.change.sub_name())),
    }
}

/// Stable sort by [`compare_tokens`].
pub fn sort_tokens(tokens: &mut [MergerToken]) {
    tokens.sort_by(compare_tokens);
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use dbmerge_core::{DbJoin, SqlType};

    use super::*;
    use crate::adapter::GenericAdapter;

    fn person() -> TableRef {
        TableRef::new(None, None, "PERSON")
    }

    fn artist_relationship() -> (TableRef, TableRef, DbRelationship) {
        (
            TableRef::new(None, None, "PAINTING"),
            TableRef::new(None, None, "ARTIST"),
            DbRelationship {
                name: "toArtist".to_string(),
                target_entity: "ARTIST".to_string(),
                to_many: false,
                to_dependent_pk: false,
                fk_name: Some("fk_painting_artist".to_string()),
                joins: vec![DbJoin::new("ARTIST_ID", "ID")],
            },
        )
    }

    #[test]
    fn add_column_sorts_before_add_relationship() {
        let factory = DefaultTokenFactory;
        let (source, target, relationship) = artist_relationship();
        let mut tokens = vec![
            factory.add_relationship_to_db(&source, &target, &relationship),
            factory.add_column_to_db(&person(), &DbAttribute::new("EMAIL", SqlType::Varchar)),
        ];
        sort_tokens(&mut tokens);
        assert_eq!(tokens[0].token_name(), "Add Column");
        assert_eq!(tokens[1].token_name(), "Add Relationship");
    }

    #[test]
    fn drop_relationship_sorts_before_drop_column() {
        let factory = DefaultTokenFactory;
        let (source, target, relationship) = artist_relationship();
        let mut tokens = vec![
            factory.drop_column_to_db(&source, &DbAttribute::new("ARTIST_ID", SqlType::Integer)),
            factory.drop_relationship_to_db(&source, &target, &relationship),
        ];
        sort_tokens(&mut tokens);
        assert_eq!(tokens[0].token_name(), "Drop Relationship");
        assert_eq!(
            compare_tokens(&tokens[1], &tokens[0]),
            Ordering::Greater
        );
    }

    #[test]
    fn model_tokens_keep_generation_order() {
        let factory = DefaultTokenFactory;
        let mut tokens = vec![
            factory.drop_table_to_model(&DbEntity::new("ZEBRA")),
            factory.create_table_to_db(&DbEntity::new("PERSON")),
            factory.drop_table_to_model(&DbEntity::new("ALPHA")),
        ];
        sort_tokens(&mut tokens);
        let values: Vec<_> = tokens.iter().map(MergerToken::token_value).collect();
        assert_eq!(values, ["PERSON", "ZEBRA", "ALPHA"]);
    }

    #[test]
    fn reverse_of_reverse_targets_same_object() {
        let factory = DefaultTokenFactory;
        let from = DbAttribute::new("NAME", SqlType::Varchar);
        let mut to = from.clone();
        to.max_length = Some(100);
        let tokens = vec![
            factory.create_table_to_db(&DbEntity::new("PERSON")),
            factory.set_column_type_to_db(&person(), &from, &to),
            factory.set_generated_flag_to_db(&person(), &from, true),
            factory.set_primary_key_to_db(
                &person(),
                &["ID".to_string()],
                &["ID".to_string(), "CODE".to_string()],
                Some("person_pk"),
            ),
        ];
        for token in tokens {
            let reversed = token.create_reverse(&factory);
            assert_eq!(reversed.direction(), MergeDirection::ToModel);
            assert_eq!(reversed.create_reverse(&factory), token);
        }
    }

    #[test]
    fn create_table_reverses_to_drop_table_to_model() {
        let factory = DefaultTokenFactory;
        let token = factory.create_table_to_db(&DbEntity::new("PERSON"));
        let reversed = token.create_reverse(&factory);
        assert_eq!(reversed.token_name(), "Drop Table");
        assert_eq!(reversed.direction(), MergeDirection::ToModel);
        assert!(reversed.create_sql(&GenericAdapter::default()).is_empty());
    }

    #[test]
    fn labels_describe_target() {
        let factory = DefaultTokenFactory;
        let (source, target, relationship) = artist_relationship();
        let token = factory.add_relationship_to_db(&source, &target, &relationship);
        assert_eq!(token.token_value(), "PAINTING->ARTIST");
        assert_eq!(token.to_string(), "Add Relationship PAINTING->ARTIST (To DB)");
    }
}
