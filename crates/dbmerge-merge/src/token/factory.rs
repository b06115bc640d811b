use dbmerge_core::{DbAttribute, DbEntity, DbRelationship, Procedure, TableRef};

use super::{Change, MergeDirection, MergerToken};

/// Builds tokens. Every kind and direction has its own constructor so a
/// dialect can swap out individual ones; the defaults just wrap the payload.
pub trait MergerTokenFactory: Send + Sync {
    fn create_table_to_db(&self, entity: &DbEntity) -> MergerToken {
        to_db(Change::CreateTable {
            entity: entity.clone(),
        })
    }

    fn create_table_to_model(&self, entity: &DbEntity) -> MergerToken {
        to_model(Change::CreateTable {
            entity: entity.clone(),
        })
    }

    fn drop_table_to_db(&self, entity: &DbEntity) -> MergerToken {
        to_db(Change::DropTable {
            entity: entity.clone(),
        })
    }

    fn drop_table_to_model(&self, entity: &DbEntity) -> MergerToken {
        to_model(Change::DropTable {
            entity: entity.clone(),
        })
    }

    fn add_column_to_db(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_db(Change::AddColumn {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn add_column_to_model(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_model(Change::AddColumn {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn drop_column_to_db(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_db(Change::DropColumn {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn drop_column_to_model(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_model(Change::DropColumn {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn set_not_null_to_db(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_db(Change::SetNotNull {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn set_not_null_to_model(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_model(Change::SetNotNull {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn set_allow_null_to_db(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_db(Change::SetAllowNull {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn set_allow_null_to_model(&self, table: &TableRef, column: &DbAttribute) -> MergerToken {
        to_model(Change::SetAllowNull {
            table: table.clone(),
            column: column.clone(),
        })
    }

    fn set_value_for_null_to_db(
        &self,
        table: &TableRef,
        column: &DbAttribute,
        value: &str,
    ) -> MergerToken {
        to_db(Change::SetValueForNull {
            table: table.clone(),
            column: column.clone(),
            value: value.to_string(),
        })
    }

    fn set_value_for_null_to_model(
        &self,
        table: &TableRef,
        column: &DbAttribute,
        value: &str,
    ) -> MergerToken {
        to_model(Change::SetValueForNull {
            table: table.clone(),
            column: column.clone(),
            value: value.to_string(),
        })
    }

    fn set_column_type_to_db(
        &self,
        table: &TableRef,
        from: &DbAttribute,
        to: &DbAttribute,
    ) -> MergerToken {
        to_db(Change::SetColumnType {
            table: table.clone(),
            from: from.clone(),
            to: to.clone(),
        })
    }

    fn set_column_type_to_model(
        &self,
        table: &TableRef,
        from: &DbAttribute,
        to: &DbAttribute,
    ) -> MergerToken {
        to_model(Change::SetColumnType {
            table: table.clone(),
            from: from.clone(),
            to: to.clone(),
        })
    }

    fn set_generated_flag_to_db(
        &self,
        table: &TableRef,
        column: &DbAttribute,
        generated: bool,
    ) -> MergerToken {
        to_db(Change::SetGeneratedFlag {
            table: table.clone(),
            column: column.clone(),
            generated,
        })
    }

    fn set_generated_flag_to_model(
        &self,
        table: &TableRef,
        column: &DbAttribute,
        generated: bool,
    ) -> MergerToken {
        to_model(Change::SetGeneratedFlag {
            table: table.clone(),
            column: column.clone(),
            generated,
        })
    }

    fn set_primary_key_to_db(
        &self,
        table: &TableRef,
        old_columns: &[String],
        new_columns: &[String],
        constraint_name: Option<&str>,
    ) -> MergerToken {
        to_db(Change::SetPrimaryKey {
            table: table.clone(),
            old_columns: old_columns.to_vec(),
            new_columns: new_columns.to_vec(),
            constraint_name: constraint_name.map(str::to_string),
        })
    }

    fn set_primary_key_to_model(
        &self,
        table: &TableRef,
        old_columns: &[String],
        new_columns: &[String],
        constraint_name: Option<&str>,
    ) -> MergerToken {
        to_model(Change::SetPrimaryKey {
            table: table.clone(),
            old_columns: old_columns.to_vec(),
            new_columns: new_columns.to_vec(),
            constraint_name: constraint_name.map(str::to_string),
        })
    }

    fn add_relationship_to_db(
        &self,
        source: &TableRef,
        target: &TableRef,
        relationship: &DbRelationship,
    ) -> MergerToken {
        to_db(Change::AddRelationship {
            source: source.clone(),
            target: target.clone(),
            relationship: relationship.clone(),
        })
    }

    fn add_relationship_to_model(
        &self,
        source: &TableRef,
        target: &TableRef,
        relationship: &DbRelationship,
    ) -> MergerToken {
        to_model(Change::AddRelationship {
            source: source.clone(),
            target: target.clone(),
            relationship: relationship.clone(),
        })
    }

    fn drop_relationship_to_db(
        &self,
        source: &TableRef,
        target: &TableRef,
        relationship: &DbRelationship,
    ) -> MergerToken {
        to_db(Change::DropRelationship {
            source: source.clone(),
            target: target.clone(),
            relationship: relationship.clone(),
        })
    }

    fn drop_relationship_to_model(
        &self,
        source: &TableRef,
        target: &TableRef,
        relationship: &DbRelationship,
    ) -> MergerToken {
        to_model(Change::DropRelationship {
            source: source.clone(),
            target: target.clone(),
            relationship: relationship.clone(),
        })
    }

    fn add_procedure_to_db(&self, procedure: &Procedure) -> MergerToken {
        to_db(Change::AddProcedure {
            procedure: procedure.clone(),
        })
    }

    fn add_procedure_to_model(&self, procedure: &Procedure) -> MergerToken {
        to_model(Change::AddProcedure {
            procedure: procedure.clone(),
        })
    }

    fn drop_procedure_to_db(&self, procedure: &Procedure) -> MergerToken {
        to_db(Change::DropProcedure {
            procedure: procedure.clone(),
        })
    }

    fn drop_procedure_to_model(&self, procedure: &Procedure) -> MergerToken {
        to_model(Change::DropProcedure {
            procedure: procedure.clone(),
        })
    }
}

/// Factory with the stock constructors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenFactory;

impl MergerTokenFactory for DefaultTokenFactory {}

fn to_db(change: Change) -> MergerToken {
    MergerToken::new(MergeDirection::ToDb, change)
}

fn to_model(change: Change) -> MergerToken {
    MergerToken::new(MergeDirection::ToModel, change)
}
