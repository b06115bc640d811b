//! SQL rendering per dialect.
//!
//! Every method returns the statements for one change. A dialect that cannot
//! express a change returns an empty list and the token becomes a no-op.

use dbmerge_core::{DbAttribute, DbEntity, DbRelationship, Procedure, SqlType, TableRef};

pub trait DbAdapter: Send + Sync {
    fn name(&self) -> &str {
        "generic"
    }

    fn quote_identifiers(&self) -> bool {
        false
    }

    fn quote(&self, identifier: &str) -> String {
        if self.quote_identifiers() {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        } else {
            identifier.to_string()
        }
    }

    fn qualified(&self, table: &TableRef) -> String {
        table
            .parts()
            .into_iter()
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn type_name(&self, sql_type: SqlType) -> String {
        sql_type.sql_name().to_string()
    }

    fn type_supports_length(&self, sql_type: SqlType) -> bool {
        sql_type.supports_length()
    }

    /// Type with its length or precision/scale suffix, e.g. `VARCHAR(40)`.
    fn column_type(&self, column: &DbAttribute) -> String {
        let name = self.type_name(column.sql_type);
        if self.type_supports_length(column.sql_type) {
            if let Some(length) = column.max_length.filter(|length| *length > 0) {
                return format!("{name}({length})");
            }
        }
        if column.sql_type.is_decimal() {
            if let Some(precision) = column.precision.filter(|precision| *precision > 0) {
                return match column.scale.filter(|scale| *scale >= 0) {
                    Some(scale) => format!("{name}({precision}, {scale})"),
                    None => format!("{name}({precision})"),
                };
            }
        }
        name
    }

    fn column_definition(&self, column: &DbAttribute) -> String {
        let null = if column.mandatory { "NOT NULL" } else { "NULL" };
        format!("{} {} {null}", self.quote(&column.name), self.column_type(column))
    }

    fn create_table_sql(&self, entity: &DbEntity) -> String {
        let mut parts: Vec<String> = entity
            .attributes
            .iter()
            .map(|column| self.column_definition(column))
            .collect();
        let pk: Vec<String> = entity
            .primary_keys()
            .iter()
            .map(|column| self.quote(&column.name))
            .collect();
        if !pk.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        format!(
            "CREATE TABLE {} ({})",
            self.qualified(&entity.table_ref()),
            parts.join(", ")
        )
    }

    fn drop_table_sql(&self, entity: &DbEntity) -> Vec<String> {
        vec![format!("DROP TABLE {}", self.qualified(&entity.table_ref()))]
    }

    /// Statements that set up primary key generation for a new table.
    fn auto_pk_sql(&self, _entity: &DbEntity) -> Vec<String> {
        Vec::new()
    }

    fn drop_auto_pk_sql(&self, _entity: &DbEntity) -> Vec<String> {
        Vec::new()
    }

    /// New columns are added nullable; a separate token adds the constraint.
    fn add_column_sql(&self, table: &TableRef, column: &DbAttribute) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualified(table),
            self.quote(&column.name),
            self.column_type(column)
        )]
    }

    fn drop_column_sql(&self, table: &TableRef, column: &DbAttribute) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualified(table),
            self.quote(&column.name)
        )]
    }

    fn set_not_null_sql(&self, table: &TableRef, column: &DbAttribute) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
            self.qualified(table),
            self.quote(&column.name)
        )]
    }

    fn set_allow_null_sql(&self, table: &TableRef, column: &DbAttribute) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
            self.qualified(table),
            self.quote(&column.name)
        )]
    }

    fn value_for_null_sql(&self, table: &TableRef, column: &DbAttribute, value: &str) -> Vec<String> {
        let column = self.quote(&column.name);
        vec![format!(
            "UPDATE {} SET {column} = {value} WHERE {column} IS NULL",
            self.qualified(table)
        )]
    }

    fn set_column_type_sql(
        &self,
        table: &TableRef,
        _from: &DbAttribute,
        to: &DbAttribute,
    ) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
            self.qualified(table),
            self.quote(&to.name),
            self.column_type(to)
        )]
    }

    /// No portable syntax exists for toggling generation.
    fn set_generated_sql(&self, _table: &TableRef, _column: &DbAttribute, _generated: bool) -> Vec<String> {
        Vec::new()
    }

    fn set_primary_key_sql(
        &self,
        table: &TableRef,
        new_columns: &[String],
        constraint_name: Option<&str>,
    ) -> Vec<String> {
        let table = self.qualified(table);
        let mut sql = Vec::new();
        if let Some(name) = constraint_name {
            sql.push(format!(
                "ALTER TABLE {table} DROP CONSTRAINT {}",
                self.quote(name)
            ));
        }
        if !new_columns.is_empty() {
            let columns: Vec<String> = new_columns.iter().map(|column| self.quote(column)).collect();
            sql.push(format!(
                "ALTER TABLE {table} ADD PRIMARY KEY ({})",
                columns.join(", ")
            ));
        }
        sql
    }

    /// Only to-one relationships onto a non-dependent key map to a foreign key.
    fn add_foreign_key_sql(
        &self,
        source: &TableRef,
        target: &TableRef,
        relationship: &DbRelationship,
    ) -> Vec<String> {
        if relationship.to_many || relationship.to_dependent_pk || relationship.joins.is_empty() {
            return Vec::new();
        }
        let quote_all = |columns: Vec<&str>| {
            columns
                .into_iter()
                .map(|column| self.quote(column))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let constraint = relationship
            .fk_name
            .as_deref()
            .map(|name| format!("CONSTRAINT {} ", self.quote(name)))
            .unwrap_or_default();
        vec![format!(
            "ALTER TABLE {} ADD {constraint}FOREIGN KEY ({}) REFERENCES {} ({})",
            self.qualified(source),
            quote_all(relationship.source_columns()),
            self.qualified(target),
            quote_all(relationship.target_columns())
        )]
    }

    /// Unnamed constraints cannot be dropped portably.
    fn drop_foreign_key_sql(&self, source: &TableRef, relationship: &DbRelationship) -> Vec<String> {
        match relationship.fk_name.as_deref() {
            Some(name) => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.qualified(source),
                self.quote(name)
            )],
            None => Vec::new(),
        }
    }

    /// Procedure bodies are not part of the snapshot.
    fn create_procedure_sql(&self, _procedure: &Procedure) -> Vec<String> {
        Vec::new()
    }

    fn drop_procedure_sql(&self, procedure: &Procedure) -> Vec<String> {
        let table = TableRef::new(
            procedure.catalog.clone(),
            procedure.schema.clone(),
            procedure.name.clone(),
        );
        vec![format!("DROP PROCEDURE {}", self.qualified(&table))]
    }
}

/// ANSI-flavoured rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAdapter {
    pub quote_identifiers: bool,
}

impl DbAdapter for GenericAdapter {
    fn quote_identifiers(&self) -> bool {
        self.quote_identifiers
    }
}

/// PostgreSQL rendering: identity columns, `TYPE` syntax and `pk_<table>`
/// sequences for single integral keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter {
    pub quote_identifiers: bool,
}

/// First value handed out by generated key sequences.
const PK_SEQUENCE_START: i64 = 200;

impl PostgresAdapter {
    fn sequence_name(&self, entity: &DbEntity) -> String {
        let mut table = entity.table_ref();
        table.name = format!("pk_{}", entity.name.to_lowercase());
        self.qualified(&table)
    }

    /// Single integral key that the database does not generate itself.
    fn uses_sequence(entity: &DbEntity) -> bool {
        match entity.primary_keys().as_slice() {
            [pk] => pk.sql_type.is_integral() && !pk.generated,
            _ => false,
        }
    }
}

impl DbAdapter for PostgresAdapter {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_identifiers(&self) -> bool {
        self.quote_identifiers
    }

    fn type_name(&self, sql_type: SqlType) -> String {
        match sql_type {
            SqlType::Bit | SqlType::Boolean => "boolean",
            SqlType::TinyInt | SqlType::SmallInt => "int2",
            SqlType::Integer => "int4",
            SqlType::BigInt => "int8",
            SqlType::Real | SqlType::Float => "float4",
            SqlType::Double => "float8",
            SqlType::Decimal | SqlType::Numeric => "numeric",
            SqlType::Char | SqlType::NChar => "char",
            SqlType::Varchar | SqlType::NVarchar => "varchar",
            SqlType::LongVarchar | SqlType::Clob => "text",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::Timestamp => "timestamp",
            SqlType::Binary
            | SqlType::VarBinary
            | SqlType::LongVarBinary
            | SqlType::Blob => "bytea",
            _ => return sql_type.sql_name().to_lowercase(),
        }
        .to_string()
    }

    fn type_supports_length(&self, sql_type: SqlType) -> bool {
        matches!(
            sql_type,
            SqlType::Char | SqlType::NChar | SqlType::Varchar | SqlType::NVarchar
        )
    }

    fn column_definition(&self, column: &DbAttribute) -> String {
        let null = if column.mandatory { "NOT NULL" } else { "NULL" };
        let identity = if column.generated && column.sql_type.is_integral() {
            " GENERATED BY DEFAULT AS IDENTITY"
        } else {
            ""
        };
        format!(
            "{} {}{identity} {null}",
            self.quote(&column.name),
            self.column_type(column)
        )
    }

    fn drop_table_sql(&self, entity: &DbEntity) -> Vec<String> {
        vec![format!(
            "DROP TABLE {} CASCADE",
            self.qualified(&entity.table_ref())
        )]
    }

    fn auto_pk_sql(&self, entity: &DbEntity) -> Vec<String> {
        if Self::uses_sequence(entity) {
            vec![format!(
                "CREATE SEQUENCE {} START {PK_SEQUENCE_START}",
                self.sequence_name(entity)
            )]
        } else {
            Vec::new()
        }
    }

    fn drop_auto_pk_sql(&self, entity: &DbEntity) -> Vec<String> {
        if Self::uses_sequence(entity) {
            vec![format!(
                "DROP SEQUENCE IF EXISTS {}",
                self.sequence_name(entity)
            )]
        } else {
            Vec::new()
        }
    }

    fn set_column_type_sql(
        &self,
        table: &TableRef,
        _from: &DbAttribute,
        to: &DbAttribute,
    ) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            self.qualified(table),
            self.quote(&to.name),
            self.column_type(to)
        )]
    }

    fn set_generated_sql(&self, table: &TableRef, column: &DbAttribute, generated: bool) -> Vec<String> {
        let action = if generated {
            "ADD GENERATED BY DEFAULT AS IDENTITY"
        } else {
            "DROP IDENTITY IF EXISTS"
        };
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} {action}",
            self.qualified(table),
            self.quote(&column.name)
        )]
    }
}

#[cfg(test)]
mod tests {
    use dbmerge_core::DbJoin;

    use super::*;

    fn person() -> DbEntity {
        let mut entity = DbEntity::new("PERSON");
        entity.schema = Some("public".to_string());
        let mut id = DbAttribute::new("ID", SqlType::Integer);
        id.primary_key = true;
        id.mandatory = true;
        let mut name = DbAttribute::new("NAME", SqlType::Varchar);
        name.max_length = Some(100);
        entity.add_attribute(id);
        entity.add_attribute(name);
        entity
    }

    #[test]
    fn generic_create_table() {
        let adapter = GenericAdapter::default();
        assert_eq!(
            adapter.create_table_sql(&person()),
            "CREATE TABLE public.PERSON (ID INTEGER NOT NULL, NAME VARCHAR(100) NULL, PRIMARY KEY (ID))"
        );
        assert!(adapter.auto_pk_sql(&person()).is_empty());
    }

    #[test]
    fn quoting_escapes_identifiers() {
        let adapter = GenericAdapter {
            quote_identifiers: true,
        };
        assert_eq!(adapter.quote("odd\"name"), "\"odd\"\"name\"");
        assert_eq!(
            adapter.qualified(&person().table_ref()),
            "\"public\".\"PERSON\""
        );
    }

    #[test]
    fn decimal_renders_precision_and_scale() {
        let adapter = GenericAdapter::default();
        let mut price = DbAttribute::new("PRICE", SqlType::Decimal);
        price.precision = Some(10);
        price.scale = Some(2);
        assert_eq!(adapter.column_type(&price), "DECIMAL(10, 2)");
    }

    #[test]
    fn unnamed_foreign_key_cannot_be_dropped() {
        let adapter = GenericAdapter::default();
        let relationship = DbRelationship {
            name: "toArtist".to_string(),
            target_entity: "ARTIST".to_string(),
            to_many: false,
            to_dependent_pk: false,
            fk_name: None,
            joins: vec![DbJoin::new("ARTIST_ID", "ID")],
        };
        let source = TableRef::new(None, None, "PAINTING");
        let target = TableRef::new(None, None, "ARTIST");
        assert!(adapter.drop_foreign_key_sql(&source, &relationship).is_empty());
        assert_eq!(
            adapter.add_foreign_key_sql(&source, &target, &relationship),
            ["ALTER TABLE PAINTING ADD FOREIGN KEY (ARTIST_ID) REFERENCES ARTIST (ID)"]
        );
    }

    #[test]
    fn postgres_sequences_and_type_syntax() {
        let adapter = PostgresAdapter::default();
        let entity = person();
        assert_eq!(
            adapter.auto_pk_sql(&entity),
            ["CREATE SEQUENCE public.pk_person START 200"]
        );
        assert_eq!(
            adapter.drop_table_sql(&entity),
            ["DROP TABLE public.PERSON CASCADE"]
        );

        let mut name = DbAttribute::new("NAME", SqlType::Varchar);
        name.max_length = Some(200);
        assert_eq!(
            adapter.set_column_type_sql(&entity.table_ref(), &name, &name),
            ["ALTER TABLE public.PERSON ALTER COLUMN NAME TYPE varchar(200)"]
        );
    }
}
