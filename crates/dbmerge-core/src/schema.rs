use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::DbRelationship;
use crate::mapping::ObjEntity;
use crate::types::{ParameterDirection, SqlType};

/// Snapshot of one side of a comparison: the physical tables plus the object
/// layer mapped on top of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataMap {
    pub name: String,
    #[serde(default)]
    pub default_catalog: Option<String>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub db_entities: Vec<DbEntity>,
    #[serde(default)]
    pub obj_entities: Vec<ObjEntity>,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

/// Kind of table-like object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Table,
    View,
}

/// A table or view with its columns and outgoing relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DbEntity {
    pub name: String,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub kind: EntityKind,
    /// Name of the primary key constraint as reported by the database.
    #[serde(default)]
    pub primary_key_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<DbAttribute>,
    #[serde(default)]
    pub relationships: Vec<DbRelationship>,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DbAttribute {
    pub name: String,
    pub sql_type: SqlType,
    #[serde(default)]
    pub max_length: Option<i32>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub generated: bool,
}

/// Stored procedure signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Procedure {
    pub name: String,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub returns_value: bool,
    #[serde(default)]
    pub parameters: Vec<ProcedureParameter>,
}

/// One positional procedure parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcedureParameter {
    pub name: String,
    pub sql_type: SqlType,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub max_length: Option<i32>,
    pub direction: ParameterDirection,
}

/// Catalog/schema/name triple identifying a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(catalog: Option<String>, schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            catalog,
            schema,
            name: name.into(),
        }
    }

    /// Dotted name with the catalog and schema prefixes that are present.
    pub fn qualified_name(&self) -> String {
        self.parts().join(".")
    }

    /// Name components in catalog, schema, table order.
    pub fn parts(&self) -> Vec<&str> {
        let mut parts = Vec::with_capacity(3);
        if let Some(catalog) = self.catalog.as_deref() {
            parts.push(catalog);
        }
        if let Some(schema) = self.schema.as_deref() {
            parts.push(schema);
        }
        parts.push(self.name.as_str());
        parts
    }
}

impl DataMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn db_entity(&self, name: &str) -> Option<&DbEntity> {
        self.db_entities.iter().find(|entity| entity.name == name)
    }

    pub fn db_entity_mut(&mut self, name: &str) -> Option<&mut DbEntity> {
        self.db_entities.iter_mut().find(|entity| entity.name == name)
    }

    /// Exact lookup first, then a case-insensitive one.
    pub fn find_db_entity(&self, name: &str) -> Option<&DbEntity> {
        self.db_entity(name).or_else(|| {
            self.db_entities
                .iter()
                .find(|entity| entity.name.eq_ignore_ascii_case(name))
        })
    }

    /// Adds an entity, replacing any entity with the same name.
    pub fn add_db_entity(&mut self, entity: DbEntity) {
        match self.db_entity_mut(&entity.name) {
            Some(existing) => *existing = entity,
            None => self.db_entities.push(entity),
        }
    }

    /// Removes an entity; optionally drops every relationship targeting it.
    pub fn remove_db_entity(
        &mut self,
        name: &str,
        clear_dependent_relationships: bool,
    ) -> Option<DbEntity> {
        let idx = self.db_entities.iter().position(|entity| entity.name == name)?;
        let removed = self.db_entities.remove(idx);

        if clear_dependent_relationships {
            for entity in &mut self.db_entities {
                entity
                    .relationships
                    .retain(|relationship| relationship.target_entity != name);
            }
        }

        Some(removed)
    }

    pub fn obj_entity(&self, name: &str) -> Option<&ObjEntity> {
        self.obj_entities.iter().find(|entity| entity.name == name)
    }

    pub fn obj_entity_mut(&mut self, name: &str) -> Option<&mut ObjEntity> {
        self.obj_entities.iter_mut().find(|entity| entity.name == name)
    }

    pub fn add_obj_entity(&mut self, entity: ObjEntity) {
        match self.obj_entity_mut(&entity.name) {
            Some(existing) => *existing = entity,
            None => self.obj_entities.push(entity),
        }
    }

    /// Removes an object entity; optionally drops object relationships that
    /// target it from the remaining entities.
    pub fn remove_obj_entity(
        &mut self,
        name: &str,
        clear_dependent_relationships: bool,
    ) -> Option<ObjEntity> {
        let idx = self.obj_entities.iter().position(|entity| entity.name == name)?;
        let removed = self.obj_entities.remove(idx);

        if clear_dependent_relationships {
            for entity in &mut self.obj_entities {
                entity
                    .relationships
                    .retain(|relationship| relationship.target_entity != name);
            }
        }

        Some(removed)
    }

    /// Names of the object entities mapped onto the given db entity.
    pub fn mapped_obj_entities(&self, db_entity: &str) -> Vec<String> {
        self.obj_entities
            .iter()
            .filter(|entity| entity.db_entity.as_deref() == Some(db_entity))
            .map(|entity| entity.name.clone())
            .collect()
    }

    /// Relationships anywhere in the map that point at `db_entity`, paired with
    /// the name of their source entity.
    pub fn incoming_relationships(&self, db_entity: &str) -> Vec<(&str, &DbRelationship)> {
        self.db_entities
            .iter()
            .flat_map(|entity| {
                entity
                    .relationships
                    .iter()
                    .filter(move |relationship| relationship.target_entity == db_entity)
                    .map(move |relationship| (entity.name.as_str(), relationship))
            })
            .collect()
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|procedure| procedure.name == name)
    }

    pub fn add_procedure(&mut self, procedure: Procedure) {
        match self
            .procedures
            .iter_mut()
            .find(|existing| existing.name == procedure.name)
        {
            Some(existing) => *existing = procedure,
            None => self.procedures.push(procedure),
        }
    }

    pub fn remove_procedure(&mut self, name: &str) -> Option<Procedure> {
        let idx = self.procedures.iter().position(|procedure| procedure.name == name)?;
        Some(self.procedures.remove(idx))
    }
}

impl DbEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: None,
            schema: None,
            kind: EntityKind::Table,
            primary_key_name: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn is_view(&self) -> bool {
        self.kind == EntityKind::View
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.catalog.clone(), self.schema.clone(), self.name.clone())
    }

    /// Primary key columns in declaration order.
    pub fn primary_keys(&self) -> Vec<&DbAttribute> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.primary_key)
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&DbAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut DbAttribute> {
        self.attributes
            .iter_mut()
            .find(|attribute| attribute.name == name)
    }

    /// Exact lookup first, then a case-insensitive one.
    pub fn find_attribute(&self, name: &str) -> Option<&DbAttribute> {
        self.attribute(name).or_else(|| {
            self.attributes
                .iter()
                .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn add_attribute(&mut self, attribute: DbAttribute) {
        match self.attribute_mut(&attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<DbAttribute> {
        let idx = self
            .attributes
            .iter()
            .position(|attribute| attribute.name == name)?;
        Some(self.attributes.remove(idx))
    }

    pub fn relationship(&self, name: &str) -> Option<&DbRelationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
    }

    pub fn add_relationship(&mut self, relationship: DbRelationship) {
        match self
            .relationships
            .iter_mut()
            .find(|existing| existing.name == relationship.name)
        {
            Some(existing) => *existing = relationship,
            None => self.relationships.push(relationship),
        }
    }

    pub fn remove_relationship(&mut self, name: &str) -> Option<DbRelationship> {
        let idx = self
            .relationships
            .iter()
            .position(|relationship| relationship.name == name)?;
        Some(self.relationships.remove(idx))
    }
}

impl DbAttribute {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            max_length: None,
            precision: None,
            scale: None,
            mandatory: false,
            primary_key: false,
            generated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::DbJoin;

    fn relationship(name: &str, target: &str) -> DbRelationship {
        DbRelationship {
            name: name.to_string(),
            target_entity: target.to_string(),
            to_many: false,
            to_dependent_pk: false,
            fk_name: None,
            joins: vec![DbJoin::new("ARTIST_ID", "ID")],
        }
    }

    #[test]
    fn qualified_name_skips_missing_parts() {
        let table = TableRef::new(None, Some("public".to_string()), "artist");
        assert_eq!(table.qualified_name(), "public.artist");
        let bare = TableRef::new(None, None, "artist");
        assert_eq!(bare.qualified_name(), "artist");
    }

    #[test]
    fn removing_entity_clears_incoming_relationships() {
        let mut map = DataMap::new("test");
        map.add_db_entity(DbEntity::new("ARTIST"));
        let mut painting = DbEntity::new("PAINTING");
        painting.add_relationship(relationship("toArtist", "ARTIST"));
        map.add_db_entity(painting);

        assert_eq!(map.incoming_relationships("ARTIST").len(), 1);
        assert!(map.remove_db_entity("ARTIST", true).is_some());

        let painting = map.db_entity("PAINTING").expect("painting");
        assert!(painting.relationships.is_empty());
    }

    #[test]
    fn find_attribute_falls_back_to_case_insensitive_match() {
        let mut entity = DbEntity::new("ARTIST");
        entity.add_attribute(DbAttribute::new("ARTIST_NAME", SqlType::Varchar));
        assert!(entity.attribute("artist_name").is_none());
        assert_eq!(
            entity.find_attribute("artist_name").map(|a| a.name.as_str()),
            Some("ARTIST_NAME")
        );
    }
}
