use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Object-layer entity mapped onto a db entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjEntity {
    pub name: String,
    #[serde(default)]
    pub db_entity: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ObjAttribute>,
    #[serde(default)]
    pub relationships: Vec<ObjRelationship>,
}

/// Mapped property backed by a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjAttribute {
    pub name: String,
    pub value_type: String,
    /// Name of the backing column in the entity's db entity.
    pub db_attribute: String,
}

/// Mapped association backed by a db relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjRelationship {
    pub name: String,
    pub target_entity: String,
    /// Name of the backing relationship in the entity's db entity.
    pub db_relationship: String,
    #[serde(default)]
    pub to_many: bool,
    /// Target was derived from a naming guess rather than an existing entity.
    #[serde(default)]
    pub guessed: bool,
}

impl ObjEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_entity: None,
            class_name: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ObjAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// First attribute mapped onto the given column.
    pub fn attribute_for_column(&self, column: &str) -> Option<&ObjAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.db_attribute == column)
    }

    pub fn attribute_for_column_mut(&mut self, column: &str) -> Option<&mut ObjAttribute> {
        self.attributes
            .iter_mut()
            .find(|attribute| attribute.db_attribute == column)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<ObjAttribute> {
        let idx = self
            .attributes
            .iter()
            .position(|attribute| attribute.name == name)?;
        Some(self.attributes.remove(idx))
    }

    pub fn relationship(&self, name: &str) -> Option<&ObjRelationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
    }

    pub fn relationship_for_db_relationship(&self, db_relationship: &str) -> Option<&ObjRelationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.db_relationship == db_relationship)
    }

    pub fn remove_relationship(&mut self, name: &str) -> Option<ObjRelationship> {
        let idx = self
            .relationships
            .iter()
            .position(|relationship| relationship.name == name)?;
        Some(self.relationships.remove(idx))
    }

    /// Attributes and relationships share one property namespace.
    pub fn has_property(&self, name: &str) -> bool {
        self.attribute(name).is_some() || self.relationship(name).is_some()
    }
}
