use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Column pair joining a source entity to a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DbJoin {
    pub source: String,
    pub target: String,
}

impl DbJoin {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Relationship between two db entities, usually backed by a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DbRelationship {
    pub name: String,
    pub target_entity: String,
    #[serde(default)]
    pub to_many: bool,
    /// The target's primary key is also a foreign key to the source.
    #[serde(default)]
    pub to_dependent_pk: bool,
    /// Foreign key constraint name when introspected from a database.
    #[serde(default)]
    pub fk_name: Option<String>,
    #[serde(default)]
    pub joins: Vec<DbJoin>,
}

impl DbRelationship {
    /// Name-independent identity of the relationship: the sorted set of its
    /// entity-qualified `source > target` join triples.
    ///
    /// Relationship names are often synthesized during introspection, so two
    /// snapshots are matched on their joins instead.
    pub fn signature(&self, source_entity: &str) -> String {
        let mut joins: Vec<String> = self
            .joins
            .iter()
            .map(|join| {
                format!(
                    "{source_entity}.{} > {}.{}",
                    join.source, self.target_entity, join.target
                )
            })
            .collect();
        joins.sort();
        joins.dedup();
        joins.join(", ")
    }

    pub fn has_source_column(&self, column: &str) -> bool {
        self.joins.iter().any(|join| join.source == column)
    }

    pub fn has_target_column(&self, column: &str) -> bool {
        self.joins.iter().any(|join| join.target == column)
    }

    pub fn source_columns(&self) -> Vec<&str> {
        self.joins.iter().map(|join| join.source.as_str()).collect()
    }

    pub fn target_columns(&self) -> Vec<&str> {
        self.joins.iter().map(|join| join.target.as_str()).collect()
    }
}
