use dbmerge_core::{DataMap, DbEntity, DbJoin, DbRelationship, TableRef};

use super::{EntityScoped, Merger, scope};
use crate::diff::{DictionaryDiff, DiffPair};
use crate::dictionary::{DbRelationshipDictionary, Dictionary};
use crate::error::Result;
use crate::token::{MergerToken, MergerTokenFactory};

/// Relationship-level merger. Relationships are matched on their join
/// signature, never on their name.
pub struct DbRelationshipMerger<'a> {
    factory: &'a dyn MergerTokenFactory,
    original: &'a DataMap,
    skip_relationships_tokens: bool,
}

impl<'a> DbRelationshipMerger<'a> {
    pub fn new(factory: &'a dyn MergerTokenFactory, original: &'a DataMap) -> Self {
        Self {
            factory,
            original,
            skip_relationships_tokens: false,
        }
    }

    pub fn skip_relationships_tokens(mut self, skip: bool) -> Self {
        self.skip_relationships_tokens = skip;
        self
    }

    /// Rename the endpoints of a database relationship to the model's
    /// spelling where the model knows them.
    fn in_model_case(&self, model_entity: &DbEntity, relationship: &DbRelationship) -> DbRelationship {
        let target = self.original.find_db_entity(&relationship.target_entity);
        let joins = relationship
            .joins
            .iter()
            .map(|join| {
                let source = model_entity
                    .find_attribute(&join.source)
                    .map_or_else(|| join.source.clone(), |column| column.name.clone());
                let target = target
                    .and_then(|entity| entity.find_attribute(&join.target))
                    .map_or_else(|| join.target.clone(), |column| column.name.clone());
                DbJoin { source, target }
            })
            .collect();
        DbRelationship {
            target_entity: target.map_or_else(
                || relationship.target_entity.clone(),
                |entity| entity.name.clone(),
            ),
            joins,
            ..relationship.clone()
        }
    }

    fn target_ref(&self, target_entity: &str) -> TableRef {
        self.original
            .find_db_entity(target_entity)
            .map(DbEntity::table_ref)
            .unwrap_or_else(|| TableRef::new(None, None, target_entity))
    }
}

/// Model table name with catalog and schema filled in from the database side
/// when the model leaves them unset.
fn model_ref(model: &DbEntity, db: Option<&DbEntity>) -> TableRef {
    TableRef::new(
        model
            .catalog
            .clone()
            .or_else(|| db.and_then(|db| db.catalog.clone())),
        model
            .schema
            .clone()
            .or_else(|| db.and_then(|db| db.schema.clone())),
        model.name.clone(),
    )
}

impl<'a> Merger<'a> for DbRelationshipMerger<'a> {
    type Parent = DbEntity;
    type Child = EntityScoped<'a, DbRelationship>;

    fn create_diff(
        &self,
        original: &'a DbEntity,
        imported: &'a DbEntity,
    ) -> Result<DictionaryDiff<EntityScoped<'a, DbRelationship>>> {
        let diff = DictionaryDiff::builder()
            .original(Dictionary::new(DbRelationshipDictionary::new(original)))
            .imported(Dictionary::new(DbRelationshipDictionary::new(imported)))
            .build()?;
        Ok(scope(diff, original, imported))
    }

    /// A database-only foreign key is dropped. To-many relationships have no
    /// constraint to drop, so they are added to the model instead.
    fn tokens_for_missing_original(&self, imported: EntityScoped<'a, DbRelationship>) -> Vec<MergerToken> {
        let relationship = self.in_model_case(imported.original, imported.item);
        let source = model_ref(imported.original, Some(imported.imported));
        let target = self.target_ref(&relationship.target_entity);

        let token = self
            .factory
            .drop_relationship_to_db(&source, &target, &relationship);
        if relationship.to_many {
            vec![token.create_reverse(self.factory)]
        } else {
            vec![token]
        }
    }

    fn tokens_for_missing_imported(&self, original: EntityScoped<'a, DbRelationship>) -> Vec<MergerToken> {
        if self.skip_relationships_tokens {
            return Vec::new();
        }
        let source = model_ref(original.original, Some(original.imported));
        let target = self.target_ref(&original.item.target_entity);
        vec![self
            .factory
            .add_relationship_to_db(&source, &target, original.item)]
    }

    fn tokens_for_same(&self, _pair: &DiffPair<EntityScoped<'a, DbRelationship>>) -> Vec<MergerToken> {
        Vec::new()
    }
}
