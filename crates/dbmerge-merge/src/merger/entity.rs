use std::collections::BTreeSet;

use dbmerge_core::{DataMap, DbEntity, TableRef};

use super::Merger;
use crate::diff::{DictionaryDiff, DiffPair};
use crate::dictionary::{DbEntityDictionary, Dictionary};
use crate::error::Result;
use crate::filters::Filters;
use crate::token::{MergerToken, MergerTokenFactory};

/// Table-level merger: whole-table create/drop and primary key drift.
pub struct DbEntityMerger<'a> {
    factory: &'a dyn MergerTokenFactory,
    original: &'a DataMap,
    filters: &'a Filters,
    skip_relationships_tokens: bool,
    skip_pk_tokens: bool,
}

impl<'a> DbEntityMerger<'a> {
    pub fn new(factory: &'a dyn MergerTokenFactory, original: &'a DataMap, filters: &'a Filters) -> Self {
        Self {
            factory,
            original,
            filters,
            skip_relationships_tokens: false,
            skip_pk_tokens: false,
        }
    }

    pub fn skip_relationships_tokens(mut self, skip: bool) -> Self {
        self.skip_relationships_tokens = skip;
        self
    }

    pub fn skip_pk_tokens(mut self, skip: bool) -> Self {
        self.skip_pk_tokens = skip;
        self
    }

    fn target_ref(&self, name: &str) -> TableRef {
        self.original
            .find_db_entity(name)
            .map(DbEntity::table_ref)
            .unwrap_or_else(|| TableRef::new(None, None, name))
    }
}

impl<'a> Merger<'a> for DbEntityMerger<'a> {
    type Parent = DataMap;
    type Child = &'a DbEntity;

    /// Every model table against the database tables the filters admit.
    fn create_diff(&self, original: &'a DataMap, imported: &'a DataMap) -> Result<DictionaryDiff<&'a DbEntity>> {
        DictionaryDiff::builder()
            .original(Dictionary::new(DbEntityDictionary::new(original, None)))
            .imported(Dictionary::new(DbEntityDictionary::new(imported, Some(self.filters))))
            .build()
    }

    fn tokens_for_missing_original(&self, imported: &'a DbEntity) -> Vec<MergerToken> {
        vec![self.factory.drop_table_to_db(imported)]
    }

    fn tokens_for_missing_imported(&self, original: &'a DbEntity) -> Vec<MergerToken> {
        let mut tokens = vec![self.factory.create_table_to_db(original)];
        if !self.skip_relationships_tokens {
            let source = original.table_ref();
            for relationship in &original.relationships {
                let target = self.target_ref(&relationship.target_entity);
                tokens.push(self.factory.add_relationship_to_db(&source, &target, relationship));
            }
        }
        tokens
    }

    /// Views carry no real key in the database and are never compared.
    fn tokens_for_same(&self, pair: &DiffPair<&'a DbEntity>) -> Vec<MergerToken> {
        let Some((&original, &imported)) = pair.both() else {
            return Vec::new();
        };
        if self.skip_pk_tokens || original.is_view() || imported.is_view() {
            return Vec::new();
        }

        let key_set = |entity: &DbEntity| -> BTreeSet<String> {
            entity
                .primary_keys()
                .iter()
                .map(|column| column.name.to_lowercase())
                .collect()
        };
        if key_set(original) == key_set(imported) {
            return Vec::new();
        }

        let names = |entity: &DbEntity| -> Vec<String> {
            entity
                .primary_keys()
                .iter()
                .map(|column| column.name.clone())
                .collect()
        };
        vec![self.factory.set_primary_key_to_db(
            &imported.table_ref(),
            &names(imported),
            &names(original),
            imported.primary_key_name.as_deref(),
        )]
    }
}
