use std::sync::Arc;

use dbmerge_core::DataMap;
use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::filters::{Filters, FiltersConfig};
use crate::merger::{
    ChainMerger, DbAttributeMerger, DbEntityMerger, DbRelationshipMerger, Merger, ProcedureMerger,
    create_merge_tokens, merge_diff,
};
use crate::token::{MergerToken, MergerTokenFactory, sort_tokens};
use crate::value_for_null::{EmptyValueForNullProvider, ValueForNullProvider};

/// Computes the ordered token list that reconciles a database snapshot
/// with a reference model.
pub struct DataMapMerger {
    factory: Arc<dyn MergerTokenFactory>,
    filters: Filters,
    value_for_null: Arc<dyn ValueForNullProvider>,
    skip_relationships_tokens: bool,
    skip_pk_tokens: bool,
}

impl std::fmt::Debug for DataMapMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataMapMerger")
            .field("filters", &self.filters)
            .field("skip_relationships_tokens", &self.skip_relationships_tokens)
            .field("skip_pk_tokens", &self.skip_pk_tokens)
            .finish_non_exhaustive()
    }
}

impl DataMapMerger {
    pub fn builder() -> DataMapMergerBuilder {
        DataMapMergerBuilder::default()
    }

    pub fn token_factory(&self) -> &dyn MergerTokenFactory {
        self.factory.as_ref()
    }

    /// Tokens turning `imported` (the database) into `original` (the model).
    ///
    /// Tables are merged first, then columns and relationships of the tables
    /// present on both sides, then procedures. The result is sorted with
    /// [`sort_tokens`].
    pub fn create_merge_tokens(&self, original: &DataMap, imported: &DataMap) -> Result<Vec<MergerToken>> {
        info!(
            model = %original.name,
            db = %imported.name,
            "merge started"
        );
        let factory = self.factory.as_ref();

        let entity_merger = DbEntityMerger::new(factory, original, &self.filters)
            .skip_relationships_tokens(self.skip_relationships_tokens)
            .skip_pk_tokens(self.skip_pk_tokens);
        let entity_diff = entity_merger.create_diff(original, imported)?;
        let mut tokens = merge_diff(&entity_merger, &entity_diff);
        let table_tokens = tokens.len();

        let columns = ChainMerger::new(
            DbAttributeMerger::new(factory, self.value_for_null.as_ref()),
            entity_diff.same.clone(),
        );
        let column_tokens = columns.create_merge_tokens()?;
        debug!(count = column_tokens.len(), "column tokens");
        tokens.extend(column_tokens);

        // Database-only foreign keys are dropped even when relationship
        // tokens are skipped, so their columns can go after them.
        let relationships = ChainMerger::new(
            DbRelationshipMerger::new(factory, original)
                .skip_relationships_tokens(self.skip_relationships_tokens),
            entity_diff.same.clone(),
        );
        let relationship_tokens = relationships.create_merge_tokens()?;
        debug!(count = relationship_tokens.len(), "relationship tokens");
        tokens.extend(relationship_tokens);

        let procedure_tokens = create_merge_tokens(
            &ProcedureMerger::new(factory, &self.filters),
            original,
            imported,
        )?;
        debug!(count = procedure_tokens.len(), "procedure tokens");
        tokens.extend(procedure_tokens);

        sort_tokens(&mut tokens);
        info!(
            tables = entity_diff.same.len(),
            table_tokens,
            tokens = tokens.len(),
            "merge finished"
        );
        Ok(tokens)
    }
}

pub struct DataMapMergerBuilder {
    factory: Option<Arc<dyn MergerTokenFactory>>,
    filters: FiltersConfig,
    value_for_null: Arc<dyn ValueForNullProvider>,
    skip_relationships_tokens: bool,
    skip_pk_tokens: bool,
}

impl Default for DataMapMergerBuilder {
    fn default() -> Self {
        Self {
            factory: None,
            filters: FiltersConfig::default(),
            value_for_null: Arc::new(EmptyValueForNullProvider),
            skip_relationships_tokens: false,
            skip_pk_tokens: false,
        }
    }
}

impl DataMapMergerBuilder {
    pub fn token_factory(mut self, factory: impl MergerTokenFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn shared_token_factory(mut self, factory: Arc<dyn MergerTokenFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn filters(mut self, filters: FiltersConfig) -> Self {
        self.filters = filters;
        self
    }

    pub fn value_for_null(mut self, provider: impl ValueForNullProvider + 'static) -> Self {
        self.value_for_null = Arc::new(provider);
        self
    }

    pub fn skip_relationships_tokens(mut self, skip: bool) -> Self {
        self.skip_relationships_tokens = skip;
        self
    }

    pub fn skip_pk_tokens(mut self, skip: bool) -> Self {
        self.skip_pk_tokens = skip;
        self
    }

    /// Fails when no token factory was given or a filter pattern is invalid.
    pub fn build(self) -> Result<DataMapMerger> {
        let factory = self.factory.ok_or_else(|| {
            MergeError::InvalidConfiguration("a token factory is required".to_string())
        })?;
        Ok(DataMapMerger {
            factory,
            filters: self.filters.compile()?,
            value_for_null: self.value_for_null,
            skip_relationships_tokens: self.skip_relationships_tokens,
            skip_pk_tokens: self.skip_pk_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::DefaultTokenFactory;

    #[test]
    fn builder_requires_factory() {
        let result = DataMapMerger::builder().build();
        assert!(matches!(result, Err(MergeError::InvalidConfiguration(_))));
        assert!(
            DataMapMerger::builder()
                .token_factory(DefaultTokenFactory)
                .build()
                .is_ok()
        );
    }
}
