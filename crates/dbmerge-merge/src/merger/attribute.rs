use dbmerge_core::{DbAttribute, DbEntity};

use super::{EntityScoped, Merger, scope};
use crate::diff::{DictionaryDiff, DiffPair};
use crate::dictionary::{DbAttributeDictionary, Dictionary};
use crate::error::Result;
use crate::token::{MergerToken, MergerTokenFactory};
use crate::value_for_null::ValueForNullProvider;

/// Column-level merger, run per matched table through a chain.
pub struct DbAttributeMerger<'a> {
    factory: &'a dyn MergerTokenFactory,
    value_for_null: &'a dyn ValueForNullProvider,
}

impl<'a> DbAttributeMerger<'a> {
    pub fn new(factory: &'a dyn MergerTokenFactory, value_for_null: &'a dyn ValueForNullProvider) -> Self {
        Self {
            factory,
            value_for_null,
        }
    }

    /// NOT NULL constraint, preceded by a backfill when a value is known.
    fn not_null_tokens(&self, model_entity: &DbEntity, model: &DbAttribute, db: &EntityScoped<'a, DbAttribute>) -> Vec<MergerToken> {
        let table = db.imported.table_ref();
        let mut tokens = Vec::with_capacity(2);
        if let Some(value) = self.value_for_null.value_for(model_entity, model) {
            tokens.push(self.factory.set_value_for_null_to_db(&table, db.item, &value));
        }
        tokens.push(self.factory.set_not_null_to_db(&table, db.item));
        tokens
    }
}

impl<'a> Merger<'a> for DbAttributeMerger<'a> {
    type Parent = DbEntity;
    type Child = EntityScoped<'a, DbAttribute>;

    fn create_diff(
        &self,
        original: &'a DbEntity,
        imported: &'a DbEntity,
    ) -> Result<DictionaryDiff<EntityScoped<'a, DbAttribute>>> {
        let diff = DictionaryDiff::builder()
            .original(Dictionary::new(DbAttributeDictionary::new(original)))
            .imported(Dictionary::new(DbAttributeDictionary::new(imported)))
            .build()?;
        Ok(scope(diff, original, imported))
    }

    fn tokens_for_missing_original(&self, imported: EntityScoped<'a, DbAttribute>) -> Vec<MergerToken> {
        vec![self
            .factory
            .drop_column_to_db(&imported.imported.table_ref(), imported.item)]
    }

    /// New columns are added nullable and constrained afterwards. Primary
    /// keys of views are skipped.
    fn tokens_for_missing_imported(&self, original: EntityScoped<'a, DbAttribute>) -> Vec<MergerToken> {
        let column = original.item;
        if column.primary_key && (original.original.is_view() || original.imported.is_view()) {
            return Vec::new();
        }

        let table = original.imported.table_ref();
        let mut tokens = vec![self.factory.add_column_to_db(&table, column)];
        if column.mandatory {
            if let Some(value) = self.value_for_null.value_for(original.original, column) {
                tokens.push(self.factory.set_value_for_null_to_db(&table, column, &value));
            }
            tokens.push(self.factory.set_not_null_to_db(&table, column));
        }
        tokens
    }

    fn tokens_for_same(&self, pair: &DiffPair<EntityScoped<'a, DbAttribute>>) -> Vec<MergerToken> {
        let (Some(original), Some(imported)) = (pair.original, pair.imported) else {
            return Vec::new();
        };
        let (model, db) = (original.item, imported.item);
        let table = imported.imported.table_ref();
        let mut tokens = Vec::new();

        if model.mandatory != db.mandatory {
            if model.mandatory {
                tokens.extend(self.not_null_tokens(original.original, model, &imported));
            } else {
                tokens.push(self.factory.set_allow_null_to_db(&table, db));
            }
        }

        if needs_type_change(model, db) {
            let mut to = model.clone();
            to.name = db.name.clone();
            tokens.push(self.factory.set_column_type_to_db(&table, db, &to));
        }

        if model.generated != db.generated {
            tokens.push(self.factory.set_generated_flag_to_db(&table, db, model.generated));
        }

        tokens
    }
}

/// Type, length, precision or scale drift between two columns.
///
/// `DECIMAL` and `NUMERIC` are the same type. Length is only compared for
/// types where it is meaningful, precision always. An unset or `-1` scale
/// equals `0`.
pub(crate) fn needs_type_change(model: &DbAttribute, db: &DbAttribute) -> bool {
    if !model.sql_type.same_family(db.sql_type) {
        return true;
    }
    if model.sql_type.supports_length() && positive(model.max_length) != positive(db.max_length) {
        return true;
    }
    if model.precision != db.precision {
        return true;
    }
    scale(model.scale) != scale(db.scale)
}

fn positive(value: Option<i32>) -> Option<i32> {
    value.filter(|value| *value > 0)
}

fn scale(value: Option<i32>) -> i32 {
    match value {
        None | Some(-1) => 0,
        Some(scale) => scale,
    }
}
