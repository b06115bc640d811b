use std::collections::HashMap;

use dbmerge_core::{DbAttribute, DbEntity};

/// Supplies a SQL literal used to backfill existing rows before a column
/// becomes NOT NULL.
pub trait ValueForNullProvider: Send + Sync {
    fn value_for(&self, entity: &DbEntity, column: &DbAttribute) -> Option<String>;

    fn has_value_for(&self, entity: &DbEntity, column: &DbAttribute) -> bool {
        self.value_for(entity, column).is_some()
    }
}

/// Never provides a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyValueForNullProvider;

impl ValueForNullProvider for EmptyValueForNullProvider {
    fn value_for(&self, _entity: &DbEntity, _column: &DbAttribute) -> Option<String> {
        None
    }
}

/// Fixed literals keyed by `TABLE.COLUMN`, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct StaticValueForNullProvider {
    values: HashMap<String, String>,
}

impl StaticValueForNullProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, column: &str, literal: impl Into<String>) -> Self {
        self.insert(column, literal);
        self
    }

    pub fn insert(&mut self, column: &str, literal: impl Into<String>) {
        self.values.insert(column.to_lowercase(), literal.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for StaticValueForNullProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut provider = Self::new();
        for (column, literal) in iter {
            provider.insert(column.as_ref(), literal);
        }
        provider
    }
}

impl ValueForNullProvider for StaticValueForNullProvider {
    fn value_for(&self, entity: &DbEntity, column: &DbAttribute) -> Option<String> {
        let key = format!("{}.{}", entity.name, column.name).to_lowercase();
        self.values.get(&key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use dbmerge_core::SqlType;

    use super::*;

    #[test]
    fn static_lookup_ignores_case() {
        let provider = StaticValueForNullProvider::new().with_value("Person.Name", "'unknown'");
        let entity = DbEntity::new("PERSON");
        let name = DbAttribute::new("NAME", SqlType::Varchar);
        let email = DbAttribute::new("EMAIL", SqlType::Varchar);

        assert_eq!(provider.value_for(&entity, &name).as_deref(), Some("'unknown'"));
        assert!(!provider.has_value_for(&entity, &email));
        assert!(!EmptyValueForNullProvider.has_value_for(&entity, &name));
    }
}
