use std::cell::OnceCell;
use std::collections::HashMap;

use dbmerge_core::{DataMap, DbAttribute, DbEntity, DbRelationship, Procedure};

use crate::filters::Filters;

/// One side's contribution to a dictionary: the filtered items and the key
/// each item is looked up by.
pub trait DictionarySource<T> {
    /// Every item this side contributes, after filtering.
    fn all(&self) -> Vec<T>;

    /// Lookup key for an item, before case normalization.
    fn name(&self, item: &T) -> String;
}

struct DictionaryIndex<T> {
    names: Vec<String>,
    items: HashMap<String, T>,
}

/// A case-insensitive, name-indexed view over one side's schema objects.
///
/// The index is built lazily on first lookup (or by [`Dictionary::init`])
/// and never changes afterwards. When two items normalize to the same key
/// the first one wins.
pub struct Dictionary<'a, T> {
    source: Box<dyn DictionarySource<T> + 'a>,
    index: OnceCell<DictionaryIndex<T>>,
}

impl<'a, T: Copy> Dictionary<'a, T> {
    pub fn new(source: impl DictionarySource<T> + 'a) -> Self {
        Self {
            source: Box::new(source),
            index: OnceCell::new(),
        }
    }

    /// Builds the index. Calling it again is a no-op.
    pub fn init(&self) {
        self.index();
    }

    fn index(&self) -> &DictionaryIndex<T> {
        self.index.get_or_init(|| {
            let all = self.source.all();
            let mut names = Vec::with_capacity(all.len());
            let mut items = HashMap::with_capacity(all.len());
            for item in all {
                let key = normalize(&self.source.name(&item));
                if !items.contains_key(&key) {
                    names.push(key.clone());
                    items.insert(key, item);
                }
            }
            DictionaryIndex { names, items }
        })
    }

    pub fn by_name(&self, name: &str) -> Option<T> {
        self.index().items.get(&normalize(name)).copied()
    }

    /// Normalized keys in source order.
    pub fn names(&self) -> &[String] {
        &self.index().names
    }

    /// Indexed items in source order.
    pub fn items(&self) -> Vec<T> {
        let index = self.index();
        index
            .names
            .iter()
            .filter_map(|name| index.items.get(name).copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Tables and views of a data map. Without filters every entity is included.
pub struct DbEntityDictionary<'a> {
    map: &'a DataMap,
    filters: Option<&'a Filters>,
}

impl<'a> DbEntityDictionary<'a> {
    pub fn new(map: &'a DataMap, filters: Option<&'a Filters>) -> Self {
        Self { map, filters }
    }
}

impl<'a> DictionarySource<&'a DbEntity> for DbEntityDictionary<'a> {
    fn all(&self) -> Vec<&'a DbEntity> {
        self.map
            .db_entities
            .iter()
            .filter(|entity| match self.filters {
                None => true,
                Some(filters) => filters.include_table(
                    entity.catalog.as_deref().or(self.map.default_catalog.as_deref()),
                    entity.schema.as_deref().or(self.map.default_schema.as_deref()),
                    &entity.name,
                ),
            })
            .collect()
    }

    fn name(&self, item: &&'a DbEntity) -> String {
        item.name.clone()
    }
}

/// Columns of one table.
pub struct DbAttributeDictionary<'a> {
    entity: &'a DbEntity,
}

impl<'a> DbAttributeDictionary<'a> {
    pub fn new(entity: &'a DbEntity) -> Self {
        Self { entity }
    }
}

impl<'a> DictionarySource<&'a DbAttribute> for DbAttributeDictionary<'a> {
    fn all(&self) -> Vec<&'a DbAttribute> {
        self.entity.attributes.iter().collect()
    }

    fn name(&self, item: &&'a DbAttribute) -> String {
        item.name.clone()
    }
}

/// Outgoing relationships of one table, keyed by join signature.
pub struct DbRelationshipDictionary<'a> {
    entity: &'a DbEntity,
}

impl<'a> DbRelationshipDictionary<'a> {
    pub fn new(entity: &'a DbEntity) -> Self {
        Self { entity }
    }
}

impl<'a> DictionarySource<&'a DbRelationship> for DbRelationshipDictionary<'a> {
    fn all(&self) -> Vec<&'a DbRelationship> {
        self.entity.relationships.iter().collect()
    }

    fn name(&self, item: &&'a DbRelationship) -> String {
        item.signature(&self.entity.name)
    }
}

/// Stored procedures of a data map. Procedures are only included when a
/// filter explicitly admits them.
pub struct ProcedureDictionary<'a> {
    map: &'a DataMap,
    filters: Option<&'a Filters>,
}

impl<'a> ProcedureDictionary<'a> {
    pub fn new(map: &'a DataMap, filters: Option<&'a Filters>) -> Self {
        Self { map, filters }
    }
}

impl<'a> DictionarySource<&'a Procedure> for ProcedureDictionary<'a> {
    fn all(&self) -> Vec<&'a Procedure> {
        let Some(filters) = self.filters else {
            return Vec::new();
        };
        self.map
            .procedures
            .iter()
            .filter(|procedure| {
                filters.include_procedure(
                    procedure
                        .catalog
                        .as_deref()
                        .or(self.map.default_catalog.as_deref()),
                    procedure
                        .schema
                        .as_deref()
                        .or(self.map.default_schema.as_deref()),
                    &procedure.name,
                )
            })
            .collect()
    }

    fn name(&self, item: &&'a Procedure) -> String {
        item.name.clone()
    }
}
