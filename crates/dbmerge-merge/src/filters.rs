use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// Include/exclude pattern lists for one kind of object.
///
/// Patterns are regular expressions matched against the whole name, ignoring
/// case. An empty include list admits every name that is not excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl PatternFilter {
    pub fn include_all() -> Self {
        Self::default()
    }

    pub fn exclude_all() -> Self {
        Self {
            include: Vec::new(),
            exclude: vec![".*".to_string()],
        }
    }
}

/// Filters scoped to one catalog/schema. `None` matches any value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFilter {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub tables: PatternFilter,
    #[serde(default = "PatternFilter::exclude_all")]
    pub procedures: PatternFilter,
}

impl Default for SchemaFilter {
    fn default() -> Self {
        Self {
            catalog: None,
            schema: None,
            tables: PatternFilter::include_all(),
            procedures: PatternFilter::exclude_all(),
        }
    }
}

/// Which tables and procedures take part in a merge.
///
/// The default configuration holds a single catch-all entry that includes
/// every table and excludes every procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub entries: Vec<SchemaFilter>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            entries: vec![SchemaFilter::default()],
        }
    }
}

impl FiltersConfig {
    /// Compile every pattern; fails on the first invalid expression.
    pub fn compile(&self) -> Result<Filters> {
        let entries = self
            .entries
            .iter()
            .map(CompiledSchemaFilter::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Filters { entries })
    }
}

/// Compiled form of [`FiltersConfig`].
#[derive(Debug, Clone)]
pub struct Filters {
    entries: Vec<CompiledSchemaFilter>,
}

impl Filters {
    /// First entry whose catalog and schema accept the given pair.
    pub fn schema_filter(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Option<&CompiledSchemaFilter> {
        self.entries
            .iter()
            .find(|entry| entry.accepts(catalog, schema))
    }

    /// A table is included only when a filter exists for its catalog/schema
    /// and that filter accepts its name.
    pub fn include_table(&self, catalog: Option<&str>, schema: Option<&str>, name: &str) -> bool {
        self.schema_filter(catalog, schema)
            .is_some_and(|entry| entry.tables.is_included(name))
    }

    pub fn include_procedure(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
    ) -> bool {
        self.schema_filter(catalog, schema)
            .is_some_and(|entry| entry.procedures.is_included(name))
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSchemaFilter {
    catalog: Option<String>,
    schema: Option<String>,
    tables: CompiledPatterns,
    procedures: CompiledPatterns,
}

impl CompiledSchemaFilter {
    fn compile(filter: &SchemaFilter) -> Result<Self> {
        Ok(Self {
            catalog: filter.catalog.clone(),
            schema: filter.schema.clone(),
            tables: CompiledPatterns::compile(&filter.tables)?,
            procedures: CompiledPatterns::compile(&filter.procedures)?,
        })
    }

    fn accepts(&self, catalog: Option<&str>, schema: Option<&str>) -> bool {
        scope_matches(self.catalog.as_deref(), catalog) && scope_matches(self.schema.as_deref(), schema)
    }

    pub fn is_table_included(&self, name: &str) -> bool {
        self.tables.is_included(name)
    }

    pub fn is_procedure_included(&self, name: &str) -> bool {
        self.procedures.is_included(name)
    }
}

fn scope_matches(expected: Option<&str>, actual: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => actual.is_some_and(|actual| actual.eq_ignore_ascii_case(expected)),
    }
}

#[derive(Debug, Clone, Default)]
struct CompiledPatterns {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl CompiledPatterns {
    fn compile(filter: &PatternFilter) -> Result<Self> {
        Ok(Self {
            include: compile_all(&filter.include)?,
            exclude: compile_all(&filter.exclude)?,
        })
    }

    fn is_included(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|re| re.is_match(name));
        included && !self.exclude.iter().any(|re| re.is_match(name))
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("(?i)^(?:{pattern})$")).map_err(|err| {
                MergeError::InvalidConfiguration(format!("invalid filter pattern '{pattern}': {err}"))
            })
        })
        .collect()
}
