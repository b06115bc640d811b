use std::collections::BTreeMap;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use dbmerge_merge::{FiltersConfig, StaticValueForNullProvider};

/// SQL rendering used for `TO_DB` tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Postgres => "postgres",
        }
    }
}

/// Merge configuration read from a TOML file.
///
/// ```toml
/// dialect = "postgres"
/// skip_pk = true
///
/// [value_for_null]
/// "ARTIST.NAME" = "'unknown'"
///
/// [[filters.entries]]
/// schema = "public"
/// tables = { include = [".*"], exclude = ["legacy_.*"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    pub dialect: Dialect,
    pub skip_relationships: bool,
    pub skip_pk: bool,
    pub remove_meaningful_pks: bool,
    pub remove_meaningful_fks: bool,
    pub quote_identifiers: bool,
    /// `"TABLE.COLUMN"` to the SQL literal used to backfill NULL rows.
    pub value_for_null: BTreeMap<String, String>,
    pub filters: FiltersConfig,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            skip_relationships: false,
            skip_pk: false,
            remove_meaningful_pks: true,
            remove_meaningful_fks: true,
            quote_identifiers: false,
            value_for_null: BTreeMap::new(),
            filters: FiltersConfig::default(),
        }
    }
}

impl MergeSettings {
    pub fn value_for_null_provider(&self) -> StaticValueForNullProvider {
        self.value_for_null
            .iter()
            .map(|(column, literal)| (column.as_str(), literal.clone()))
            .collect()
    }
}

/// Defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<MergeSettings, SettingsError> {
    let Some(path) = path else {
        return Ok(MergeSettings::default());
    };
    let content = std::fs::read_to_string(path)?;
    let settings = toml::from_str(&content)?;
    Ok(settings)
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml decode error: {0}")]
    Toml(#[from] toml::de::Error),
}
