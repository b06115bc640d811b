use std::path::Path;

use dbmerge_core::{DataMap, validate_data_map};
use tracing::debug;

use crate::CliError;

/// Read and validate a JSON snapshot.
pub fn load_snapshot(path: &Path) -> Result<DataMap, CliError> {
    let content = std::fs::read_to_string(path)?;
    let map: DataMap = serde_json::from_str(&content)?;
    validate_data_map(&map)?;
    debug!(
        path = %path.display(),
        tables = map.db_entities.len(),
        obj_entities = map.obj_entities.len(),
        procedures = map.procedures.len(),
        "snapshot loaded"
    );
    Ok(map)
}
