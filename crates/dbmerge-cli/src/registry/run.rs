use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use dbmerge_merge::{TokenRecord, ValidationReport};

use super::{RegistryError, RegistryResult};

/// Serializable merge options recorded with each run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub dialect: String,
    pub skip_relationships_tokens: bool,
    pub skip_pk_tokens: bool,
    pub remove_meaningful_pks: bool,
    pub remove_meaningful_fks: bool,
    pub quote_identifiers: bool,
    pub config_file: Option<PathBuf>,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub snapshot_version: String,
    pub model_path: PathBuf,
    pub db_path: PathBuf,
    pub run_dir: PathBuf,
    pub options: RunOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
struct RunConfig {
    run_id: String,
    started_at: String,
    command: String,
    snapshot_version: String,
    model: PathBuf,
    db: PathBuf,
    options: RunOptions,
    git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub tokens_path: PathBuf,
    pub sql_path: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command.clone(),
        snapshot_version: ctx.snapshot_version.clone(),
        model: ctx.model_path.clone(),
        db: ctx.db_path.clone(),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        tokens_path: root.join("tokens.json"),
        sql_path: root.join("changes.sql"),
        report_path: root.join("validation.json"),
        logs_path,
        root,
    })
}

/// Write `tokens.json` and `changes.sql`. Only `TO_DB` tokens contribute
/// statements.
pub fn write_tokens(paths: &RunPaths, records: &[TokenRecord]) -> RegistryResult<()> {
    write_json(&paths.tokens_path, &records)?;

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&paths.sql_path)?;
    for record in records {
        if record.sql.is_empty() {
            continue;
        }
        writeln!(file, "-- {} {}", record.name, record.value)?;
        for statement in &record.sql {
            writeln!(file, "{statement};")?;
        }
    }
    Ok(())
}

pub fn write_report(paths: &RunPaths, report: &ValidationReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
