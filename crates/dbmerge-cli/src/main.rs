mod registry;
mod settings;
mod snapshot;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use dbmerge_core::{DataMap, Error as CoreError, SNAPSHOT_VERSION};
use dbmerge_merge::{
    ApplyPolicy, DataMapMerger, DbAdapter, DefaultNameGenerator, DefaultTokenFactory,
    EntityMergeSupport, GenericAdapter, MergeDirection, MergeError, MergerContext, MergerToken,
    PostgresAdapter, RecordingExecutor, TokenRecord, ValidationReport, apply_tokens, lock_model,
    reverse_tokens,
};
use registry::{RunContext, RunOptions, RunPaths, init_logging, start_run, write_report, write_tokens};
use settings::{Dialect, MergeSettings, SettingsError, load_settings};
use snapshot::load_snapshot;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} token(s) failed to apply")]
    ApplyFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "dbmerge", version, about = "Schema merge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ordered tokens turning the database into the model.
    Diff(DiffArgs),
    /// Update the model so it matches the database.
    SyncModel(SyncModelArgs),
    /// Print the JSON Schema of the snapshot format.
    Schema,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Reference model snapshot.
    #[arg(long, value_name = "JSON")]
    model: PathBuf,
    /// Database snapshot.
    #[arg(long, value_name = "JSON")]
    db: PathBuf,
    /// TOML merge configuration.
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,
    /// SQL dialect; overrides the configuration file.
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,
    /// Do not compare relationships.
    #[arg(long, default_value_t = false)]
    skip_relationships: bool,
    /// Do not compare primary keys.
    #[arg(long, default_value_t = false)]
    skip_pk: bool,
    /// Quote identifiers in generated SQL.
    #[arg(long, default_value_t = false)]
    quote_identifiers: bool,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Debug-level logging.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DiffArgs {
    #[command(flatten)]
    merge: MergeArgs,
    /// Print tokens as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Run the database tokens through a recording executor and report
    /// what would be executed.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SyncModelArgs {
    #[command(flatten)]
    merge: MergeArgs,
    /// Where to write the updated model.
    #[arg(long, value_name = "JSON")]
    out: PathBuf,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Diff(args) => run_diff(args),
        Command::SyncModel(args) => run_sync_model(args),
        Command::Schema => print_schema(),
    }
}

/// Loaded inputs plus the run directory all commands share.
struct Session {
    settings: MergeSettings,
    paths: RunPaths,
    model: DataMap,
    db: DataMap,
    merger: DataMapMerger,
}

fn start_session(command: &str, args: &MergeArgs) -> Result<Session, CliError> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(dialect) = args.dialect {
        settings.dialect = dialect;
    }
    settings.skip_relationships |= args.skip_relationships;
    settings.skip_pk |= args.skip_pk;
    settings.quote_identifiers |= args.quote_identifiers;

    let ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: Utc::now(),
        command: command.to_string(),
        snapshot_version: SNAPSHOT_VERSION.to_string(),
        model_path: args.model.clone(),
        db_path: args.db.clone(),
        run_dir: args.run_dir.clone(),
        options: RunOptions {
            dialect: settings.dialect.as_str().to_string(),
            skip_relationships_tokens: settings.skip_relationships,
            skip_pk_tokens: settings.skip_pk,
            remove_meaningful_pks: settings.remove_meaningful_pks,
            remove_meaningful_fks: settings.remove_meaningful_fks,
            quote_identifiers: settings.quote_identifiers,
            config_file: args.config.clone(),
        },
    };
    let paths = start_run(&ctx)?;
    init_logging(Some(&paths.logs_path), args.verbose)?;
    info!(
        run_id = %ctx.run_id,
        command,
        run_dir = %paths.root.display(),
        "run started"
    );

    let model = load_snapshot(&args.model)?;
    let db = load_snapshot(&args.db)?;

    let merger = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .filters(settings.filters.clone())
        .value_for_null(settings.value_for_null_provider())
        .skip_relationships_tokens(settings.skip_relationships)
        .skip_pk_tokens(settings.skip_pk)
        .build()?;

    Ok(Session {
        settings,
        paths,
        model,
        db,
        merger,
    })
}

fn adapter_for(settings: &MergeSettings) -> Box<dyn DbAdapter> {
    match settings.dialect {
        Dialect::Generic => Box::new(GenericAdapter {
            quote_identifiers: settings.quote_identifiers,
        }),
        Dialect::Postgres => Box::new(PostgresAdapter {
            quote_identifiers: settings.quote_identifiers,
        }),
    }
}

fn records(tokens: &[MergerToken], adapter: &dyn DbAdapter) -> Vec<TokenRecord> {
    tokens.iter().map(|token| token.record(adapter)).collect()
}

fn run_diff(args: DiffArgs) -> Result<(), CliError> {
    let session = start_session("diff", &args.merge)?;
    let tokens = session
        .merger
        .create_merge_tokens(&session.model, &session.db)?;
    let adapter = adapter_for(&session.settings);
    let records = records(&tokens, adapter.as_ref());
    write_tokens(&session.paths, &records)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("model and database are in sync");
    } else {
        for (token, record) in tokens.iter().zip(&records) {
            println!("{token}");
            for statement in &record.sql {
                println!("    {statement};");
            }
        }
    }

    if args.dry_run {
        let (statements, report) = dry_run(&session, &tokens);
        write_report(&session.paths, &report)?;
        info!(statements = statements.len(), failed = report.errors.len(), "dry run finished");
        if !args.json {
            println!("dry run: {} statement(s) recorded", statements.len());
        }
        if !report.is_ok() {
            return Err(CliError::ApplyFailed(report.errors.len()));
        }
    }

    info!(
        tokens = records.len(),
        to_db = tokens
            .iter()
            .filter(|token| token.direction() == MergeDirection::ToDb)
            .count(),
        "diff finished"
    );
    Ok(())
}

/// Apply the `TO_DB` tokens against a copy of the model with a recording
/// executor.
fn dry_run(session: &Session, tokens: &[MergerToken]) -> (Vec<String>, ValidationReport) {
    let to_db: Vec<MergerToken> = tokens
        .iter()
        .filter(|token| token.direction() == MergeDirection::ToDb)
        .cloned()
        .collect();
    let recorder = RecordingExecutor::new();
    let model = Arc::new(Mutex::new(session.model.clone()));
    let mut ctx = MergerContext::new(model)
        .with_executor(recorder.clone())
        .with_boxed_adapter(adapter_for(&session.settings));
    apply_tokens(&to_db, &mut ctx, ApplyPolicy::default());
    (recorder.statements(), ctx.take_validation())
}

fn run_sync_model(args: SyncModelArgs) -> Result<(), CliError> {
    let Session {
        settings,
        paths,
        model,
        db,
        merger,
    } = start_session("sync-model", &args.merge)?;

    let tokens = merger.create_merge_tokens(&model, &db)?;
    let to_db: Vec<MergerToken> = tokens
        .into_iter()
        .filter(|token| token.direction() == MergeDirection::ToDb)
        .collect();
    let reversed = reverse_tokens(&to_db, merger.token_factory());
    write_tokens(&paths, &records(&reversed, adapter_for(&settings).as_ref()))?;

    let mut support = EntityMergeSupport::new(Arc::new(DefaultNameGenerator));
    support.set_remove_meaningful_pks(settings.remove_meaningful_pks);
    support.set_remove_meaningful_fks(settings.remove_meaningful_fks);

    let shared = Arc::new(Mutex::new(model));
    let mut ctx = MergerContext::new(Arc::clone(&shared)).with_entity_merge_support(support);
    let applied = apply_tokens(&reversed, &mut ctx, ApplyPolicy::default());
    let report = ctx.take_validation();
    write_report(&paths, &report)?;

    let updated = lock_model(&shared)?.clone();
    registry::write_json(&args.out, &updated)?;

    for issue in &report.warnings {
        warn!(code = %issue.code, token = %issue.path, "{}", issue.message);
    }
    if !report.is_ok() {
        for issue in &report.errors {
            error!(code = %issue.code, token = %issue.path, "{}", issue.message);
        }
        return Err(CliError::ApplyFailed(report.errors.len()));
    }

    info!(applied, out = %args.out.display(), "model updated");
    println!("applied {applied} token(s) to {}", args.out.display());
    Ok(())
}

fn print_schema() -> Result<(), CliError> {
    let schema = schemars::schema_for!(DataMap);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
