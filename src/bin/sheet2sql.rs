use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sheet2sql::boundary::{handle_upload, UploadForm};
use sheet2sql::execution::{ExecutionOptions, IngestionEngine, TracingExecutionObserver};
use sheet2sql::ingestion::{
    CompositeObserver, FileObserver, IngestionJob, IngestionObserver, IngestionOptions, TableRequest,
    TracingObserver, DEFAULT_MIN_FILLED_PERCENT,
};
use sheet2sql::store::DuckDbStore;

/// Load spreadsheet files into DuckDB tables, inferring each table's schema from the data.
#[derive(Parser, Debug)]
#[command(name = "sheet2sql", version)]
struct Cli {
    /// Database file to load into.
    #[arg(long, env = "SHEET2SQL_DB", default_value = "sheet2sql.duckdb")]
    db: PathBuf,

    /// Target table. Defaults to the file stem when several files are given.
    #[arg(long)]
    table: Option<String>,

    /// Drop and recreate the table if it already exists.
    #[arg(long)]
    force: bool,

    /// Roll back the whole load if any row fails.
    #[arg(long)]
    atomic: bool,

    /// Minimum percentage of filled cells a row needs to be loaded.
    #[arg(
        long,
        default_value_t = DEFAULT_MIN_FILLED_PERCENT,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    min_filled_percent: u8,

    /// Worker threads for multi-file loads.
    #[arg(long)]
    jobs: Option<usize>,

    /// Append one line per load outcome to this file.
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Files or glob patterns (`.csv`, `.xlsx`, `.xls`).
    #[arg(required = true)]
    inputs: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = match expand_inputs(&cli.inputs) {
        Ok(paths) if !paths.is_empty() => paths,
        Ok(_) => {
            eprintln!("no input files matched");
            return ExitCode::from(2);
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let store = match DuckDbStore::open(&cli.db) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(db = %cli.db.display(), error = %e, "cannot open database");
            return ExitCode::FAILURE;
        }
    };

    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &cli.audit_log {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    let options = IngestionOptions {
        min_filled_percent: cli.min_filled_percent,
        atomic: cli.atomic,
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        ..Default::default()
    };

    if let [path] = paths.as_slice() {
        load_one(&store, &cli, path, &options)
    } else {
        load_many(&store, &cli, &paths, &options)
    }
}

fn load_one(store: &DuckDbStore, cli: &Cli, path: &Path, options: &IngestionOptions) -> ExitCode {
    let form = UploadForm {
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        file_path: Some(path.to_path_buf()),
        table_name: cli.table.clone(),
        force_overwrite: cli.force.then(|| "true".to_string()),
    };
    let reply = handle_upload(store, &form, options);
    print_json(&reply.body);
    if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_many(store: &DuckDbStore, cli: &Cli, paths: &[PathBuf], options: &IngestionOptions) -> ExitCode {
    let engine = match IngestionEngine::new(ExecutionOptions {
        num_threads: cli.jobs.filter(|&n| n > 0),
        ..Default::default()
    }) {
        Ok(engine) => engine.with_observer(Arc::new(TracingExecutionObserver)),
        Err(e) => {
            tracing::error!(error = %e, "cannot start worker pool");
            return ExitCode::FAILURE;
        }
    };

    let jobs: Vec<IngestionJob> = paths
        .iter()
        .map(|p| {
            let table = cli.table.clone().or_else(|| {
                p.file_stem().map(|s| s.to_string_lossy().into_owned())
            });
            IngestionJob::new(p, TableRequest::new(table.as_deref(), cli.force))
        })
        .collect();

    let results = engine.run_batch(store, &jobs, options);
    let mut all_ok = true;
    let summary: Vec<serde_json::Value> = jobs
        .iter()
        .zip(results)
        .map(|(job, result)| match result {
            Ok(report) => json!({
                "file": job.path.display().to_string(),
                "success": true,
                "report": report,
            }),
            Err(e) => {
                all_ok = false;
                json!({
                    "file": job.path.display().to_string(),
                    "success": false,
                    "tableName": job.request.effective_table_name(),
                    "message": e.to_string(),
                })
            }
        })
        .collect();

    print_json(&serde_json::Value::Array(summary));
    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut out = Vec::new();
    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let entries = glob::glob(input).map_err(|e| format!("bad pattern '{input}': {e}"))?;
            for entry in entries {
                out.push(entry.map_err(|e| e.to_string())?);
            }
        } else {
            out.push(PathBuf::from(input));
        }
    }
    Ok(out)
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("cannot render output: {e}"),
    }
}
