//! tabula: turn arbitrary JSON API payloads into flat tables.
//!
//! Subcommands cover the transformation pipeline end to end: `discover`
//! finds the record array, `synthesize` builds a plan from a goal,
//! `validate` checks a plan's structure, and `preview` executes a plan
//! (or a goal) against a document and emits CSV or JSON.

mod config;
mod csv;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tabula_engine::{
    discover, execute_with_aliases, extract_and_normalize, infer_schema, synthesize,
};
use tabula_plan::TransformPlan;

use config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Row output format for the preview subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PreviewFormat {
    Csv,
    Json,
}

/// Tabula JSON-to-table toolchain.
#[derive(Parser)]
#[command(name = "tabula", version, about = "Tabula JSON-to-table toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress warnings and non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the record array inside a JSON document
    Discover {
        /// Path to the JSON document
        document: PathBuf,
        /// Goal text used to steer discovery between candidate arrays
        #[arg(long)]
        goal: Option<String>,
    },

    /// Build a plan from a goal description, without executing it
    Synthesize {
        /// Path to the JSON document
        document: PathBuf,
        /// Goal text (e.g. "sum value by category")
        #[arg(long)]
        goal: String,
        /// Record path to use instead of running discovery
        #[arg(long)]
        record_path: Option<String>,
    },

    /// Validate a plan file's structure
    Validate {
        /// Path to the plan JSON file
        plan: PathBuf,
    },

    /// Execute a plan (or a goal) against a document and print rows
    Preview {
        /// Path to the JSON document
        document: PathBuf,
        /// Path to a plan JSON file
        #[arg(long, conflicts_with = "goal")]
        plan: Option<PathBuf>,
        /// Goal text to synthesize a plan from
        #[arg(long)]
        goal: Option<String>,
        /// Row output format
        #[arg(long, default_value = "csv", value_enum)]
        format: PreviewFormat,
        /// Also emit the inferred output schema
        #[arg(long)]
        schema: bool,
        /// Path to a tabula.toml config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// CLI-level errors, mapped to exit codes in `main`.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },

    #[error("{0}")]
    Usage(String),

    /// Structural failures: bad plan shape, no recordset, wrong input
    /// shape. Exit code 1, distinct from usage/IO problems.
    #[error("{0}")]
    Invalid(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Invalid(_) => 1,
            _ => 2,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Discover { document, goal } => run_discover(cli, document, goal.as_deref()),
        Commands::Synthesize {
            document,
            goal,
            record_path,
        } => run_synthesize(document, goal, record_path.as_deref()),
        Commands::Validate { plan } => run_validate(cli, plan),
        Commands::Preview {
            document,
            plan,
            goal,
            format,
            schema,
            config,
        } => run_preview(
            cli,
            document,
            plan.as_deref(),
            goal.as_deref(),
            *format,
            *schema,
            config.as_deref(),
        ),
    }
}

// ── Subcommands ─────────────────────────────────────────────────────

fn run_discover(cli: &Cli, document: &Path, goal: Option<&str>) -> Result<(), CliError> {
    let doc = read_json(document)?;
    let discovery = discover(&doc, goal).map_err(|e| CliError::Invalid(e.to_string()))?;

    match cli.output {
        OutputFormat::Json => {
            println!("{}", pretty(&serde_json::to_value(&discovery).unwrap_or_default()));
        }
        OutputFormat::Text => {
            println!("record path: {}", display_path(&discovery.record_path));
            println!("score: {:.2}", discovery.score);
            if !cli.quiet {
                println!("candidates:");
                for c in &discovery.candidates {
                    println!(
                        "  {}  length={} fields={} score={:.2}",
                        display_path(&c.path),
                        c.array_length,
                        c.object_field_count,
                        c.score
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_synthesize(
    document: &Path,
    goal: &str,
    record_path: Option<&str>,
) -> Result<(), CliError> {
    let doc = read_json(document)?;
    let record_path = match record_path {
        Some(p) => p.to_string(),
        None => {
            discover(&doc, Some(goal))
                .map_err(|e| CliError::Invalid(e.to_string()))?
                .record_path
        }
    };
    let normalized = extract_and_normalize(&doc, &record_path)
        .map_err(|e| CliError::Invalid(e.to_string()))?;

    let plan = synthesize(goal, &record_path, &normalized.sample);
    println!("{}", pretty(&plan.to_json()));
    Ok(())
}

fn run_validate(cli: &Cli, plan_path: &Path) -> Result<(), CliError> {
    let plan = load_plan(plan_path)?;
    match cli.output {
        OutputFormat::Json => println!(
            "{}",
            pretty(&json!({ "valid": true, "steps": plan.steps.len() }))
        ),
        OutputFormat::Text => println!("plan is valid ({} steps)", plan.steps.len()),
    }
    Ok(())
}

fn run_preview(
    cli: &Cli,
    document: &Path,
    plan_path: Option<&Path>,
    goal: Option<&str>,
    format: PreviewFormat,
    want_schema: bool,
    config_path: Option<&Path>,
) -> Result<(), CliError> {
    let doc = read_json(document)?;
    let cfg = match config_path {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };

    let plan = match (plan_path, goal) {
        (Some(path), _) => load_plan(path)?,
        (None, Some(goal)) => {
            let discovery = discover(&doc, Some(goal)).map_err(|e| CliError::Invalid(e.to_string()))?;
            let normalized = extract_and_normalize(&doc, &discovery.record_path)
                .map_err(|e| CliError::Invalid(e.to_string()))?;
            synthesize(goal, &discovery.record_path, &normalized.sample)
        }
        (None, None) => {
            return Err(CliError::Usage(
                "preview needs either --plan or --goal".to_string(),
            ))
        }
    };

    let mut result = execute_with_aliases(&plan, &doc, &cfg.resolver.aliases)
        .map_err(|e| CliError::Invalid(e.to_string()))?;
    if let Some(max) = cfg.preview.max_rows {
        result.rows.truncate(max);
    }

    if !cli.quiet {
        for w in &result.warnings {
            eprintln!("warning: {}", w);
        }
    }

    let schema = want_schema.then(|| infer_schema(&result.rows));
    match format {
        PreviewFormat::Csv => {
            print!("{}", csv::write_rows(&result.rows));
            if let Some(schema) = schema {
                eprintln!("{}", pretty(&schema));
            }
        }
        PreviewFormat::Json => {
            let mut out = json!({ "rows": result.rows });
            if let Some(schema) = schema {
                out["schema"] = schema;
            }
            println!("{}", pretty(&out));
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Read, parse, and structurally validate a plan file. Shape problems
/// are structural failures (exit 1), unlike unreadable files (exit 2).
fn load_plan(path: &Path) -> Result<TransformPlan, CliError> {
    let value = read_json(path)?;
    let plan = tabula_plan::from_plan_json(&value).map_err(|e| CliError::Invalid(e.to_string()))?;
    tabula_plan::validate(&plan).map_err(|e| CliError::Invalid(e.to_string()))?;
    Ok(plan)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The empty pointer means the document root; print something visible.
fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}
