//! Stratagate CLI
//!
//! The `stratagate` command scores strategic artifacts and evaluates project
//! stage gates against a SurrealDB-backed store.
//!
//! ## Commands
//!
//! - `put-entity`: Store an entity record so it can be validated by id
//! - `validate`: Run the five-layer validation for one target
//! - `gate`: Evaluate Gate 0, 1 or 2 for a project
//! - `history`: List stored validation records for a target
//! - `show-gate`: Print the latest stage-gate result for a project

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use stratagate_core::metrics::METRICS;
use stratagate_core::reporting::{
    render_rejection_md, render_stage_gate_md, render_validation_summary_md,
};
use stratagate_core::{
    EngineConfig, GateNumber, HttpJudge, HttpPermissionCheck, NoPermissionService,
    StageGateConfig, StageGateEvaluator, StageGateRequest, StageGateResult, ValidateError,
    ValidationEngine, ValidationPolicy, ValidationRequest, ValidationResponse,
};
use stratagate_store::{
    EntityKind, EntityRecord, PermissionCheck, ResultSink, SurrealStore, TargetRef,
};
use tracing::{info, Level};

/// Exit code for a validation rejected by unresolved hard stops.
const EXIT_BLOCKED: u8 = 2;

#[derive(Parser)]
#[command(name = "stratagate")]
#[command(author = "Stratagate Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Layered validation and stage-gating for strategic artifacts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an entity (JSON object file) under a kind and id
    PutEntity {
        /// Entity kind: project, strategy, analysis or deliverable
        kind: EntityKind,

        /// Entity id
        id: String,

        /// Path to the entity fields (JSON object)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate a stored entity or an inline payload
    Validate {
        /// Entity kind: project, strategy, analysis or deliverable
        kind: EntityKind,

        /// Id of a stored entity (omit when using --inline)
        id: Option<String>,

        /// Validate the JSON object in this file instead of a stored entity
        #[arg(long, conflicts_with = "id")]
        inline: Option<PathBuf>,

        /// Return `blocked` instead of `failed` when hard stops are unresolved
        #[arg(long)]
        enforce: bool,

        /// Actor sent to the permission check
        #[arg(long)]
        actor: Option<String>,

        /// JSON policy file overriding the default weights and thresholds
        #[arg(long, env = "STRATAGATE_POLICY")]
        policy: Option<PathBuf>,

        /// Permission service endpoint; without it access defaults to allow
        #[arg(long, env = "STRATAGATE_PERMISSION_URL")]
        permission_url: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Evaluate a stage gate from a request file
    Gate {
        /// Path to a stage-gate request (JSON)
        request: PathBuf,

        /// Judgment service endpoint
        #[arg(long, env = "STRATAGATE_JUDGE_URL")]
        judge_url: String,

        /// Seconds to wait for the judgment service
        #[arg(long, default_value = "60")]
        judge_timeout: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// List stored validation records for a target, newest first
    History {
        /// Entity kind: project, strategy, analysis or deliverable
        kind: EntityKind,

        /// Entity id
        id: String,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the latest stage-gate result for a project
    ShowGate {
        /// Project id
        project: String,

        /// Gate number (0, 1 or 2)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=2))]
        gate: u8,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    stratagate_core::init_tracing(cli.json, level);

    // Initialize database connection
    let store = Arc::new(
        SurrealStore::from_env()
            .await
            .context("Failed to connect to Stratagate database")?,
    );

    let outcome = match cli.command {
        Commands::PutEntity { kind, id, file } => cmd_put_entity(&store, kind, &id, &file).await,
        Commands::Validate {
            kind,
            id,
            inline,
            enforce,
            actor,
            policy,
            permission_url,
            format,
        } => {
            let request = build_validation_request(kind, id, inline.as_deref(), enforce, actor)?;
            let engine = build_engine(store.clone(), policy.as_deref(), permission_url.as_deref())?;
            cmd_validate(&engine, &request, format).await
        }
        Commands::Gate {
            request,
            judge_url,
            judge_timeout,
            format,
        } => {
            let evaluator =
                build_evaluator(store.clone(), &judge_url, Duration::from_secs(judge_timeout))?;
            cmd_gate(&evaluator, &request, format).await
        }
        Commands::History { kind, id, limit } => {
            let engine = build_engine(store.clone(), None, None)?;
            cmd_history(&engine, &TargetRef::new(kind, id), limit).await
        }
        Commands::ShowGate { project, gate } => {
            cmd_show_gate(store.as_ref(), &project, GateNumber::try_from(gate)?).await
        }
    };

    METRICS.flush();
    let outcome = outcome?;
    println!("{}", outcome.output.trim_end());
    Ok(ExitCode::from(outcome.code))
}

/// What a command prints and the process exit code.
#[derive(Debug)]
struct Outcome {
    output: String,
    code: u8,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self { output, code: 0 }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn read_json_object(path: &Path) -> Result<serde_json::Value> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {:?}", path))?;
    if !value.is_object() {
        bail!("{:?} must contain a JSON object", path);
    }
    Ok(value)
}

fn build_validation_request(
    kind: EntityKind,
    id: Option<String>,
    inline: Option<&Path>,
    enforce: bool,
    actor: Option<String>,
) -> Result<ValidationRequest> {
    let request = match (id, inline) {
        (_, Some(path)) => ValidationRequest::inline(kind, read_json_object(path)?),
        (Some(id), None) => ValidationRequest::by_id(kind, id),
        (None, None) => bail!("Pass an entity id or --inline <file>"),
    };
    let request = request.with_enforcement(enforce);
    Ok(match actor {
        Some(actor) => request.with_actor(actor),
        None => request,
    })
}

fn build_engine(
    store: Arc<SurrealStore>,
    policy: Option<&Path>,
    permission_url: Option<&str>,
) -> Result<ValidationEngine> {
    let mut config = EngineConfig::default();
    if let Some(path) = policy {
        let policy = ValidationPolicy::from_json_file(path)
            .with_context(|| format!("Failed to load policy from {:?}", path))?;
        config = config.with_policy(policy);
    }

    let permissions: Arc<dyn PermissionCheck> = match permission_url {
        Some(url) => Arc::new(HttpPermissionCheck::new(url, config.permission_timeout)?),
        None => Arc::new(NoPermissionService),
    };

    let engine = ValidationEngine::new(store.clone(), store.clone(), permissions, store, config)?;
    Ok(engine)
}

fn build_evaluator(
    store: Arc<SurrealStore>,
    judge_url: &str,
    judge_timeout: Duration,
) -> Result<StageGateEvaluator> {
    let config = StageGateConfig::default().with_judgment_timeout(judge_timeout);
    let judge = Arc::new(HttpJudge::new(judge_url, judge_timeout)?);
    Ok(StageGateEvaluator::new(judge, store.clone(), store.clone(), config)
        .with_project_store(store))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_put_entity(
    store: &SurrealStore,
    kind: EntityKind,
    id: &str,
    file: &Path,
) -> Result<Outcome> {
    if id.trim().is_empty() {
        bail!("Entity id must not be empty");
    }
    let fields = match read_json_object(file)? {
        serde_json::Value::Object(map) => map,
        _ => bail!("{:?} must contain a JSON object", file),
    };
    let record = EntityRecord {
        kind,
        id: id.to_string(),
        fields,
    };
    store
        .put_entity(&record)
        .await
        .with_context(|| format!("Failed to store {}", record.target()))?;
    info!(target = %record.target(), "entity stored");
    Ok(Outcome::ok(format!(
        "Stored {} ({} fields)",
        record.target(),
        record.fields.len()
    )))
}

async fn cmd_validate(
    engine: &ValidationEngine,
    request: &ValidationRequest,
    format: OutputFormat,
) -> Result<Outcome> {
    match engine.validate(request).await {
        Ok(record) => Ok(Outcome::ok(match format {
            OutputFormat::Markdown => render_validation_summary_md(&record),
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ValidationResponse::from_record(&record))?
            }
        })),
        Err(ValidateError::Blocked(rejection)) => Ok(Outcome {
            output: match format {
                OutputFormat::Markdown => render_rejection_md(&rejection),
                OutputFormat::Json => serde_json::to_string_pretty(&rejection)?,
            },
            code: EXIT_BLOCKED,
        }),
        Err(e) => Err(e).context("Validation failed"),
    }
}

async fn cmd_gate(
    evaluator: &StageGateEvaluator,
    request_path: &Path,
    format: OutputFormat,
) -> Result<Outcome> {
    let request: StageGateRequest = serde_json::from_value(read_json_object(request_path)?)
        .with_context(|| format!("Invalid stage-gate request in {:?}", request_path))?;
    let response = evaluator
        .evaluate(&request)
        .await
        .with_context(|| format!("Gate {} evaluation failed", request.gate_number))?;
    Ok(Outcome::ok(match format {
        OutputFormat::Markdown => render_stage_gate_md(&response.result),
        OutputFormat::Json => serde_json::to_string_pretty(&response)?,
    }))
}

/// One line of `history` output.
#[derive(Debug, Serialize)]
struct HistoryRow {
    record_id: String,
    status: String,
    aggregate_score: u8,
    digest: String,
    created_at: String,
}

async fn cmd_history(
    engine: &ValidationEngine,
    target: &TargetRef,
    limit: usize,
) -> Result<Outcome> {
    let records = engine
        .history(target)
        .await
        .with_context(|| format!("Failed to load history for {}", target))?;

    if records.is_empty() {
        return Ok(Outcome::ok(format!("No validations found for '{}'", target)));
    }

    let mut out = String::new();
    for record in records.iter().take(limit) {
        let row = HistoryRow {
            record_id: record.record_id.to_string(),
            status: record.status.to_string(),
            aggregate_score: record.aggregate_score,
            digest: record.content_digest().short().to_string(),
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        };
        out.push_str(&serde_json::to_string(&row)?);
        out.push('\n');
    }
    Ok(Outcome::ok(out))
}

async fn cmd_show_gate(sink: &dyn ResultSink, project: &str, gate: GateNumber) -> Result<Outcome> {
    let stored = sink
        .latest_stage_gate(project, gate.as_u8())
        .await
        .with_context(|| format!("Failed to load Gate {} for '{}'", gate, project))?;
    match stored {
        Some(stored) => {
            let result: StageGateResult = serde_json::from_value(stored.payload)
                .context("Stored stage-gate result is unreadable")?;
            Ok(Outcome::ok(render_stage_gate_md(&result)))
        }
        None => Ok(Outcome::ok(format!(
            "Gate {} has not been evaluated for '{}'",
            gate, project
        ))),
    }
}
