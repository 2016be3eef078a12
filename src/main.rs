//! AltWalker CLI: validates model sets, verifies test code against them, and
//! drives online/offline walks through a path generator and an executor.

use altwalker::errors;
use altwalker::executors;
use altwalker::loader;
use altwalker::planner;
use altwalker::process;
use altwalker::protocol;
use altwalker::reporter;
use altwalker::telemetry;
use altwalker::validation;
use altwalker::verifier;
use altwalker::walker;

use clap::{Parser, Subcommand};
use errors::AltWalkerError;
use executors::{Executor, HttpExecutor, OfflineExecutor};
use planner::{OfflinePlanner, OnlinePlanner, Planner};
use process::ProcessLimits;
use protocol::ModelSet;
use reporter::{JsonReporter, PrettyReporter, Reporting};
use std::path::PathBuf;
use telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, Level};
use walker::Walker;

#[derive(Parser)]
#[command(name = "altwalker")]
#[command(about = "Model-based test runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate model files (schema + semantic invariants).
    Check {
        #[arg(short = 'm', long = "model", required = true)]
        models: Vec<String>,

        /// Generator + stop-condition expressions to sanity-check, e.g. `random(length(10))`.
        expressions: Vec<String>,
    },

    /// Check that the test code implements every model/step declared.
    Verify {
        /// Path to the test code, or base URL of an already-running executor.
        tests: String,

        #[arg(short = 'l', long = "language")]
        language: Option<String>,

        #[arg(short = 'm', long = "model", required = true)]
        models: Vec<String>,

        #[arg(long)]
        url: Option<String>,
    },

    /// Drive a live path generator against the test code.
    Online {
        tests: String,

        #[arg(short = 'm', long = "model", required = true)]
        models: Vec<String>,

        /// Generator + stop-condition expression, e.g. `random(edge_coverage(100))`.
        expression: String,

        #[arg(short = 'x', long = "executor")]
        executor_kind: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long = "gw-host", default_value = "127.0.0.1")]
        gw_host: String,

        #[arg(long = "gw-port", default_value_t = 0)]
        gw_port: u16,

        #[arg(long = "report-file")]
        report_file: Option<PathBuf>,

        #[arg(long = "report-path", default_value = "false")]
        report_path: bool,

        #[arg(long = "unvisited", default_value = "false")]
        unvisited: bool,
    },

    /// Generate a path offline (no test code involved) and optionally save it.
    Offline {
        #[arg(short = 'm', long = "model", required = true)]
        models: Vec<String>,

        expression: String,

        #[arg(short = 'f', long = "output")]
        output: Option<PathBuf>,
    },

    /// Replay a previously recorded path file against the test code.
    Walk {
        tests: String,
        steps: PathBuf,

        #[arg(short = 'x', long = "executor")]
        executor_kind: Option<String>,

        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut telemetry_config = TelemetryConfig::from_env();
    telemetry_config.log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_telemetry(telemetry_config) {
        eprintln!("warning: failed to initialize telemetry: {e}");
    }

    let exit_code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "altwalker failed");
            e.exit_code()
        }
    };

    shutdown_telemetry();
    std::process::exit(exit_code);
}

async fn run(command: Commands) -> Result<i32, AltWalkerError> {
    match command {
        Commands::Check { models, expressions } => cmd_check(&models, &expressions).await,
        Commands::Verify { tests, language: _, models, url } => cmd_verify(&tests, &models, url).await,
        Commands::Online {
            tests,
            models,
            expression,
            executor_kind,
            url,
            gw_host,
            gw_port,
            report_file,
            report_path: _,
            unvisited: _,
        } => cmd_online(&tests, &models, &expression, executor_kind, url, &gw_host, gw_port, report_file).await,
        Commands::Offline { models, expression, output } => cmd_offline(&models, &expression, output).await,
        Commands::Walk { tests, steps, executor_kind, url } => cmd_walk(&tests, &steps, executor_kind, url).await,
    }
}

fn load_and_validate(models: &[String]) -> Result<ModelSet, AltWalkerError> {
    let model_set = loader::load_model_set("graphwalker", models)
        .map_err(|e| AltWalkerError::Validation(e.to_string()))?;

    let raw = serde_json::to_value(&model_set).map_err(|e| AltWalkerError::Validation(e.to_string()))?;
    validation::validate_schema(&raw).map_err(|errs| AltWalkerError::Validation(errs.join("; ")))?;
    validation::validate_semantics(&model_set)
        .map_err(|errs| AltWalkerError::Validation(errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")))?;

    Ok(model_set)
}

async fn cmd_check(models: &[String], expressions: &[String]) -> Result<i32, AltWalkerError> {
    let model_set = load_and_validate(models)?;
    tracing::info!(models = model_set.models.len(), expressions = expressions.len(), "model set is valid");
    Ok(0)
}

async fn cmd_verify(tests: &str, models: &[String], url: Option<String>) -> Result<i32, AltWalkerError> {
    let model_set = load_and_validate(models)?;

    let executor = connect_executor(tests, url).await?;
    let report = verifier::verify_code(&model_set, &executor)
        .await
        .map_err(AltWalkerError::ExecutorProtocol)?;
    let _ = executor.kill().await;

    if report.is_clean() {
        tracing::info!("test code implements every declared model and step");
        Ok(0)
    } else {
        for model in &report.missing_models {
            error!(model, "model not found in test code");
        }
        for element in &report.missing_elements {
            error!(model = %element.model, kind = ?element.kind, name = %element.name, "step not found in test code");
        }
        Ok(1)
    }
}

async fn connect_executor(tests: &str, url: Option<String>) -> Result<HttpExecutor, AltWalkerError> {
    match url {
        Some(url) => Ok(HttpExecutor::connect(url)),
        None => {
            let limits = ProcessLimits::from_env();
            let args = vec!["serve".to_string()];
            HttpExecutor::spawn(tests, &args, 0, limits)
                .await
                .map_err(AltWalkerError::ExecutorProtocol)
        }
    }
}

async fn cmd_online(
    tests: &str,
    models: &[String],
    expression: &str,
    _executor_kind: Option<String>,
    url: Option<String>,
    gw_host: &str,
    gw_port: u16,
    report_file: Option<PathBuf>,
) -> Result<i32, AltWalkerError> {
    let _ = load_and_validate(models)?;
    let _ = gw_host;

    let limits = ProcessLimits::from_env();
    let planner = OnlinePlanner::spawn("graphwalker", models, gw_port, limits.clone()).await?;
    let executor = connect_executor(tests, url).await?;

    let mut reporting = Reporting::new();
    reporting.add(Box::new(PrettyReporter::new()));
    reporting.add(Box::new(JsonReporter::new(report_file)));

    let mut walker = Walker::new(planner, executor, reporting, CancellationToken::new());
    let outcome = walker.run(models, expression).await?;

    Ok(if outcome.passed() { 0 } else { 1 })
}

async fn cmd_offline(models: &[String], expression: &str, output: Option<PathBuf>) -> Result<i32, AltWalkerError> {
    if expression.contains("never") || expression.contains("time_duration") {
        eprintln!("`offline` does not accept `never` or `time_duration` stop conditions");
        return Ok(2);
    }

    let _ = load_and_validate(models)?;

    let limits = ProcessLimits::from_env();
    let mut planner = OnlinePlanner::spawn("graphwalker", models, 0, limits).await?;

    let mut steps = Vec::new();
    while planner.has_next().await? {
        steps.push(planner.get_next().await?);
    }
    planner.close().await?;

    if let Some(path) = output {
        loader::write_path_file(&path, &steps).map_err(|e| AltWalkerError::Validation(e.to_string()))?;
    } else {
        let json = serde_json::to_string_pretty(&steps).unwrap_or_default();
        println!("{json}");
    }

    Ok(0)
}

async fn cmd_walk(tests: &str, steps_path: &PathBuf, executor_kind: Option<String>, url: Option<String>) -> Result<i32, AltWalkerError> {
    let steps = loader::load_path_file(steps_path).map_err(|e| AltWalkerError::Validation(e.to_string()))?;
    let model_names: Vec<String> = steps
        .iter()
        .filter_map(|s| s.model_name.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let planner = OfflinePlanner::new(steps);
    let executor: Box<dyn Executor> = if executor_kind.as_deref() == Some("offline") {
        Box::new(OfflineExecutor::new())
    } else {
        Box::new(connect_executor(tests, url).await?)
    };

    let mut reporting = Reporting::new();
    reporting.add(Box::new(PrettyReporter::new()));

    let mut walker = Walker::new(planner, AnyExecutor(executor), reporting, CancellationToken::new());
    let outcome = walker.run(&model_names, "offline").await?;

    Ok(if outcome.passed() { 0 } else { 1 })
}

/// Adapts a boxed trait object so `Walker<P, E, R>` (which takes `E: Executor`
/// by value) can be driven by either concrete executor without duplicating
/// the walk call site.
struct AnyExecutor(Box<dyn Executor>);

#[async_trait::async_trait]
impl Executor for AnyExecutor {
    async fn has_model(&self, model_name: &str) -> Result<bool, errors::ExecutorProtocolError> {
        self.0.has_model(model_name).await
    }
    async fn has_step(&self, model_name: Option<&str>, step_name: &str) -> Result<bool, errors::ExecutorProtocolError> {
        self.0.has_step(model_name, step_name).await
    }
    async fn execute_step(&self, step: &protocol::Step) -> Result<protocol::ExecutionResult, errors::ExecutorProtocolError> {
        self.0.execute_step(step).await
    }
    async fn reset(&self) -> Result<(), errors::ExecutorProtocolError> {
        self.0.reset().await
    }
    async fn kill(&self) -> Result<(), errors::ExecutorProtocolError> {
        self.0.kill().await
    }
}
