//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toolgate_application::{BackendRegistry, InvocationContext, InvokeToolUseCase};
use toolgate_domain::{CallContext, ConfigIssue, InvocationResult, OutputFormat, ToolArgs, ToolSpec};
#[cfg(feature = "http")]
use toolgate_infrastructure::HttpBackend;
use toolgate_infrastructure::{
    BasicValidator, ConfigLoader, DatabaseBackend, FileConfig, FunctionBackend, InMemoryMemory,
    InMemoryMetrics, TracingTracer, demo_tool_specs, register_demo_functions, tool_to_value,
};
use toolgate_presentation::{
    BatchReport, Cli, Command, ConsoleFormatter, InvokeArgs, OutputFormatter,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let registry = build_registry();
    info!(drivers = ?registry.drivers(), "Starting toolgate");

    let ok = match &cli.command {
        Command::List => run_list(&config),
        Command::Invoke(args) => run_invoke(args, &config, &registry).await?,
        Command::Export { tool } => run_export(&config, tool.as_deref())?,
        Command::Config { show_sources } => run_config(&cli, &config, *show_sources, &registry),
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Initialize logging based on verbosity level; `RUST_LOG` takes precedence
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file must name a file: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")
}

/// Registry with every shipped backend
fn build_registry() -> BackendRegistry {
    let functions = FunctionBackend::new();
    register_demo_functions(&functions);

    let registry = BackendRegistry::new()
        .with_backend(Arc::new(functions))
        .with_backend(Arc::new(DatabaseBackend::new()));
    #[cfg(feature = "http")]
    registry.register(Arc::new(HttpBackend::new()));
    registry
}

/// Configured tools, or the demo tools when none are configured
fn tool_specs(config: &FileConfig) -> (Vec<ToolSpec>, Vec<ConfigIssue>) {
    if config.tools.is_empty() {
        return (demo_tool_specs(), Vec::new());
    }
    config.tool_specs()
}

fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        warn!(severity = issue.severity.as_str(), "{}", issue.message);
    }
}

/// Collaborators shared by every call of one CLI run
fn runtime_context(
    config: &FileConfig,
    metrics: Arc<InMemoryMetrics>,
    cancellation: CancellationToken,
) -> InvocationContext {
    let ctx = InvocationContext::default()
        .with_validator(Arc::new(BasicValidator::new()))
        .with_security(Arc::new(config.security.to_security()))
        .with_memory(Arc::new(InMemoryMemory::with_capacity(config.cache.max_entries().0)))
        .with_metrics(metrics)
        .with_tracer(Arc::new(TracingTracer::new()))
        .with_cancellation(cancellation);
    match config.limiter.to_limiter() {
        Some(limiter) => ctx.with_limiter(Arc::new(limiter)),
        None => ctx,
    }
}

/// Per-call identity and deadline for call number `index`
fn call_context(args: &InvokeArgs, index: u32) -> CallContext {
    let mut call = CallContext::new().with_run(format!("run-{}", index + 1));
    if let Some(user) = &args.user {
        call = call.with_user(user.clone());
    }
    if let Some(session) = &args.session {
        call = call.with_session(session.clone());
    }
    if let Some(tenant) = &args.tenant {
        call = call.with_tenant(tenant.clone());
    }
    if let Some(role) = &args.role {
        call = call.with_role(role.clone());
    }
    if !args.permissions.is_empty() {
        call = call.with_permissions(args.permissions.clone());
    }
    if let Some(ms) = args.deadline_ms {
        call = call.with_timeout(std::time::Duration::from_millis(ms));
    }
    call
}

fn parse_tool_args(raw: &str) -> Result<ToolArgs> {
    match serde_json::from_str::<Value>(raw).context("--args must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {}", other),
    }
}

fn run_list(config: &FileConfig) -> bool {
    let (specs, issues) = tool_specs(config);
    report_issues(&issues);
    print!("{}", ConsoleFormatter::format_tool_list(&specs));
    !issues.iter().any(ConfigIssue::is_error)
}

async fn run_invoke(args: &InvokeArgs, config: &FileConfig, registry: &BackendRegistry) -> Result<bool> {
    let (specs, issues) = tool_specs(config);
    report_issues(&issues);

    let available: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
    let Some(spec) = specs.into_iter().find(|s| s.id == args.tool) else {
        bail!("Unknown tool '{}' (available: {})", args.tool, available.join(", "));
    };
    let tool_args = parse_tool_args(&args.args)?;

    let (lock_ttl, _) = config.cache.lock_ttl();
    let use_case = InvokeToolUseCase::new(spec, registry)?.with_lock_ttl(lock_ttl);

    let metrics = Arc::new(InMemoryMetrics::new());
    let cancellation = CancellationToken::new();
    let base = runtime_context(config, Arc::clone(&metrics), cancellation.clone());

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight calls");
            cancellation.cancel();
        }
    });

    let started = Instant::now();
    let results: Vec<InvocationResult> = stream::iter(0..args.repeat)
        .map(|index| {
            let ctx = base.clone().with_call(call_context(args, index));
            let use_case = &use_case;
            let tool_args = &tool_args;
            async move { use_case.execute(tool_args, &ctx).await }
        })
        .buffered(args.concurrency as usize)
        .collect()
        .await;
    interrupt.abort();

    let report = BatchReport::from_results(&results, started.elapsed().as_millis() as u64);
    let format = config.output.resolve_format(args.output.map(Into::into));

    if format == OutputFormat::Json {
        let payload = match results.as_slice() {
            [single] => serde_json::to_value(single)?,
            _ => {
                let mut payload = serde_json::Map::new();
                payload.insert("results".into(), serde_json::to_value(&results)?);
                payload.insert("report".into(), serde_json::to_value(&report)?);
                Value::Object(payload)
            }
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let formatter = ConsoleFormatter;
        for result in &results {
            println!("{}", formatter.render(result, format));
        }
        if results.len() > 1 {
            println!("{}", ConsoleFormatter::format_report(&report));
        }
    }

    if args.metrics {
        println!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
    }

    info!(
        tool = %args.tool,
        calls = report.calls,
        failed = report.failed(),
        "Invocation run finished"
    );
    Ok(report.failed() == 0)
}

/// JSON definition of `tool`, or an array of every tool
fn export_tools(config: &FileConfig, tool: Option<&str>) -> Result<Value> {
    let (specs, issues) = tool_specs(config);
    report_issues(&issues);

    match tool {
        Some(id) => {
            let Some(spec) = specs.iter().find(|s| s.id == id) else {
                let available: Vec<&str> = specs.iter().map(|s| s.id.as_str()).collect();
                bail!("Unknown tool '{}' (available: {})", id, available.join(", "));
            };
            Ok(tool_to_value(spec)?)
        }
        None => {
            let values = specs.iter().map(tool_to_value).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(values))
        }
    }
}

fn run_export(config: &FileConfig, tool: Option<&str>) -> Result<bool> {
    let payload = export_tools(config, tool)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(true)
}

fn run_config(cli: &Cli, config: &FileConfig, show_sources: bool, registry: &BackendRegistry) -> bool {
    if show_sources {
        println!("Configuration sources (in priority order):");
        for source in ConfigLoader::sources(cli.config.as_deref()) {
            let mark = if source.found { "FOUND" } else { "     " };
            println!("  [{}] {:<8} {}", mark, source.kind.as_str(), source.location);
        }
        println!();
    }

    let mut issues = config.validate();
    issues.extend(config.validate_drivers(&registry.drivers()));

    if issues.is_empty() {
        let (specs, _) = tool_specs(config);
        println!("Configuration OK ({} tools)", specs.len());
    } else {
        print!("{}", ConsoleFormatter::format_issues(&issues));
    }
    !issues.iter().any(ConfigIssue::is_error)
}
