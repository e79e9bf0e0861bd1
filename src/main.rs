//! gitops-engine CLI entry point

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use gitops_engine::cli::{Cli, Commands, ConfigAction};
use gitops_engine::{dispatch, EngineConfig, OperationContext, Provider, TraceId};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gitops_engine={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(Outcome::Value(value)) => {
            println!("{}", cli.format.render(&value));
            ExitCode::SUCCESS
        }
        Ok(Outcome::Failed(error)) => {
            eprintln!("{}", cli.format.render(&error.to_json()));
            error.exit_code()
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Either a JSON result or a structured operation failure. Start-up problems
/// (config, missing git) travel as `anyhow::Error` instead.
enum Outcome {
    Value(Value),
    Failed(gitops_engine::GitOpsError),
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = EngineConfig::load_from(path)?;
            config.apply_env_from(std::env::vars())?;
            config
        }
        None => EngineConfig::load()?,
    };
    if let Some(provider) = cli.provider {
        config.provider = provider.into();
    }
    if let Some(ms) = cli.timeout_ms {
        anyhow::ensure!(ms > 0, "--timeout-ms must be greater than zero");
        config.default_timeout_ms = ms;
    }
    Ok(config)
}

fn context(cli: &Cli) -> anyhow::Result<OperationContext> {
    let directory = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let directory = if directory.is_absolute() {
        directory
    } else {
        std::env::current_dir()?.join(directory)
    };

    let trace = cli
        .trace_id
        .clone()
        .map(TraceId::new)
        .unwrap_or_else(TraceId::generate);
    let mut ctx = OperationContext::new(directory).with_trace(trace);
    if let Some(ms) = cli.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }
    Ok(ctx)
}

fn setup(cli: &Cli, config: &EngineConfig) -> anyhow::Result<(Provider, OperationContext)> {
    let provider = config
        .build_provider()
        .context("cannot initialize provider")?;
    let ctx = context(cli)?;
    tracing::debug!(provider = provider.name(), trace = %ctx.trace, dir = %ctx.working_directory.display(), "ready");
    Ok((provider, ctx))
}

async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let config = load_config(cli)?;

    let value = match &cli.command {
        Commands::Config(args) => match args.action {
            ConfigAction::Show => serde_json::to_value(&config)?,
            ConfigAction::Path => json!({
                "path": cli
                    .config
                    .clone()
                    .or_else(EngineConfig::default_path)
                    .map(|path| path.display().to_string()),
            }),
        },
        Commands::Health => {
            let (provider, ctx) = setup(cli, &config)?;
            json!({
                "provider": provider.name(),
                "healthy": provider.health_check(&ctx).await,
            })
        }
        Commands::Capabilities => {
            let (provider, _) = setup(cli, &config)?;
            json!({
                "provider": provider.name(),
                "capabilities": provider.capabilities(),
                "operations": provider.capabilities().supported_operations(),
            })
        }
        Commands::Run(args) => {
            let options: Value = match &args.options {
                Some(text) => serde_json::from_str(text).context("--options is not valid JSON")?,
                None => Value::Null,
            };
            let (provider, ctx) = setup(cli, &config)?;
            match dispatch(&provider, args.operation, options, &ctx).await {
                Ok(value) => value,
                Err(error) => {
                    tracing::info!(
                        op = %args.operation,
                        kind = error.kind().as_str(),
                        trace = %ctx.trace,
                        "operation failed"
                    );
                    return Ok(Outcome::Failed(error));
                }
            }
        }
    };
    Ok(Outcome::Value(value))
}
