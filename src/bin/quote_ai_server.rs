//! quote-ai-server: HTTP front end for the quote generation orchestrator.
//!
//! Usage:
//!   quote-ai-server [--config <path>] [--bind <addr>]
//!
//! Configuration is read from `--config`, else `QUOTE_AI_CONFIG`, then
//! overridden by `QUOTE_AI_*` environment variables. Logging follows `RUST_LOG`
//! (default `info`).

use anyhow::{bail, Context};
use quote_ai::{server, Orchestrator, ServiceConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    bind: Option<String>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        config: None,
        bind: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(it.next().context("--config requires a path")?);
            }
            "--bind" | "-b" => {
                args.bind = Some(it.next().context("--bind requires an address")?);
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "version" | "--version" | "-V" => {
                println!("quote-ai-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(Some(args))
}

fn print_usage() {
    println!(
        r#"quote-ai-server

USAGE:
    quote-ai-server [--config <path>] [--bind <addr>]

ENVIRONMENT:
    QUOTE_AI_CONFIG             YAML configuration file
    QUOTE_AI_BIND               Listen address (default 0.0.0.0:8000)
    QUOTE_AI_REDIS_URL          Redis cache (optional)
    QUOTE_AI_TIMEOUT_SECS       Budget for one provider attempt, retries included
    QUOTE_AI_CALL_TIMEOUT_MS    Timeout of a single provider HTTP call
    OPENAI_API_KEY              Provider credentials
    ANTHROPIC_API_KEY
    AZURE_OPENAI_API_KEY
    AZURE_OPENAI_ENDPOINT
    RUST_LOG                    Log filter (default info)"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("failed to read config file {path}"))?,
        None => ServiceConfig::load().context("failed to load configuration")?,
    };
    if args.config.is_some() {
        config.apply_overrides(|k| std::env::var(k).ok());
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    config.validate().context("invalid configuration")?;

    let orchestrator = Orchestrator::from_config(&config)
        .await
        .context("failed to build orchestrator")?;

    server::serve(Arc::new(orchestrator), &config.bind)
        .await
        .context("server terminated")?;
    Ok(())
}
