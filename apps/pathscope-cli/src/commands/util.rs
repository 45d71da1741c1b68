use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use pathscope_core::{load_config, EngineConfig, Session, SessionEvent};
use pathscope_gateway::HttpGateway;
use serde::Serialize;

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Backend base URL; overrides config and PATHSCOPE_BASE_URL
    #[arg(long, global = true)]
    pub base: Option<String>,
    /// Request timeout seconds; overrides config and PATHSCOPE_HTTP_TIMEOUT_SECS
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    /// Pretty-print JSON
    #[arg(long, global = true)]
    pub pretty: bool,
}

/// File (or defaults), then environment, then flags.
pub fn effective_config(args: &GlobalArgs) -> Result<EngineConfig> {
    let config = match args.config.as_deref() {
        Some(path) => load_config(path).with_context(|| format!("loading config {path}"))?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(base) = args.base.as_deref() {
        config.gateway.base_url = base.to_string();
    }
    if let Some(secs) = args.timeout {
        config.gateway.timeout_secs = secs;
    }
    Ok(config)
}

pub fn session(config: &EngineConfig) -> Result<Session<HttpGateway>> {
    let gateway = HttpGateway::from_config(&config.gateway).context("building http gateway")?;
    Ok(Session::new(config, Arc::new(gateway)))
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")
}

/// Applies every outstanding query; genuine failures become errors.
pub async fn settle(session: &mut Session<HttpGateway>) -> Result<Vec<SessionEvent>> {
    let events = session.settle_pending().await;
    for event in &events {
        if let SessionEvent::Failed { intent, error } = event {
            bail!("{intent} query failed: {error}");
        }
    }
    Ok(events)
}

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
