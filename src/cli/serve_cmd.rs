//! Run the HTTP extraction server.

use crate::cli;
use crate::config::ExtractorConfig;
use crate::dispatch;
use crate::engine::chromium::ChromiumEngine;
use crate::engine::{NoopEngine, RenderEngine};
use crate::server::{self, AppState};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct ServeOpts {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    pub api_key: Option<String>,
}

/// Launch the engine, spawn the dispatcher, and serve until a signal.
pub async fn run(opts: ServeOpts, verbose: bool) -> Result<()> {
    cli::init_tracing(verbose);

    info!("starting quarry v{}", env!("CARGO_PKG_VERSION"));

    let cfg = ExtractorConfig {
        timeout: Duration::from_millis(opts.timeout_ms),
        user_agent: opts.user_agent.clone(),
        ..Default::default()
    };

    let engine: Box<dyn RenderEngine> = match ChromiumEngine::launch(&cfg).await {
        Ok(engine) => {
            info!("Chromium engine initialized");
            Box::new(engine)
        }
        Err(e) => {
            warn!("failed to initialize Chromium: {e:#}");
            warn!("running in PDF-only mode; page extraction will return errors");
            Box::new(NoopEngine)
        }
    };

    let (handle, dispatcher) = dispatch::spawn(engine, cfg);

    let api_key = opts.api_key.filter(|k| !k.is_empty());
    info!(
        "timeout: {}ms, auth: {}",
        opts.timeout_ms,
        if api_key.is_some() { "on" } else { "off" }
    );

    let state = Arc::new(AppState {
        extractor: handle,
        api_key,
        started_at: Instant::now(),
    });

    let addr = format!("{}:{}", opts.host, opts.port);
    server::serve(&addr, state, dispatcher).await
}
