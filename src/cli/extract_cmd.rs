//! One-shot URL extraction from the command line.

use crate::config::ExtractorConfig;
use crate::dispatch;
use crate::engine::chromium::ChromiumEngine;
use crate::engine::{NoopEngine, RenderEngine};
use crate::job::{ExtractMode, ExtractionResult};
use crate::pdf;
use anyhow::{Context, Result};
use std::time::Duration;

pub struct ExtractOpts {
    pub urls: Vec<String>,
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    /// Print JSON (a single object for one URL, an array for several).
    pub json: bool,
    /// Print rendered HTML instead of plain text.
    pub html: bool,
    /// Force PDF extraction for every URL.
    pub pdf: bool,
}

/// Extract each URL in order and print the results.
pub async fn run(opts: ExtractOpts) -> Result<()> {
    let cfg = ExtractorConfig {
        timeout: Duration::from_millis(opts.timeout_ms),
        user_agent: opts.user_agent.clone(),
        ..Default::default()
    };

    // Decide page vs PDF up front; a pure-PDF batch never needs Chromium.
    let mut modes = Vec::with_capacity(opts.urls.len());
    for url in &opts.urls {
        let mode = if opts.pdf || pdf::detect(url, &cfg).await {
            ExtractMode::Pdf
        } else {
            ExtractMode::Page
        };
        modes.push(mode);
    }

    let engine: Box<dyn RenderEngine> = if modes.contains(&ExtractMode::Page) {
        Box::new(
            ChromiumEngine::launch(&cfg)
                .await
                .context("failed to start rendering engine")?,
        )
    } else {
        Box::new(NoopEngine)
    };

    let (handle, dispatcher) = dispatch::spawn(engine, cfg);

    let mut results = Vec::with_capacity(opts.urls.len());
    for (url, mode) in opts.urls.iter().zip(modes) {
        let result = match handle.submit(url, mode).await {
            Ok(r) => r,
            Err(e) => {
                let mut r = ExtractionResult::new(url.as_str());
                r.error = Some(e.to_string());
                r
            }
        };
        results.push(result);
    }

    handle.shutdown();
    let _ = dispatcher.await;

    if opts.json {
        if results.len() == 1 {
            println!("{}", serde_json::to_string(&results[0])?);
        } else {
            println!("{}", serde_json::to_string(&results)?);
        }
    } else {
        let many = results.len() > 1;
        for result in &results {
            if let Some(error) = &result.error {
                eprintln!("[ERROR] {error}");
            }
            if !result.title.is_empty() {
                println!("=== {} ===", result.title);
                println!("URL: {}\n", result.url);
            }
            println!("{}", if opts.html { &result.html } else { &result.text });
            if many {
                println!("\n{}\n", "=".repeat(60));
            }
        }
    }
    Ok(())
}
