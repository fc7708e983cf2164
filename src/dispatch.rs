//! Job queue and the single-consumer dispatch loop.
//!
//! Any number of tasks submit URLs through an [`ExtractorHandle`]; one
//! dispatcher task owns the rendering engine and processes jobs strictly
//! in arrival order. The engine is never driven from two places at once.

use crate::config::ExtractorConfig;
use crate::engine::RenderEngine;
use crate::error::SubmitError;
use crate::job::{ExtractMode, ExtractionResult, PageJob};
use crate::lifecycle;
use crate::pdf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

/// A queued extraction request with its reply channel.
struct QueuedJob {
    url: String,
    mode: ExtractMode,
    reply: oneshot::Sender<ExtractionResult>,
}

/// Messages understood by the dispatcher loop. `Shutdown` is a sentinel:
/// jobs queued behind it are never processed.
enum QueueMsg {
    Job(QueuedJob),
    Shutdown,
}

/// Cloneable handle for submitting work to the dispatcher.
#[derive(Clone)]
pub struct ExtractorHandle {
    tx: mpsc::UnboundedSender<QueueMsg>,
    wait_bound: Duration,
    depth: Arc<AtomicUsize>,
}

impl ExtractorHandle {
    /// Queue `url` and wait for its result.
    ///
    /// The wait is bounded by the page timeout plus a fixed grace period;
    /// an elapsed wait means the dispatcher is wedged or hopelessly backed
    /// up, which is a different failure than a slow page.
    pub async fn submit(
        &self,
        url: &str,
        mode: ExtractMode,
    ) -> Result<ExtractionResult, SubmitError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = QueuedJob {
            url: url.to_string(),
            mode,
            reply: reply_tx,
        };

        self.depth.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(QueueMsg::Job(job)).is_err() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            return Err(SubmitError::WorkerGone);
        }

        match timeout(self.wait_bound, reply_rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(SubmitError::WorkerGone),
            Err(_) => Err(SubmitError::Timeout),
        }
    }

    /// Push the shutdown sentinel. Jobs already queued ahead of it still
    /// run; anything submitted afterwards gets [`SubmitError::WorkerGone`].
    pub fn shutdown(&self) {
        let _ = self.tx.send(QueueMsg::Shutdown);
    }

    /// Jobs submitted but not yet picked up by the dispatcher.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

/// Start the dispatcher on a fresh task, taking ownership of `engine`.
///
/// Returns the submit handle and the dispatcher's join handle; the latter
/// resolves only after the shutdown sentinel has been processed and the
/// engine released.
pub fn spawn(
    engine: Box<dyn RenderEngine>,
    cfg: ExtractorConfig,
) -> (ExtractorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    let handle = ExtractorHandle {
        tx,
        wait_bound: cfg.wait_bound(),
        depth: Arc::clone(&depth),
    };
    let task = tokio::spawn(run_loop(engine, cfg, rx, depth));
    (handle, task)
}

/// The dispatcher loop: strictly one job at a time, in arrival order.
async fn run_loop(
    engine: Box<dyn RenderEngine>,
    cfg: ExtractorConfig,
    mut rx: mpsc::UnboundedReceiver<QueueMsg>,
    depth: Arc<AtomicUsize>,
) {
    while let Some(msg) = rx.recv().await {
        let queued = match msg {
            QueueMsg::Job(job) => job,
            QueueMsg::Shutdown => break,
        };
        depth.fetch_sub(1, Ordering::Relaxed);
        debug!("job started: {}", queued.url);

        let started = Instant::now();
        let result = process(engine.as_ref(), &cfg, &queued.url, queued.mode).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result.error {
            Some(e) => warn!("extracted {} in {}ms: {}", queued.url, elapsed_ms, e),
            None => info!("extracted {} in {}ms", queued.url, elapsed_ms),
        }

        // The caller may have given up; a dead receiver is not an error.
        let _ = queued.reply.send(result);
    }

    if let Err(e) = engine.shutdown().await {
        warn!("engine shutdown failed: {e}");
    }
    info!("dispatcher stopped");
}

/// Run one job to completion. Never fails; every problem folds into the
/// result's advisory error.
async fn process(
    engine: &dyn RenderEngine,
    cfg: &ExtractorConfig,
    url: &str,
    mode: ExtractMode,
) -> ExtractionResult {
    let mut job = PageJob::new(url, mode);
    match mode {
        ExtractMode::Pdf => {
            let result = pdf::extract(url, cfg).await;
            job.complete(result);
        }
        ExtractMode::Page => match engine.new_page().await {
            Ok(mut page) => {
                lifecycle::drive(&mut job, page.as_mut(), cfg).await;
                if let Err(e) = page.close().await {
                    warn!("failed to close page: {e}");
                }
            }
            Err(e) => {
                let mut result = ExtractionResult::new(url);
                result.error = Some(format!("Extraction failed: {e}"));
                job.complete(result);
            }
        },
    }
    job.take_result()
        .unwrap_or_else(|| ExtractionResult::new(url))
}
