//! Drives one page job from `Pending` to `Done` against a rendering surface.
//!
//! The sequence is load → settle → extract, bounded by a single deadline
//! that keeps running through the settle window. Whichever of load-finished
//! and deadline fires first decides the path; the loser is cancelled and a
//! late firing has nothing left to interrupt.

use crate::config::{ExtractorConfig, SETTLE_DELAY};
use crate::engine::RenderPage;
use crate::job::{ExtractionResult, JobState, PageJob};
use tokio::time::{self, Instant};
use tracing::debug;

/// Advisory error when the page did not finish loading inside the timeout.
pub const TIMEOUT_ERROR: &str = "Timed out (partial content may be available)";

/// Advisory error when the engine reported a failed load.
pub const LOAD_FAILURE_ERROR: &str = "Page load reported failure (content may be incomplete)";

enum LoadOutcome {
    /// The engine signalled load-finished with this success flag.
    Finished(bool),
    /// The deadline elapsed while still loading.
    DeadlineHit,
}

/// Run the load → settle → extract sequence for `job` on `page`.
///
/// Always completes the job: timeouts and engine failures end up as
/// advisory errors on the result, never as an early return. A failed load
/// signal still settles and extracts, since partial content beats none.
pub async fn drive(job: &mut PageJob, page: &mut dyn RenderPage, cfg: &ExtractorConfig) {
    let url = job.url.clone();
    let deadline = Instant::now() + cfg.timeout;

    job.advance(JobState::Loading);
    let outcome = {
        let load = page.load(&url);
        tokio::pin!(load);
        tokio::select! {
            ok = &mut load => LoadOutcome::Finished(ok),
            _ = time::sleep_until(deadline) => LoadOutcome::DeadlineHit,
        }
    };

    let (load_ok, timed_out) = match outcome {
        LoadOutcome::Finished(ok) => {
            job.advance(JobState::Settling);
            // The page deadline keeps running through the settle window.
            let settled = tokio::select! {
                _ = time::sleep(SETTLE_DELAY) => true,
                _ = time::sleep_until(deadline) => false,
            };
            (ok, !settled)
        }
        LoadOutcome::DeadlineHit => (false, true),
    };

    job.advance(JobState::Extracting);
    if timed_out {
        debug!("deadline hit for {url}, extracting partial content");
    }

    let mut result = ExtractionResult::new(&url);
    result.title = page.title().await;
    let current = page.current_url().await;
    if !current.is_empty() {
        result.url = current;
    }

    // Timeout outranks a failed-load report; both are advisory.
    let mut error = if timed_out {
        Some(TIMEOUT_ERROR.to_string())
    } else if !load_ok {
        Some(LOAD_FAILURE_ERROR.to_string())
    } else {
        None
    };

    match page.plain_text().await {
        Ok(text) => result.text = text,
        Err(e) => {
            if error.is_none() {
                error = Some(format!("Extraction failed: {e}"));
            }
        }
    }
    match page.html().await {
        Ok(html) => result.html = html,
        Err(e) => {
            if error.is_none() {
                error = Some(format!("Extraction failed: {e}"));
            }
        }
    }

    result.error = error;
    job.complete(result);
}
