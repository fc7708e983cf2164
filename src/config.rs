//! Runtime configuration for the extraction engine.

use std::path::PathBuf;
use std::time::Duration;

/// Default page-load timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Fixed delay between the load signal and extraction, giving post-load
/// JavaScript a chance to finish mutating the DOM.
pub const SETTLE_DELAY: Duration = Duration::from_millis(2_000);

/// Extra slack a caller waits beyond the page timeout before giving up
/// on the dispatcher entirely.
pub const WAIT_GRACE: Duration = Duration::from_secs(10);

/// Settings consumed once at engine startup plus the per-job timing knobs.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum time a page may spend loading before extraction is forced.
    pub timeout: Duration,
    /// User-Agent override, applied to both rendering and PDF fetches.
    pub user_agent: Option<String>,
    /// Keep cookies across runs in `storage_dir`.
    pub persist_cookies: bool,
    /// Profile directory for persistent browser state.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: None,
            persist_cookies: false,
            storage_dir: None,
        }
    }
}

impl ExtractorConfig {
    /// Upper bound a caller waits for a submitted job. Strictly larger than
    /// the page timeout so an elapsed wait means the dispatcher is wedged,
    /// not merely that the page was slow.
    pub fn wait_bound(&self) -> Duration {
        self.timeout + WAIT_GRACE
    }
}
