//! Job types and the per-page extraction state machine.

use serde::{Deserialize, Serialize};

/// How a submitted URL is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Render in the browser engine, then scrape text and HTML.
    Page,
    /// Fetch and parse as a PDF document. No rendering involved.
    Pdf,
}

/// Lifecycle states of a [`PageJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Loading,
    Settling,
    Extracting,
    Done,
}

/// The outcome of one extraction, as returned to callers.
///
/// `error` is advisory: the other fields may still hold partial content
/// when it is set, and an absent error does not guarantee non-empty text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Final URL after any redirects.
    pub url: String,
    pub title: String,
    pub text: String,
    /// Serialized DOM. Empty for PDF extractions.
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Empty result for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// One extraction request moving through the dispatcher.
///
/// State only moves forward: Pending → Loading → Settling → Extracting,
/// with Settling skipped when the load deadline hits, and `Done` terminal.
/// The result is recorded exactly once, at completion.
#[derive(Debug)]
pub struct PageJob {
    pub url: String,
    pub mode: ExtractMode,
    state: JobState,
    result: Option<ExtractionResult>,
}

impl PageJob {
    pub fn new(url: impl Into<String>, mode: ExtractMode) -> Self {
        Self {
            url: url.into(),
            mode,
            state: JobState::Pending,
            result: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }

    /// Attempt a forward transition. Disallowed moves (backward, re-entry,
    /// anything out of `Done`) return false and change nothing.
    ///
    /// `Done` is never reached this way; use [`PageJob::complete`].
    pub fn advance(&mut self, next: JobState) -> bool {
        let allowed = matches!(
            (self.state, next),
            (JobState::Pending, JobState::Loading)
                | (JobState::Loading, JobState::Settling)
                | (JobState::Loading, JobState::Extracting)
                | (JobState::Settling, JobState::Extracting)
        );
        if allowed {
            self.state = next;
        }
        allowed
    }

    /// Terminal transition: record the result and move to `Done`.
    ///
    /// The first completion wins; a second attempt returns false and
    /// leaves the recorded result untouched.
    pub fn complete(&mut self, result: ExtractionResult) -> bool {
        if self.state == JobState::Done {
            return false;
        }
        self.state = JobState::Done;
        self.result = Some(result);
        true
    }

    /// Take the recorded result. `None` until the job completes.
    pub fn take_result(&mut self) -> Option<ExtractionResult> {
        self.result.take()
    }
}
