//! Rendering engine abstraction.
//!
//! Defines the `RenderEngine` and `RenderPage` traits that decouple the
//! dispatcher from the browser (currently Chromium via chromiumoxide).

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can open rendering surfaces.
///
/// Implementations are not required to tolerate concurrent page driving;
/// the dispatcher guarantees a single caller at a time.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Open a fresh page, isolated from previous jobs.
    async fn new_page(&self) -> Result<Box<dyn RenderPage>>;
    /// Release the engine and any child processes.
    async fn shutdown(&self) -> Result<()>;
}

/// A single rendering surface, driven for exactly one job.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Begin navigation and resolve when the engine reports the load
    /// finished, with the engine's success flag. Resolves exactly once;
    /// engine-level errors count as a failed load rather than aborting
    /// the job.
    async fn load(&mut self, url: &str) -> bool;
    /// Plain text of the rendered DOM.
    async fn plain_text(&mut self) -> Result<String>;
    /// Serialized HTML of the rendered DOM.
    async fn html(&mut self) -> Result<String>;
    /// Current document title. Empty when unavailable.
    async fn title(&mut self) -> String;
    /// Current URL after any redirects. Empty when unavailable.
    async fn current_url(&mut self) -> String;
    /// Destroy the surface.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Engine stub used when Chromium is unavailable.
///
/// Page jobs complete with an advisory engine error; PDF extraction does
/// not need a browser and keeps working.
pub struct NoopEngine;

#[async_trait]
impl RenderEngine for NoopEngine {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        Err(anyhow::anyhow!("Chromium not available"))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
