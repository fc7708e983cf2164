//! Scripted in-memory engine for dispatcher and server tests.
#![allow(dead_code)]

use async_trait::async_trait;
use quarry::engine::{RenderEngine, RenderPage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observable engine calls, recorded in order across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    NewPage,
    Load(String),
    Text(String),
    Html(String),
    Close(String),
    Shutdown,
}

/// Behavior script for one page.
#[derive(Clone)]
pub struct PageScript {
    /// Time before the load signal fires. `None` means it never fires.
    pub load_delay: Option<Duration>,
    /// Success flag the load resolves with.
    pub load_ok: bool,
    pub title: &'static str,
    pub text: &'static str,
    pub html: &'static str,
    /// Text extraction hangs forever (wedged-dispatcher case).
    pub hang_extract: bool,
    /// Text and HTML extraction fail.
    pub fail_extract: bool,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            load_delay: Some(Duration::from_millis(100)),
            load_ok: true,
            title: "A Page",
            text: "body text",
            html: "<html><body>body text</body></html>",
            hang_extract: false,
            fail_extract: false,
        }
    }
}

/// Engine whose pages follow pre-loaded scripts, consumed in order.
/// Extra pages beyond the scripts get the default behavior.
pub struct MockEngine {
    scripts: Mutex<Vec<PageScript>>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl MockEngine {
    pub fn new(scripts: Vec<PageScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn single(script: PageScript) -> Self {
        Self::new(vec![script])
    }

    /// Shared handle to the call log, usable after the engine moves into
    /// the dispatcher.
    pub fn call_log(&self) -> Arc<Mutex<Vec<EngineCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn new_page(&self) -> anyhow::Result<Box<dyn RenderPage>> {
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                PageScript::default()
            } else {
                scripts.remove(0)
            }
        };
        self.calls.lock().unwrap().push(EngineCall::NewPage);
        Ok(Box::new(MockPage {
            script,
            url: String::new(),
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(EngineCall::Shutdown);
        Ok(())
    }
}

pub struct MockPage {
    script: PageScript,
    url: String,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

#[async_trait]
impl RenderPage for MockPage {
    async fn load(&mut self, url: &str) -> bool {
        self.url = url.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(EngineCall::Load(url.to_string()));
        match self.script.load_delay {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                self.script.load_ok
            }
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn plain_text(&mut self) -> anyhow::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(EngineCall::Text(self.url.clone()));
        if self.script.hang_extract {
            std::future::pending::<()>().await;
        }
        if self.script.fail_extract {
            anyhow::bail!("renderer exploded");
        }
        Ok(self.script.text.to_string())
    }

    async fn html(&mut self) -> anyhow::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(EngineCall::Html(self.url.clone()));
        if self.script.fail_extract {
            anyhow::bail!("renderer exploded");
        }
        Ok(self.script.html.to_string())
    }

    async fn title(&mut self) -> String {
        self.script.title.to_string()
    }

    async fn current_url(&mut self) -> String {
        self.url.clone()
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(EngineCall::Close(self.url.clone()));
        Ok(())
    }
}
