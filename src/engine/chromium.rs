//! Chromium-backed engine using chromiumoxide.

use super::{RenderEngine, RenderPage};
use crate::config::ExtractorConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. QUARRY_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("QUARRY_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common install locations
    let mut candidates: Vec<PathBuf> = Vec::new();
    if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
        candidates.push(PathBuf::from(
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ));
    } else {
        candidates.push(PathBuf::from("/usr/bin/chromium"));
        candidates.push(PathBuf::from("/usr/lib/chromium/chromium"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".quarry/chromium/chrome"));
    }
    candidates.into_iter().find(|c| c.exists())
}

/// Chromium-backed [`RenderEngine`].
pub struct ChromiumEngine {
    browser: Mutex<Browser>,
}

impl ChromiumEngine {
    /// Launch a headless Chromium configured from `cfg`.
    ///
    /// Images and plugins are disabled; JavaScript stays on. Cookies are
    /// ephemeral unless `cfg.persist_cookies` names a storage directory.
    pub async fn launch(cfg: &ExtractorConfig) -> Result<Self> {
        let chrome_path = find_chromium().context(
            "Chromium not found. Install google-chrome or chromium, or set QUARRY_CHROMIUM_PATH",
        )?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-plugins")
            .arg("--blink-settings=imagesEnabled=false");

        if let Some(ua) = &cfg.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        if cfg.persist_cookies {
            if let Some(dir) = &cfg.storage_dir {
                builder = builder.user_data_dir(dir);
            }
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drain CDP events until the browser goes away.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
        })
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to open a page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close browser")?;
        let _ = browser.wait().await;
        Ok(())
    }
}

/// A single Chromium tab driven for one job.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn load(&mut self, url: &str) -> bool {
        match self.page.goto(url).await {
            Ok(_) => {
                // goto resolves on the navigation response; wait for the
                // load event so the settle delay starts from the same point
                // the page's own scripts do.
                let _ = self.page.wait_for_navigation().await;
                true
            }
            Err(e) => {
                debug!("page load reported failure: {e}");
                false
            }
        }
    }

    async fn plain_text(&mut self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .context("text extraction failed")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert text result: {e:?}"))
    }

    async fn html(&mut self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("HTML serialization failed")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))
    }

    async fn title(&mut self) -> String {
        match self.page.evaluate("document.title").await {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    async fn current_url(&mut self) -> String {
        self.page
            .url()
            .await
            .unwrap_or_default()
            .map(|u| u.to_string())
            .unwrap_or_default()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
