//! PDF detection and text extraction.
//!
//! PDFs bypass the rendering engine entirely: the bytes are fetched (or
//! read from disk), parsed with lopdf, and the per-page text joined with
//! blank lines.

use crate::config::ExtractorConfig;
use crate::job::ExtractionResult;
use lopdf::Document;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout for the HEAD content-type probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fast-path check: does the source's path component end in `.pdf`?
///
/// Query string and fragment are ignored, as is a trailing slash;
/// non-URL inputs are checked on the raw string.
pub fn has_pdf_suffix(source: &str) -> bool {
    let path = match Url::parse(source) {
        Ok(u) => u.path().trim_end_matches('/').to_ascii_lowercase(),
        Err(_) => {
            let raw = source.split(['?', '#']).next().unwrap_or(source);
            raw.trim_end_matches('/').to_ascii_lowercase()
        }
    };
    path.ends_with(".pdf")
}

/// Full detection: the suffix fast path, then a HEAD Content-Type probe
/// for http(s) URLs. Probe failures mean "not a PDF".
pub async fn detect(source: &str, cfg: &ExtractorConfig) -> bool {
    if has_pdf_suffix(source) {
        return true;
    }
    let parsed = match Url::parse(source) {
        Ok(u) => u,
        Err(_) => return false,
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let client = match client_for(cfg, PROBE_TIMEOUT) {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.head(source).send().await {
        Ok(resp) => resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
            .unwrap_or(false),
        Err(e) => {
            debug!("HEAD probe failed for {source}: {e}");
            false
        }
    }
}

/// Extract text from a PDF at an http(s) URL, a `file://` URL, or a
/// local path.
///
/// Never fails outright: fetch, parse, and page errors all come back as
/// the advisory error on the result, with empty text.
pub async fn extract(source: &str, cfg: &ExtractorConfig) -> ExtractionResult {
    let mut result = ExtractionResult::new(source);
    result.title = base_name(source);

    let bytes = match fetch(source, cfg).await {
        Ok(b) => b,
        Err(e) => {
            result.error = Some(format!("Failed to load PDF: {e}"));
            return result;
        }
    };

    let doc = match Document::load_mem(&bytes) {
        Ok(d) => d,
        Err(e) => {
            result.error = Some(format!("Failed to load PDF: {e}"));
            return result;
        }
    };

    let mut parts: Vec<String> = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => parts.push(text.trim_end().to_string()),
            Err(e) => {
                result.error = Some(format!("Failed to extract PDF text: {e}"));
                return result;
            }
        }
    }
    result.text = parts.join("\n\n");
    result
}

/// Fetch the raw PDF bytes from wherever `source` points.
async fn fetch(source: &str, cfg: &ExtractorConfig) -> anyhow::Result<Vec<u8>> {
    match Url::parse(source) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {
            let client = client_for(cfg, cfg.timeout)?;
            let resp = client.get(source).send().await?.error_for_status()?;
            Ok(resp.bytes().await?.to_vec())
        }
        Ok(u) if u.scheme() == "file" => {
            let path = u
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("invalid file URL: {source}"))?;
            Ok(tokio::fs::read(path).await?)
        }
        _ => Ok(tokio::fs::read(source).await?),
    }
}

fn client_for(cfg: &ExtractorConfig, timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(ua) = &cfg.user_agent {
        builder = builder.user_agent(ua);
    }
    builder.build()
}

/// Base filename of a URL path or filesystem path, used as the PDF title.
fn base_name(source: &str) -> String {
    let path = match Url::parse(source) {
        Ok(u) => u.path().to_string(),
        Err(_) => source.to_string(),
    };
    Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
