//! Remote favicon lookup through a fixed chain of icon services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, trace};

use crate::error::{LdError, Result};

/// Sent with every favicon request; some services refuse unknown agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Largest icon body accepted from a remote source.
pub const MAX_ICON_BYTES: usize = 1024 * 1024;

/// True for an absolute `http` or `https` URL.
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Lowercased host of a URL, if it has one.
pub fn url_domain(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Icon services to try for `domain`, in order.
pub fn favicon_sources(domain: &str) -> Vec<String> {
    let mut sources = Vec::with_capacity(4);
    if let Ok(u) = Url::parse_with_params(
        "https://www.google.com/s2/favicons",
        &[("sz", "128"), ("domain", domain)],
    ) {
        sources.push(u.to_string());
    }
    if let Ok(u) = Url::parse_with_params(
        "https://www.google.com/s2/favicons",
        &[("sz", "128"), ("domain_url", &format!("https://{domain}"))],
    ) {
        sources.push(u.to_string());
    }
    sources.push(format!("https://icons.duckduckgo.com/ip3/{domain}.ico"));
    sources.push(format!("https://logo.clearbit.com/{domain}"));
    sources
}

/// Fetches raw image bytes from a URL.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`IconFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LdError::Other(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl IconFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        trace!(url, "Fetching icon");
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LdError::Other(format!("{url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            debug!(url, %status, "Icon source refused");
            return Err(LdError::Other(format!("{url}: HTTP {status}")));
        }
        if let Some(declared) = resp.content_length() {
            check_size(url, usize::try_from(declared).unwrap_or(usize::MAX))?;
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| LdError::Other(format!("{url}: {e}")))?
        {
            check_size(url, body.len().saturating_add(chunk.len()))?;
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn check_size(url: &str, len: usize) -> Result<()> {
    if len > MAX_ICON_BYTES {
        debug!(url, len, "Icon body too large");
        return Err(LdError::Other(format!(
            "{url}: icon larger than {MAX_ICON_BYTES} bytes"
        )));
    }
    Ok(())
}
