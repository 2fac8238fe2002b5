use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_META_URL: &str = "https://mcsrlauncher.github.io/meta/";

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// HTTP access to the component catalog
#[derive(Debug, Clone)]
pub struct MetaFetcher {
    client: reqwest::Client,
    base: Url,
    max_retries: u32,
}

impl MetaFetcher {
    /// Create a fetcher rooted at `meta_url`; a missing trailing slash is added
    pub fn new(meta_url: &str) -> Result<Self> {
        // Create HTTP client with timeout to prevent hanging requests
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let normalized = if meta_url.ends_with('/') {
            meta_url.to_string()
        } else {
            format!("{}/", meta_url)
        };
        let base = Url::parse(&normalized).context(format!("Invalid meta URL: {}", meta_url))?;

        Ok(Self {
            client,
            base,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET a catalog document relative to the base URL, returning its body
    pub async fn fetch_text(&self, relative: &str) -> Result<String> {
        let url = self
            .base
            .join(relative)
            .context(format!("Invalid catalog path: {}", relative))?;

        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                log::info!(
                    "Retrying {} (attempt {}/{}) after {}ms...",
                    url,
                    attempt + 1,
                    self.max_retries,
                    backoff
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let error_msg = format!("HTTP {} from {}", status, url);
                        log::warn!("{}", error_msg);
                        last_error = Some(anyhow::anyhow!(error_msg));
                        // Missing documents will not appear on retry
                        if status.is_client_error() {
                            break;
                        }
                        continue;
                    }

                    match response.text().await {
                        Ok(body) => return Ok(body),
                        Err(e) => {
                            let error_msg = format!("Failed to read body of {}: {}", url, e);
                            log::warn!("{}", error_msg);
                            last_error = Some(anyhow::anyhow!(error_msg));
                        }
                    }
                }
                Err(e) => {
                    let error_msg = format!("Failed to GET {}: {}", url, e);
                    log::warn!("{}", error_msg);
                    last_error = Some(anyhow::anyhow!(error_msg));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("Failed to fetch {} after {} retries", url, self.max_retries)
        }))
    }
}
