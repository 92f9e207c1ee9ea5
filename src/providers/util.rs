use anyhow::{Context, Error, Result};
use reqwest::{Client, Response};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::config::ProvidersConfig;

/// Client settings shared by every HTTP-backed provider.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 0,
            retry_delay_ms: 0,
        }
    }
}

impl From<&ProvidersConfig> for HttpSettings {
    fn from(config: &ProvidersConfig) -> Self {
        Self {
            timeout: config.timeout(),
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

impl HttpSettings {
    pub fn client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(concat!("travel-budget/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")
    }

    /// GET `url`, retrying transport failures per these settings.
    pub async fn get(&self, client: &Client, url: &str) -> Result<Response> {
        debug!("Requesting {}", url);
        with_retry(
            || async { client.get(url).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Request failed: {url}"))
    }
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
