//! HTTP prefetching of upcoming tracks

use ondu_core::AudioPrefetcher;
use reqwest::Url;

/// Issues a background GET so the next file is warm in any HTTP cache
/// between here and the backend
#[derive(Debug, Clone, Default)]
pub struct HttpPrefetcher {
    client: reqwest::Client,
    /// Origin for relative track URLs
    base_url: Option<Url>,
}

impl HttpPrefetcher {
    pub fn new(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    fn resolve(&self, url: &str) -> Option<Url> {
        match &self.base_url {
            Some(base) => base.join(url).ok(),
            None => Url::parse(url).ok(),
        }
    }
}

impl AudioPrefetcher for HttpPrefetcher {
    fn prefetch(&self, url: &str) {
        let Some(target) = self.resolve(url) else {
            tracing::debug!(url, "Unresolvable prefetch URL");
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(url, "No runtime available, prefetch skipped");
            return;
        };

        let client = self.client.clone();
        handle.spawn(async move {
            match client.get(target.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    // Drain the body so the response is fully transferred
                    let _ = resp.bytes().await;
                    tracing::trace!(url = %target, status = %status, "Prefetch complete");
                }
                Err(e) => {
                    tracing::debug!(url = %target, error = %e, "Prefetch failed");
                }
            }
        });
    }
}
