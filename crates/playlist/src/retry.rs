//! Media error retry policy and cache busting

use std::time::Duration;

use ondu_config::PlaylistConfig;
use reqwest::Url;

/// Origin used to resolve relative URLs; never contacted
const RELATIVE_BASE: &str = "http://ondu.invalid/";

/// Outcome of a media error on the active track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reload after `delay`; `attempt` is 1-based
    Retry { attempt: u32, delay: Duration },
    /// Retries exhausted, move on
    Skip,
}

/// Linear backoff, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub step: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    /// Delay before the retry that follows `consumed` earlier retries
    pub fn delay(&self, consumed: u32) -> Duration {
        (self.base + self.step * consumed).min(self.max)
    }

    pub fn decide(&self, consumed: u32) -> RetryDecision {
        if consumed < self.max_retries {
            RetryDecision::Retry {
                attempt: consumed + 1,
                delay: self.delay(consumed),
            }
        } else {
            RetryDecision::Skip
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PlaylistConfig::default())
    }
}

impl From<&PlaylistConfig> for RetryPolicy {
    fn from(config: &PlaylistConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.retry_base_ms),
            step: Duration::from_millis(config.retry_step_ms),
            max: Duration::from_millis(config.retry_max_ms),
        }
    }
}

/// `url` with `param` set to `stamp`, replacing any earlier value
///
/// Relative URLs stay relative.
pub fn cache_busted_url(url: &str, param: &str, stamp: i64) -> String {
    let stamp = stamp.to_string();

    if let Ok(mut parsed) = Url::parse(url) {
        set_query_param(&mut parsed, param, &stamp);
        return parsed.into();
    }

    let joined = Url::parse(RELATIVE_BASE).and_then(|base| base.join(url));
    let Ok(mut joined) = joined else {
        return url.to_string();
    };
    set_query_param(&mut joined, param, &stamp);

    let mut out = joined.path().to_string();
    if let Some(query) = joined.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = joined.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    if !url.starts_with('/') && out.starts_with('/') {
        out.remove(0);
    }
    out
}

fn set_query_param(url: &mut Url, param: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..10).map(|n| policy.delay(n).as_millis()).collect();
        assert_eq!(
            delays,
            vec![500, 800, 1100, 1400, 1700, 2000, 2300, 2600, 2900, 3000]
        );
    }

    #[test]
    fn test_decide_skips_after_max() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(0),
            RetryDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(500)
            }
        );
        assert!(matches!(policy.decide(9), RetryDecision::Retry { attempt: 10, .. }));
        assert_eq!(policy.decide(10), RetryDecision::Skip);
    }

    #[test]
    fn test_cache_bust_absolute_replaces_param() {
        assert_eq!(
            cache_busted_url("http://localhost:8080/static/p1.wav?_=1&v=2", "_", 99),
            "http://localhost:8080/static/p1.wav?v=2&_=99"
        );
    }

    #[test]
    fn test_cache_bust_relative_stays_relative() {
        assert_eq!(
            cache_busted_url("/static/p1.wav", "_", 1700000000000),
            "/static/p1.wav?_=1700000000000"
        );
        assert_eq!(cache_busted_url("p1.wav", "_", 5), "p1.wav?_=5");
    }
}
