//! Per-domain politeness delays.
//!
//! A soft lower bound on inter-request spacing per domain: the caller
//! is suspended until at least `min_delay` (plus jitter) has elapsed
//! since the last request to the same host. Must run immediately
//! before every navigation, including recursive descents and
//! back-navigation. There is no global concurrency cap to enforce -
//! the crawl is single-threaded by design.

use crate::normalize::domain_of;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Minimum spacing between requests to one domain.
    pub min_delay: Duration,
    /// Upper bound of the random jitter added on top of `min_delay`.
    pub jitter_max: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay: Duration::from_millis(500),
            jitter_max: Duration::from_millis(250),
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    last_request: HashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_request: HashMap::new(),
        }
    }

    /// Suspend the caller until the target domain may be contacted
    /// again, then record the request timestamp.
    pub fn throttle(&mut self, url: &str) {
        if !self.config.enabled {
            return;
        }

        let domain = domain_of(url);
        if let Some(last) = self.last_request.get(&domain) {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_delay {
                let jitter = if self.config.jitter_max.is_zero() {
                    Duration::ZERO
                } else {
                    let max_ms = self.config.jitter_max.as_millis() as u64;
                    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
                };
                let pause = (self.config.min_delay - elapsed) + jitter;
                debug!(%domain, ?pause, "throttling before navigation");
                std::thread::sleep(pause);
            }
        }
        self.last_request.insert(domain, Instant::now());
    }
}
