//! Out-of-band response-header probe.
//!
//! The browser surface cannot expose response headers, so the header
//! analyzer gets them from one plain GET per page. A failed probe
//! yields `None` and the header checks simply do not run for that
//! page.

use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HeaderProbe {
    client: reqwest::blocking::Client,
}

impl HeaderProbe {
    pub fn new(timeout: Duration) -> Option<Self> {
        match reqwest::blocking::Client::builder()
            .user_agent(concat!("Gossamer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
        {
            Ok(client) => Some(Self { client }),
            Err(e) => {
                warn!(error = %e, "failed to build header probe client, header checks disabled");
                None
            }
        }
    }

    /// Fetch response headers for a URL, keys lowercased.
    pub fn fetch(&self, url: &str) -> Option<HashMap<String, String>> {
        match self.client.get(url).send() {
            Ok(response) => {
                let headers = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_lowercase(),
                            value.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                Some(headers)
            }
            Err(e) => {
                debug!(%url, error = %e, "header probe failed");
                None
            }
        }
    }
}
