//! HTTP client wrapper with rate limiting and bearer credentials

use crate::error::{Error, Result};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Rate limiter shared by every request of one client
pub type RegistryRateLimiter = Arc<
    RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
>;

/// HTTP client for registry requests
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: Option<RegistryRateLimiter>,
}

impl HttpClient {
    /// Create a client.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-request timeout
    /// * `requests_per_second` - Optional client-side request budget
    /// * `bearer` - Optional token sent as `Authorization: Bearer ...` on every request
    pub fn new(
        timeout: Duration,
        requests_per_second: Option<u32>,
        bearer: Option<&str>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = bearer {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::other("credential contains invalid header characters"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(format!("refprune/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let rate_limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Wait for rate limiter if enabled
    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    /// Make a GET request and deserialize the JSON response.
    ///
    /// Returns `Ok(None)` on 404 so callers can name what was missing.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        self.wait_for_rate_limit().await;

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::RateLimitExceeded(url.to_string()))
            }
            status if !status.is_success() => {
                return Err(Error::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            _ => {}
        }

        // Read as bytes first so malformed payloads surface as Error::Json
        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
