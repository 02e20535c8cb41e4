//! The single choke point for every Dashboard call.
//!
//! A [`Gateway`] owns one fair semaphore shared by every clone, so the
//! concurrency ceiling holds process-wide no matter how many engines fan out
//! through it. Waiters are admitted in arrival order. Each admitted call keeps
//! its slot until it finishes, including any retry sleeps.
//!
//! Status handling:
//!
//! | Status | Outcome |
//! |---|---|
//! | 2xx | [`Reply::Json`] (204 gives [`Reply::NoContent`]) |
//! | 404 | [`Reply::NotFound`], never retried |
//! | 429 | sleep `Retry-After` (default 2 s) plus up to 500 ms jitter, retry |
//! | 5xx | sleep `2 s * 2^attempt` plus up to 1 s jitter, retry |
//! | other | [`Error::Api`] with the vendor's joined `errors` |

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use strum::Display;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::Account;
use crate::error::Error;
use crate::transport::{RawResponse, Transport};

// ── Request ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A vendor call: method, endpoint path relative to `/api/v1`, optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            body: Some(body),
        }
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            endpoint: endpoint.into(),
            body: Some(body),
        }
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            endpoint: endpoint.into(),
            body: None,
        }
    }
}

// ── Reply ───────────────────────────────────────────────────────────

/// Successful outcome of a gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 2xx with a body (an empty body decodes as `Null`).
    Json(Value),
    /// 204: the call succeeded and there is nothing to read.
    NoContent,
    /// 404: the resource is not configured or not applicable.
    NotFound,
}

impl Reply {
    /// The decoded document, or `None` for 404 / 204 / `null`.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(Value::Null) | Self::NoContent | Self::NotFound => None,
            Self::Json(value) => Some(value),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Admission and retry tuning for a [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Simultaneous in-flight transport calls across the whole process.
    pub max_concurrent: usize,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First 5xx back-off; doubles per attempt.
    pub initial_backoff: Duration,
    /// Used when a 429 carries no usable `Retry-After`.
    pub default_retry_after: Duration,
    /// Upper bound of the random jitter added to 429 sleeps.
    pub rate_limit_jitter: Duration,
    /// Upper bound of the random jitter added to 5xx sleeps.
    pub server_error_jitter: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 9,
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            default_retry_after: Duration::from_secs(2),
            rate_limit_jitter: Duration::from_millis(500),
            server_error_jitter: Duration::from_millis(1000),
        }
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

/// Rate-limited funnel in front of a [`Transport`]. Cheap to clone; every
/// clone shares the same admission queue.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    config: Arc<GatewayConfig>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("available", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, config: GatewayConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            transport,
            permits,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Calls currently holding an admission slot.
    pub fn in_flight(&self) -> usize {
        self.config
            .max_concurrent
            .max(1)
            .saturating_sub(self.permits.available_permits())
    }

    /// Issue one call, waiting for an admission slot first.
    ///
    /// The token is checked on entry, while queued, before every attempt,
    /// and during retry sleeps. A request already on the wire is allowed to
    /// finish.
    pub async fn call(
        &self,
        account: &Account,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Reply, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|_| Error::Cancelled)?,
        };

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let raw = self.transport.send(account, request).await?;
            let status = raw.status;

            if (200..300).contains(&status) {
                return decode_success(raw);
            }
            if status == 404 {
                debug!(
                    endpoint = %request.endpoint,
                    "404 Not Found, treating as not configured"
                );
                return Ok(Reply::NotFound);
            }

            let backoff = match status {
                429 => Some(rate_limit_delay(raw.retry_after, &self.config)),
                s if s >= 500 => Some(server_error_delay(attempt, &self.config)),
                _ => None,
            };

            match backoff {
                Some(delay) if attempt < self.config.max_retries => {
                    warn!(
                        endpoint = %request.endpoint,
                        status,
                        attempt = attempt + 1,
                        max = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying Dashboard call"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                _ => return Err(api_error(&request.endpoint, &raw)),
            }
        }
    }
}

// ── Response interpretation ─────────────────────────────────────────

fn decode_success(raw: RawResponse) -> Result<Reply, Error> {
    if raw.status == 204 {
        return Ok(Reply::NoContent);
    }
    if raw.body.trim().is_empty() {
        return Ok(Reply::Json(Value::Null));
    }
    serde_json::from_str(&raw.body)
        .map(Reply::Json)
        .map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: raw.body,
        })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

fn api_error(endpoint: &str, raw: &RawResponse) -> Error {
    let message = serde_json::from_str::<ErrorBody>(&raw.body)
        .ok()
        .filter(|b| !b.errors.is_empty())
        .map_or_else(
            || format!("HTTP error! status: {}", raw.status),
            |b| b.errors.join(", "),
        );
    Error::Api {
        status: raw.status,
        endpoint: endpoint.to_owned(),
        message,
    }
}

// ── Back-off math ───────────────────────────────────────────────────

fn rate_limit_delay(retry_after: Option<Duration>, config: &GatewayConfig) -> Duration {
    retry_after.unwrap_or(config.default_retry_after) + jitter(config.rate_limit_jitter)
}

fn server_error_delay(attempt: u32, config: &GatewayConfig) -> Duration {
    config.initial_backoff.saturating_mul(2u32.saturating_pow(attempt))
        + jitter(config.server_error_jitter)
}

fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_config_matches_dashboard_limits() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_concurrent, 9);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_secs(2));
    }

    #[test]
    fn rate_limit_delay_honors_retry_after() {
        let config = GatewayConfig::default();
        for _ in 0..50 {
            let d = rate_limit_delay(Some(Duration::from_secs(5)), &config);
            assert!(d >= Duration::from_secs(5));
            assert!(d <= Duration::from_millis(5500));
        }
        let d = rate_limit_delay(None, &config);
        assert!(d >= Duration::from_secs(2) && d <= Duration::from_millis(2500));
    }

    #[test]
    fn server_error_delay_doubles() {
        let config = GatewayConfig {
            server_error_jitter: Duration::ZERO,
            ..GatewayConfig::default()
        };
        assert_eq!(server_error_delay(0, &config), Duration::from_secs(2));
        assert_eq!(server_error_delay(1, &config), Duration::from_secs(4));
        assert_eq!(server_error_delay(2, &config), Duration::from_secs(8));
    }

    #[test]
    fn api_error_joins_vendor_messages() {
        let raw = RawResponse::json(400, &json!({"errors": ["VLAN exists", "bad subnet"]}));
        let err = api_error("/networks/N1/appliance/vlans", &raw);
        assert_eq!(err.to_string(), "Meraki API Error: VLAN exists, bad subnet");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn api_error_without_body_reports_status() {
        let raw = RawResponse::new(403, "");
        let err = api_error("/organizations", &raw);
        assert_eq!(err.to_string(), "Meraki API Error: HTTP error! status: 403");
        assert!(err.is_auth());
    }

    #[test]
    fn null_and_missing_replies_have_no_document() {
        assert_eq!(Reply::Json(Value::Null).into_json(), None);
        assert_eq!(Reply::NotFound.into_json(), None);
        assert_eq!(Reply::NoContent.into_json(), None);
        assert_eq!(Reply::Json(json!([])).into_json(), Some(json!([])));
    }
}
