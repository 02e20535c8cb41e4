// Wire-level access to the Dashboard API.
//
// A `Transport` performs exactly one HTTP exchange and reports the raw
// outcome. Status interpretation, retries and admission control all live in
// the gateway, so transports stay dumb and easy to fake in tests.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, HeaderValue, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::Account;
use crate::error::Error;
use crate::gateway::ApiRequest;

// ── Raw response ────────────────────────────────────────────────────

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Parsed `Retry-After` header (whole seconds), if present and numeric.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    async fn from_reqwest(resp: reqwest::Response) -> Result<Self, Error> {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = resp.text().await?;
        trace!(status, len = body.len(), "response received");
        Ok(Self {
            status,
            retry_after,
            body,
        })
    }
}

/// `Retry-After` is only honored in its delta-seconds form.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// ── Transport trait ─────────────────────────────────────────────────

/// A single HTTP exchange against the Dashboard API on behalf of `account`.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        account: &'a Account,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<RawResponse, Error>>;
}

// ── Shared client config ────────────────────────────────────────────

/// Shared configuration for building the underlying `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("meraport/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(Error::Transport)
    }
}

// ── Relay proxy ─────────────────────────────────────────────────────

/// Envelope understood by the relay proxy. Every vendor call becomes a
/// `POST` of this body; the proxy replays it against the right region and
/// passes status, `Retry-After` and body back unchanged.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEnvelope<'a> {
    api_key: &'a str,
    region: &'a str,
    endpoint: &'a str,
    method: &'a str,
    body: Option<&'a Value>,
}

/// Sends every call through a JSON relay endpoint.
pub struct ProxyTransport {
    http: reqwest::Client,
    url: Url,
}

impl ProxyTransport {
    pub fn new(proxy_url: &str, config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            url: Url::parse(proxy_url)?,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(proxy_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            url: Url::parse(proxy_url)?,
        })
    }

    async fn exchange(&self, account: &Account, request: &ApiRequest) -> Result<RawResponse, Error> {
        let envelope = ProxyEnvelope {
            api_key: account.api_key.expose_secret(),
            region: account.region.as_str(),
            endpoint: &request.endpoint,
            method: request.method.as_str(),
            body: request.body.as_ref(),
        };
        debug!("{} {} via {}", request.method, request.endpoint, self.url);

        let resp = self
            .http
            .post(self.url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::ProxyUnavailable {
                        url: self.url.to_string(),
                    }
                } else {
                    Error::Transport(e)
                }
            })?;
        RawResponse::from_reqwest(resp).await
    }
}

impl Transport for ProxyTransport {
    fn send<'a>(
        &'a self,
        account: &'a Account,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<RawResponse, Error>> {
        Box::pin(self.exchange(account, request))
    }
}

// ── Direct ──────────────────────────────────────────────────────────

/// Calls the regional Dashboard API directly with bearer authentication.
pub struct DirectTransport {
    http: reqwest::Client,
    base_override: Option<String>,
}

impl DirectTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_override: None,
        })
    }

    /// Point every region at one base URL (mock servers, staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_override = Some(base_url.into());
        self
    }

    fn url(&self, account: &Account, endpoint: &str) -> Result<Url, Error> {
        let base = self
            .base_override
            .as_deref()
            .unwrap_or_else(|| account.region.base_url())
            .trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{endpoint}"))?)
    }

    async fn exchange(&self, account: &Account, request: &ApiRequest) -> Result<RawResponse, Error> {
        let url = self.url(account, &request.endpoint)?;
        debug!("{} {url}", request.method);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", account.api_key.expose_secret()))
            .map_err(|e| Error::InvalidApiKey(e.to_string()))?;
        bearer.set_sensitive(true);

        let mut builder = self
            .http
            .request(request.method.to_reqwest(), url)
            .header(AUTHORIZATION, bearer);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        RawResponse::from_reqwest(resp).await
    }
}

impl Transport for DirectTransport {
    fn send<'a>(
        &'a self,
        account: &'a Account,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<RawResponse, Error>> {
        Box::pin(self.exchange(account, request))
    }
}
