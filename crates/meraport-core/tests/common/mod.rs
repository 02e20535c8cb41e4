// Shared fixtures for engine tests: an in-process Dashboard that answers by
// method and endpoint and records every call it sees.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{Value, json};

use meraport_api::{
    Account, ApiRequest, Error, Gateway, GatewayConfig, Method, RawResponse, Region, Transport,
};
use meraport_core::{Dashboard, LineKind, MemorySink, RunLog};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Unrouted `GET`s answer 404; unrouted writes answer `200 {}`.
#[derive(Default)]
pub struct FakeDashboard {
    routes: Mutex<HashMap<(Method, String), RawResponse>>,
    calls: Mutex<Vec<Recorded>>,
}

impl FakeDashboard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, endpoint: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, endpoint.to_owned()), RawResponse::json(status, &body));
    }

    pub fn get(&self, endpoint: &str, body: Value) {
        self.on(Method::Get, endpoint, 200, body);
    }

    /// Answer with a vendor error body.
    pub fn fail(&self, method: Method, endpoint: &str, status: u16, message: &str) {
        self.on(method, endpoint, status, json!({ "errors": [message] }));
    }

    pub fn clear(&self, method: Method, endpoint: &str) {
        self.routes
            .lock()
            .unwrap()
            .remove(&(method, endpoint.to_owned()));
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, endpoint: &str) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.endpoint == endpoint)
            .collect()
    }

    pub fn writes(&self) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != Method::Get)
            .collect()
    }
}

impl Transport for FakeDashboard {
    fn send<'a>(
        &'a self,
        _account: &'a Account,
        request: &'a ApiRequest,
    ) -> BoxFuture<'a, Result<RawResponse, Error>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(Recorded {
                method: request.method,
                endpoint: request.endpoint.clone(),
                body: request.body.clone(),
            });
            let routed = self
                .routes
                .lock()
                .unwrap()
                .get(&(request.method, request.endpoint.clone()))
                .cloned();
            Ok(routed.unwrap_or_else(|| match request.method {
                Method::Get => RawResponse::json(404, &json!({ "errors": ["Not found"] })),
                _ => RawResponse::json(200, &json!({})),
            }))
        })
    }
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        rate_limit_jitter: Duration::ZERO,
        server_error_jitter: Duration::ZERO,
        ..GatewayConfig::default()
    }
}

pub fn dashboard(fake: &Arc<FakeDashboard>) -> Dashboard {
    let gateway = Gateway::new(fake.clone(), gateway_config());
    Dashboard::new(gateway, Account::new("test-key".to_string(), Region::Com))
}

pub fn memory_log() -> (Arc<MemorySink>, RunLog) {
    let sink = Arc::new(MemorySink::new());
    let log = RunLog::new(sink.clone());
    (sink, log)
}

pub fn lines_of(sink: &MemorySink, kind: LineKind) -> Vec<String> {
    sink.lines()
        .into_iter()
        .filter(|l| l.kind == kind)
        .map(|l| l.message)
        .collect()
}
