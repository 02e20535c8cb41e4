// ── Dashboard session ──
//
// One account bound to the shared gateway plus a cancellation token. The
// engines only ever talk to the vendor through this type, so every call
// lands in the same admission queue.

use meraport_api::{Account, ApiRequest, Gateway, Reply};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Device, Network, Organization};

/// A cheaply cloneable handle on one Dashboard account.
#[derive(Debug, Clone)]
pub struct Dashboard {
    gateway: Gateway,
    account: Account,
    cancel: CancellationToken,
}

impl Dashboard {
    pub fn new(gateway: Gateway, account: Account) -> Self {
        Self {
            gateway,
            account,
            cancel: CancellationToken::new(),
        }
    }

    /// Share `cancel` with other handles so one abort stops them all.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Raw calls ────────────────────────────────────────────────────

    pub async fn call(&self, request: &ApiRequest) -> Result<Reply, CoreError> {
        Ok(self
            .gateway
            .call(&self.account, request, &self.cancel)
            .await?)
    }

    /// `GET` a document. `None` means 404, 204 or a `null` body.
    pub async fn get(&self, endpoint: &str) -> Result<Option<Value>, CoreError> {
        Ok(self.call(&ApiRequest::get(endpoint)).await?.into_json())
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Option<Value>, CoreError> {
        Ok(self.call(&ApiRequest::put(endpoint, body)).await?.into_json())
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Option<Value>, CoreError> {
        Ok(self.call(&ApiRequest::post(endpoint, body)).await?.into_json())
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>, CoreError> {
        match self.get(endpoint).await? {
            Some(value @ Value::Array(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => {
                warn!(endpoint, kind = json_kind(&other), "expected a list");
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    // ── Organizations ────────────────────────────────────────────────

    pub async fn organizations(&self) -> Result<Vec<Organization>, CoreError> {
        self.get_list("/organizations").await
    }

    pub async fn organization(&self, org_id: &str) -> Result<Organization, CoreError> {
        match self.get(&format!("/organizations/{org_id}")).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(CoreError::NotFound {
                entity_type: "Organization".into(),
                identifier: org_id.into(),
            }),
        }
    }

    // ── Networks ─────────────────────────────────────────────────────

    pub async fn networks(&self, org_id: &str) -> Result<Vec<Network>, CoreError> {
        self.get_list(&format!("/organizations/{org_id}/networks"))
            .await
    }

    pub async fn network(&self, network_id: &str) -> Result<Option<Network>, CoreError> {
        match self.get(&format!("/networks/{network_id}")).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Organization inventory enriched with live status. A failed status
    /// lookup leaves every device at `"unknown"`.
    pub async fn devices(&self, org_id: &str) -> Result<Vec<Device>, CoreError> {
        let devices_path = format!("/organizations/{org_id}/devices?perPage=1000");
        let statuses_path = format!("/organizations/{org_id}/devices/statuses?perPage=1000");
        let (devices, statuses) = tokio::join!(
            self.get_list::<Device>(&devices_path),
            self.get(&statuses_path),
        );
        let mut devices = devices?;

        let statuses = match statuses {
            Ok(Some(Value::Array(list))) => list,
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!(error = %e, "device status lookup failed");
                Vec::new()
            }
        };

        for device in &mut devices {
            let status = statuses
                .iter()
                .find(|s| s.get("serial").and_then(Value::as_str) == Some(device.serial.as_str()))
                .and_then(|s| s.get("status"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            device.status = Some(status.to_owned());
        }
        Ok(devices)
    }

    pub async fn network_devices(&self, network_id: &str) -> Result<Vec<Device>, CoreError> {
        self.get_list(&format!("/networks/{network_id}/devices"))
            .await
    }

    pub async fn device(&self, serial: &str) -> Result<Option<Device>, CoreError> {
        match self.get(&format!("/devices/{serial}")).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn update_device(&self, serial: &str, body: Value) -> Result<(), CoreError> {
        self.put(&format!("/devices/{serial}"), body).await?;
        Ok(())
    }

    // ── Ownership ────────────────────────────────────────────────────

    pub async fn remove_device(&self, network_id: &str, serial: &str) -> Result<(), CoreError> {
        self.post(
            &format!("/networks/{network_id}/devices/remove"),
            json!({ "serial": serial }),
        )
        .await?;
        Ok(())
    }

    pub async fn release_from_inventory(
        &self,
        org_id: &str,
        serials: &[String],
    ) -> Result<(), CoreError> {
        self.post(
            &format!("/organizations/{org_id}/inventory/release"),
            json!({ "serials": serials }),
        )
        .await?;
        Ok(())
    }

    pub async fn claim_into_inventory(
        &self,
        org_id: &str,
        serials: &[String],
    ) -> Result<(), CoreError> {
        self.post(
            &format!("/organizations/{org_id}/inventory/claim"),
            json!({ "serials": serials }),
        )
        .await?;
        Ok(())
    }

    pub async fn claim_into_network(
        &self,
        network_id: &str,
        serials: &[String],
    ) -> Result<(), CoreError> {
        self.post(
            &format!("/networks/{network_id}/devices/claim"),
            json!({ "serials": serials }),
        )
        .await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
