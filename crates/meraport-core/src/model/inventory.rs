// ── Inventory domain types ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Product family a network can host. Gates which network-level
/// configuration families exist for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum ProductType {
    Appliance,
    Switch,
    Wireless,
    Camera,
    Sensor,
    CellularGateway,
    SystemsManager,
}

/// Hardware family derived from a device model prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModelFamily {
    /// `MS*`
    Switch,
    /// `MR*`
    Wireless,
    /// `MX*` and `Z*` teleworker gateways
    Appliance,
}

impl ModelFamily {
    pub fn from_model(model: &str) -> Option<Self> {
        if model.starts_with("MS") {
            Some(Self::Switch)
        } else if model.starts_with("MR") {
            Some(Self::Wireless)
        } else if model.starts_with("MX") || model.starts_with('Z') {
            Some(Self::Appliance)
        } else {
            None
        }
    }
}

// ── Organization ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    /// Whether Dashboard API access is switched on for this organization.
    /// Organizations that do not report it are assumed enabled.
    pub fn api_enabled(&self) -> bool {
        self.extra
            .get("api")
            .and_then(|api| api.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

// ── Network ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub name: String,
    /// Raw product type strings; unknown values are kept but never gate anything.
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Network {
    /// Recognized product types of this network.
    pub fn products(&self) -> Vec<ProductType> {
        self.product_types
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }

    pub fn has_product(&self, product: ProductType) -> bool {
        self.products().contains(&product)
    }
}

/// Every product type, used when a network's own record is unavailable.
pub fn all_products() -> Vec<ProductType> {
    ProductType::iter().collect()
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable identity across organizations.
    pub serial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn family(&self) -> Option<ModelFamily> {
        ModelFamily::from_model(&self.model)
    }

    /// Name for display and folder naming; unnamed devices fall back to the serial.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.serial)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn model_prefix_gates_family() {
        assert_eq!(ModelFamily::from_model("MS120-8LP"), Some(ModelFamily::Switch));
        assert_eq!(ModelFamily::from_model("MR46"), Some(ModelFamily::Wireless));
        assert_eq!(ModelFamily::from_model("MX68W"), Some(ModelFamily::Appliance));
        assert_eq!(ModelFamily::from_model("Z3"), Some(ModelFamily::Appliance));
        assert_eq!(ModelFamily::from_model("MV12"), None);
        assert_eq!(ModelFamily::from_model(""), None);
    }

    #[test]
    fn network_keeps_unknown_fields_and_products() {
        let raw = json!({
            "id": "N_1",
            "organizationId": "O1",
            "name": "Branch",
            "productTypes": ["appliance", "wireless", "cellularGateway", "futureThing"],
            "timeZone": "Europe/Berlin",
            "tags": [],
            "enrollmentString": null,
            "isBoundToConfigTemplate": false
        });
        let net: Network = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            net.products(),
            vec![ProductType::Appliance, ProductType::Wireless, ProductType::CellularGateway]
        );
        assert!(!net.has_product(ProductType::Switch));
        assert_eq!(serde_json::to_value(&net).unwrap(), raw);
    }

    #[test]
    fn device_without_name_uses_serial() {
        let dev: Device =
            serde_json::from_value(json!({"serial": "Q2XX-AAAA-BBBB", "model": "MS225"})).unwrap();
        assert_eq!(dev.display_name(), "Q2XX-AAAA-BBBB");
        assert_eq!(dev.family(), Some(ModelFamily::Switch));
        assert!(dev.tags.is_empty());
    }

    #[test]
    fn organization_api_flag() {
        let org: Organization = serde_json::from_value(
            json!({"id": "1", "name": "Acme", "api": {"enabled": false}}),
        )
        .unwrap();
        assert!(!org.api_enabled());
    }
}
