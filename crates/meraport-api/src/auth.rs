use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the two independent Dashboard deployments.
///
/// The literal values (`com`, `in`) are what the relay proxy expects in its
/// `region` field, so they double as the wire representation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Region {
    /// Global deployment (`api.meraki.com`).
    #[default]
    Com,
    /// India deployment (`api.meraki.in`).
    In,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Com => "com",
            Self::In => "in",
        }
    }

    /// Base URL of the v1 REST API for this deployment.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Com => "https://api.meraki.com/api/v1",
            Self::In => "https://api.meraki.in/api/v1",
        }
    }
}

/// An API key bound to the deployment it was issued for.
///
/// Source and destination of a migration are two separate accounts; the
/// key never leaves this struct except when a transport serializes a request.
#[derive(Debug, Clone)]
pub struct Account {
    pub api_key: SecretString,
    pub region: Region,
}

impl Account {
    pub fn new(api_key: impl Into<SecretString>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            region,
        }
    }
}
