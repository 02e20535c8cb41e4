//! Declarative table of every Dashboard sub-resource the engines know about.
//!
//! Each [`Entry`] ties an archive file name to an endpoint path and a gate
//! (product type or model family). Entries that take part in snapshots also
//! carry a [`Slot`]: the snapshot key, how the value is restored, and
//! whether the selective backup captures it. Backup, parser and restore all
//! read this one table, so a file that is written is always a file that can
//! be read back and replayed.
//!
//! Paths are relative to the scope root:
//!
//! | Scope | Root | File name |
//! |---|---|---|
//! | organization | `/organizations/{id}` | `organization/{file}.json` |
//! | network | `/networks/{id}` | `networks/{slug}_{id}/{file}.json` |
//! | ssid | `/networks/{id}/wireless/ssids/{n}` | `networks/{slug}_{id}/wireless_ssid_{n}_{file}.json` |
//! | device | `/devices/{serial}` | `devices/{slug}_{serial}/{file}.json` |

use crate::model::{ModelFamily, ProductType};

/// Snapshot key of the network SSID list.
pub const SSIDS_KEY: &str = "ssids";

// ── Types ───────────────────────────────────────────────────────────

/// When an entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    Product(ProductType),
    Model(ModelFamily),
}

impl Gate {
    pub fn admits_network(self, products: &[ProductType]) -> bool {
        match self {
            Self::Always => true,
            Self::Product(p) => products.contains(&p),
            Self::Model(_) => false,
        }
    }

    pub fn admits_device(self, family: Option<ModelFamily>) -> bool {
        match self {
            Self::Always => true,
            Self::Model(m) => family == Some(m),
            Self::Product(_) => false,
        }
    }
}

/// Items that a creation-style restore leaves alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipItem {
    Nothing,
    /// VLAN 1 always exists on the destination.
    DefaultVlan,
    /// Items without a `name` cannot be matched or created.
    Unnamed,
}

/// How a captured slot is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Captured for reference only.
    Never,
    /// `PUT` the whole document to the same path.
    Replace,
    /// `POST` each list item to the same path with `strip` fields removed.
    /// Items whose `name` already exists on the destination are skipped.
    CreateEach {
        strip: &'static [&'static str],
        skip: SkipItem,
    },
    /// `PUT` each list item to `{path}/{item[id_field]}` without `id_field`.
    UpdateEach { id_field: &'static str },
    /// Matched to destination SSIDs by number.
    Ssids,
}

/// Snapshot participation of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Key in the snapshot's resource map.
    pub key: &'static str,
    /// Human label for restore logs.
    pub label: &'static str,
    pub restore: Restore,
    /// The snapshot holds this field of the response; restore wraps it back.
    pub field: Option<&'static str>,
    /// Part of the reduced selective-backup set.
    pub selective: bool,
}

impl Slot {
    const fn new(key: &'static str, label: &'static str, restore: Restore) -> Self {
        Self {
            key,
            label,
            restore,
            field: None,
            selective: false,
        }
    }

    const fn selective(mut self) -> Self {
        self.selective = true;
        self
    }

    const fn field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Archive file stem.
    pub file: &'static str,
    /// Endpoint path relative to the scope root.
    pub path: &'static str,
    pub gate: Gate,
    pub slot: Option<Slot>,
}

impl Entry {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.file)
    }

    /// File name of a per-SSID entry for SSID `number`.
    pub fn ssid_file_name(&self, number: u64) -> String {
        format!("wireless_ssid_{number}_{}.json", self.file)
    }

    pub fn slot_key(&self) -> Option<&'static str> {
        self.slot.map(|s| s.key)
    }

    fn is_selective(&self) -> bool {
        self.slot.is_some_and(|s| s.selective)
    }
}

const fn plain(file: &'static str, path: &'static str, gate: Gate) -> Entry {
    Entry {
        file,
        path,
        gate,
        slot: None,
    }
}

const fn slotted(file: &'static str, path: &'static str, gate: Gate, slot: Slot) -> Entry {
    Entry {
        file,
        path,
        gate,
        slot: Some(slot),
    }
}

const fn keep(key: &'static str, label: &'static str) -> Slot {
    Slot::new(key, label, Restore::Never)
}

const fn replace(key: &'static str, label: &'static str) -> Slot {
    Slot::new(key, label, Restore::Replace)
}

const fn create(
    key: &'static str,
    label: &'static str,
    strip: &'static [&'static str],
    skip: SkipItem,
) -> Slot {
    Slot::new(key, label, Restore::CreateEach { strip, skip })
}

const ALWAYS: Gate = Gate::Always;
const APPLIANCE: Gate = Gate::Product(ProductType::Appliance);
const SWITCH: Gate = Gate::Product(ProductType::Switch);
const WIRELESS: Gate = Gate::Product(ProductType::Wireless);
const MS: Gate = Gate::Model(ModelFamily::Switch);
const MR: Gate = Gate::Model(ModelFamily::Wireless);
const MX: Gate = Gate::Model(ModelFamily::Appliance);

const NETWORK_IDENTITY: &[&str] = &["id", "networkId"];

// ── Organization ────────────────────────────────────────────────────

/// Organization-level entries. The organization record itself is written as
/// `organization/details.json` by the backup and is not listed here.
pub static ORGANIZATION: &[Entry] = &[
    slotted("admins", "/admins", ALWAYS, keep("admins", "Admins")),
    plain("alerts_profiles", "/alerts/profiles", ALWAYS),
    plain("apiRequests_summary", "/apiRequests", ALWAYS),
    plain("brandingPolicies", "/brandingPolicies", ALWAYS),
    plain("brandingPolicies_priorities", "/brandingPolicies/priorities", ALWAYS),
    slotted("configTemplates", "/configTemplates", ALWAYS, keep("configTemplates", "Config Templates")),
    plain("inventory_devices", "/inventory/devices", ALWAYS),
    plain("licenses", "/licenses", ALWAYS),
    plain("loginSecurity", "/loginSecurity", ALWAYS),
    slotted(
        "policyObjects",
        "/policyObjects",
        ALWAYS,
        keep("policyObjects", "Policy Objects").selective(),
    ),
    plain("policyObjects_groups", "/policyObjects/groups", ALWAYS),
    plain("saml_roles", "/saml/roles", ALWAYS),
    slotted("snmp", "/snmp", ALWAYS, keep("snmp", "Organization SNMP").selective()),
    slotted(
        "appliance_vpn_thirdPartyVPNPeers",
        "/appliance/vpn/thirdPartyVPNPeers",
        ALWAYS,
        keep("thirdPartyVpnPeers", "Third-party VPN Peers"),
    ),
    slotted(
        "appliance_vpn_vpnFirewallRules",
        "/appliance/vpn/vpnFirewallRules",
        ALWAYS,
        keep("vpnFirewallRules", "VPN Firewall Rules"),
    ),
    plain("appliance_security_intrusion", "/appliance/security/intrusion", ALWAYS),
    plain("earlyAccess_features", "/earlyAccess/features", ALWAYS),
    plain("webhooks_alertTypes", "/webhooks/alertTypes", ALWAYS),
];

// ── Network ─────────────────────────────────────────────────────────

/// Network-level entries. `details.json` is written from the network record.
pub static NETWORK: &[Entry] = &[
    // General
    slotted("alerts_settings", "/alerts/settings", ALWAYS, replace("networkAlerts", "Alert Settings")),
    plain("bluetoothClients", "/bluetoothClients", ALWAYS),
    plain("events_eventTypes", "/events/eventTypes", ALWAYS),
    slotted("floorPlans", "/floorPlans", ALWAYS, keep("floorplans", "Floor Plans")),
    slotted(
        "groupPolicies",
        "/groupPolicies",
        ALWAYS,
        create("groupPolicies", "Group Policies", &["groupPolicyId"], SkipItem::Nothing).selective(),
    ),
    plain("merakiAuthUsers", "/merakiAuthUsers", ALWAYS),
    plain("netflow", "/netflow", ALWAYS),
    plain("pii_piiKeys", "/pii/piiKeys", ALWAYS),
    plain("settings", "/settings", ALWAYS),
    slotted("snmp", "/snmp", ALWAYS, replace("snmp", "Network SNMP Settings").selective()),
    slotted(
        "syslogServers",
        "/syslogServers",
        ALWAYS,
        replace("syslogServers", "Syslog Servers").field("servers").selective(),
    ),
    plain("trafficAnalysis", "/trafficAnalysis", ALWAYS),
    plain("trafficShaping_applicationCategories", "/trafficShaping/applicationCategories", ALWAYS),
    plain("trafficShaping_dscpTaggingOptions", "/trafficShaping/dscpTaggingOptions", ALWAYS),
    plain("vlanProfiles", "/vlanProfiles", ALWAYS),
    slotted(
        "webhooks_httpServers",
        "/webhooks/httpServers",
        ALWAYS,
        create("webhooks", "Webhook HTTP Servers", NETWORK_IDENTITY, SkipItem::Unnamed),
    ),
    plain("webhooks_payloadTemplates", "/webhooks/payloadTemplates", ALWAYS),
    // Appliance
    plain(
        "appliance_connectivityMonitoringDestinations",
        "/appliance/connectivityMonitoringDestinations",
        APPLIANCE,
    ),
    slotted(
        "appliance_contentFiltering",
        "/appliance/contentFiltering",
        APPLIANCE,
        replace("contentFiltering", "Content Filtering"),
    ),
    plain("appliance_firewall_cellularFirewallRules", "/appliance/firewall/cellularFirewallRules", APPLIANCE),
    plain("appliance_firewall_inboundFirewallRules", "/appliance/firewall/inboundFirewallRules", APPLIANCE),
    slotted(
        "appliance_firewall_l3FirewallRules",
        "/appliance/firewall/l3FirewallRules",
        APPLIANCE,
        replace("applianceL3FirewallRules", "L3 Firewall Rules").selective(),
    ),
    slotted(
        "appliance_firewall_l7FirewallRules",
        "/appliance/firewall/l7FirewallRules",
        APPLIANCE,
        replace("applianceL7FirewallRules", "L7 Firewall Rules").selective(),
    ),
    plain("appliance_firewall_oneToManyNatRules", "/appliance/firewall/oneToManyNatRules", APPLIANCE),
    plain("appliance_firewall_oneToOneNatRules", "/appliance/firewall/oneToOneNatRules", APPLIANCE),
    plain("appliance_firewall_portForwardingRules", "/appliance/firewall/portForwardingRules", APPLIANCE),
    slotted(
        "appliance_security_intrusion",
        "/appliance/security/intrusion",
        APPLIANCE,
        replace("intrusionSettings", "Intrusion Detection/Prevention").selective(),
    ),
    slotted(
        "appliance_security_malware",
        "/appliance/security/malware",
        APPLIANCE,
        replace("malwareSettings", "Malware Protection").selective(),
    ),
    slotted(
        "appliance_settings",
        "/appliance/settings",
        APPLIANCE,
        replace("applianceSettings", "Appliance Settings"),
    ),
    slotted(
        "appliance_staticRoutes",
        "/appliance/staticRoutes",
        APPLIANCE,
        create("staticRoutes", "Appliance Static Routes", NETWORK_IDENTITY, SkipItem::Nothing)
            .selective(),
    ),
    plain("appliance_trafficShaping", "/appliance/trafficShaping", APPLIANCE),
    plain(
        "appliance_trafficShaping_customPerformanceClasses",
        "/appliance/trafficShaping/customPerformanceClasses",
        APPLIANCE,
    ),
    slotted(
        "appliance_trafficShaping_rules",
        "/appliance/trafficShaping/rules",
        APPLIANCE,
        replace("trafficShapingRules", "Traffic Shaping Rules"),
    ),
    slotted(
        "appliance_trafficShaping_uplinkSelection",
        "/appliance/trafficShaping/uplinkSelection",
        APPLIANCE,
        replace("uplinkSelection", "Uplink Selection"),
    ),
    plain("appliance_uplinks_settings", "/appliance/uplinks/settings", APPLIANCE),
    slotted(
        "appliance_vlans",
        "/appliance/vlans",
        APPLIANCE,
        create("applianceVlans", "Appliance VLANs", NETWORK_IDENTITY, SkipItem::DefaultVlan)
            .selective(),
    ),
    plain("appliance_vlans_settings", "/appliance/vlans/settings", APPLIANCE),
    slotted("appliance_vpn_bgp", "/appliance/vpn/bgp", APPLIANCE, replace("bgpSettings", "BGP")),
    slotted(
        "appliance_vpn_siteToSiteVpn",
        "/appliance/vpn/siteToSiteVpn",
        APPLIANCE,
        replace("siteToSiteVpnSettings", "Site-to-Site VPN").selective(),
    ),
    // Switch
    slotted(
        "switch_accessControlLists",
        "/switch/accessControlLists",
        SWITCH,
        replace("switchAcls", "Switch ACLs").selective(),
    ),
    slotted("switch_accessPolicies", "/switch/accessPolicies", SWITCH, keep("accessPolicies", "Access Policies")),
    slotted(
        "switch_dhcpServerPolicy",
        "/switch/dhcpServerPolicy",
        SWITCH,
        replace("dhcpServerPolicy", "DHCP Server Policy"),
    ),
    slotted(
        "switch_dscpToCosMappings",
        "/switch/dscpToCosMappings",
        SWITCH,
        replace("dscpToCosMappings", "DSCP to CoS Mappings"),
    ),
    slotted(
        "switch_linkAggregations",
        "/switch/linkAggregations",
        SWITCH,
        create("switchLinkAggregations", "Link Aggregations", &["id"], SkipItem::Nothing),
    ),
    slotted("switch_mtu", "/switch/mtu", SWITCH, replace("switchMtu", "Switch MTU")),
    slotted("switch_ospf", "/switch/ospf", SWITCH, replace("switchOspf", "OSPF")),
    slotted("switch_portSchedules", "/switch/portSchedules", SWITCH, keep("portSchedules", "Port Schedules")),
    slotted("switch_qosRules", "/switch/qosRules", SWITCH, keep("qosRules", "QoS Rules")),
    slotted(
        "switch_settings",
        "/switch/settings",
        SWITCH,
        replace("switchSettings", "Switch Settings").selective(),
    ),
    slotted(
        "switch_stormControl",
        "/switch/stormControl",
        SWITCH,
        replace("stormControl", "Storm Control"),
    ),
    plain("switch_stp", "/switch/stp", SWITCH),
    // Wireless
    plain("wireless_alternateManagementInterface", "/wireless/alternateManagementInterface", WIRELESS),
    plain("wireless_billing", "/wireless/billing", WIRELESS),
    slotted(
        "wireless_bluetooth_settings",
        "/wireless/bluetooth/settings",
        WIRELESS,
        replace("bluetoothSettings", "Bluetooth Settings"),
    ),
    slotted(
        "wireless_rfProfiles",
        "/wireless/rfProfiles",
        WIRELESS,
        create("wirelessRfProfiles", "Wireless RF Profiles", NETWORK_IDENTITY, SkipItem::Unnamed)
            .selective(),
    ),
    slotted(
        "wireless_settings",
        "/wireless/settings",
        WIRELESS,
        replace("wirelessSettings", "Wireless Settings"),
    ),
    slotted(
        "wireless_ssids",
        "/wireless/ssids",
        WIRELESS,
        Slot::new(SSIDS_KEY, "SSIDs", Restore::Ssids).selective(),
    ),
];

/// Order in which network slots are replayed. VLANs go first because
/// other settings reference them; SSIDs go last because they reference
/// group policies.
pub static NETWORK_RESTORE_ORDER: &[&str] = &[
    "applianceVlans",
    "syslogServers",
    "snmp",
    "applianceL3FirewallRules",
    "applianceL7FirewallRules",
    "siteToSiteVpnSettings",
    "intrusionSettings",
    "malwareSettings",
    "staticRoutes",
    "switchSettings",
    "switchAcls",
    "wirelessRfProfiles",
    "networkAlerts",
    "webhooks",
    "applianceSettings",
    "contentFiltering",
    "uplinkSelection",
    "trafficShapingRules",
    "bgpSettings",
    "dhcpServerPolicy",
    "dscpToCosMappings",
    "stormControl",
    "switchMtu",
    "switchLinkAggregations",
    "switchOspf",
    "wirelessSettings",
    "bluetoothSettings",
    "groupPolicies",
    SSIDS_KEY,
];

// ── SSID ────────────────────────────────────────────────────────────

/// Per-SSID entries, fanned out once per SSID number of a wireless network.
pub static SSID: &[Entry] = &[
    plain("bonjourForwarding", "/bonjourForwarding", WIRELESS),
    plain("deviceTypeGroupPolicies", "/deviceTypeGroupPolicies", WIRELESS),
    slotted(
        "firewall_l3FirewallRules",
        "/firewall/l3FirewallRules",
        WIRELESS,
        replace("ssidFirewallL3Rules", "L3 Firewall Rules").selective(),
    ),
    slotted(
        "firewall_l7FirewallRules",
        "/firewall/l7FirewallRules",
        WIRELESS,
        replace("ssidFirewallL7Rules", "L7 Firewall Rules").selective(),
    ),
    plain("hotspot20", "/hotspot20", WIRELESS),
    plain("identityPsks", "/identityPsks", WIRELESS),
    plain("schedules", "/schedules", WIRELESS),
    plain("splash_settings", "/splash/settings", WIRELESS),
    slotted(
        "trafficShaping_rules",
        "/trafficShaping/rules",
        WIRELESS,
        replace("ssidTrafficShaping", "Traffic Shaping").selective(),
    ),
    plain("vpn", "/vpn", WIRELESS),
];

// ── Device ──────────────────────────────────────────────────────────

/// Device-level entries. `details.json` is written from the device record.
pub static DEVICE: &[Entry] = &[
    slotted(
        "switch_ports",
        "/switch/ports",
        MS,
        Slot::new("switchPorts", "Switch Ports", Restore::UpdateEach { id_field: "portId" })
            .selective(),
    ),
    plain("switch_ports_statuses", "/switch/ports/statuses", MS),
    slotted(
        "switch_routing_interfaces",
        "/switch/routing/interfaces",
        MS,
        keep("routingInterfaces", "Routing Interfaces").selective(),
    ),
    slotted(
        "switch_routing_staticRoutes",
        "/switch/routing/staticRoutes",
        MS,
        keep("staticRoutes", "Switch Static Routes").selective(),
    ),
    plain("wireless_radio_settings", "/wireless/radio/settings", MR),
    plain("appliance_uplink_settings", "/appliance/uplink/settings", MX),
];

// ── Gating ──────────────────────────────────────────────────────────

pub fn organization_entries() -> impl Iterator<Item = &'static Entry> {
    ORGANIZATION.iter()
}

pub fn selective_organization_entries() -> impl Iterator<Item = &'static Entry> {
    ORGANIZATION.iter().filter(|e| e.is_selective())
}

/// Network entries applicable to a network hosting `products`.
pub fn network_entries(products: &[ProductType]) -> impl Iterator<Item = &'static Entry> + '_ {
    NETWORK.iter().filter(move |e| e.gate.admits_network(products))
}

pub fn selective_network_entries(
    products: &[ProductType],
) -> impl Iterator<Item = &'static Entry> + '_ {
    network_entries(products).filter(|e| e.is_selective())
}

pub fn ssid_entries() -> impl Iterator<Item = &'static Entry> {
    SSID.iter()
}

pub fn selective_ssid_entries() -> impl Iterator<Item = &'static Entry> {
    SSID.iter().filter(|e| e.is_selective())
}

/// Device entries applicable to a device of `model`.
pub fn device_entries(model: &str) -> impl Iterator<Item = &'static Entry> {
    let family = ModelFamily::from_model(model);
    DEVICE.iter().filter(move |e| e.gate.admits_device(family))
}

pub fn selective_device_entries(model: &str) -> impl Iterator<Item = &'static Entry> {
    device_entries(model).filter(|e| e.is_selective())
}

/// The network entry owning snapshot key `key`.
pub fn network_slot(key: &str) -> Option<(&'static Entry, Slot)> {
    NETWORK
        .iter()
        .find_map(|e| e.slot.filter(|s| s.key == key).map(|s| (e, s)))
}

pub fn ssid_slots() -> impl Iterator<Item = (&'static Entry, Slot)> {
    SSID.iter().filter_map(|e| e.slot.map(|s| (e, s)))
}

pub fn device_slot(key: &str) -> Option<(&'static Entry, Slot)> {
    DEVICE
        .iter()
        .find_map(|e| e.slot.filter(|s| s.key == key).map(|s| (e, s)))
}

// ── Tests ────────────────────────────────────────────────────────────
