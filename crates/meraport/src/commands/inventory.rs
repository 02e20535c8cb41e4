//! Organization, network and device listings.

use tabled::Tabled;

use meraport_core::{Device, Network, Organization};

use crate::cli::{DevicesArgs, GlobalOpts, OrgArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct OrgRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "API")]
    api: &'static str,
}

impl From<&Organization> for OrgRow {
    fn from(o: &Organization) -> Self {
        Self {
            id: o.id.clone(),
            name: o.name.clone(),
            api: if o.api_enabled() { "enabled" } else { "disabled" },
        }
    }
}

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Products")]
    products: String,
    #[tabled(rename = "Time zone")]
    time_zone: String,
}

impl From<&Network> for NetworkRow {
    fn from(n: &Network) -> Self {
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            products: n.product_types.join(", "),
            time_zone: n.time_zone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            serial: d.serial.clone(),
            name: d.name.clone().unwrap_or_default(),
            model: d.model.clone(),
            network: d.network_id.clone().unwrap_or_else(|| "-".into()),
            status: d.status.clone().unwrap_or_else(|| "unknown".into()),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn orgs(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let client = session.dashboard(global)?;
    let orgs = client.organizations().await?;
    let out = output::render_list(global.output, &orgs, |o| OrgRow::from(o), |o| o.id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn networks(session: &Session, args: OrgArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = session.dashboard(global)?;
    let org_id = session.org_id(args.org.as_deref())?;
    let networks = client.networks(&org_id).await?;
    let out = output::render_list(global.output, &networks, |n| NetworkRow::from(n), |n| n.id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn devices(
    session: &Session,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = session.dashboard(global)?;
    let devices = match args.network {
        Some(network_id) => client.network_devices(&network_id).await?,
        None => {
            let org_id = session.org_id(args.org.org.as_deref())?;
            client.devices(&org_id).await?
        }
    };
    let out = output::render_list(global.output, &devices, |d| DeviceRow::from(d), |d| d.serial.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
