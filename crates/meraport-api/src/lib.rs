// meraport-api: Rate-limited async access to the Meraki Dashboard API.
//
// Every vendor call goes through one `Gateway`, which owns the process-wide
// admission queue and the retry policy. The wire itself sits behind the
// `Transport` trait: either the JSON relay proxy or the regional API directly.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod transport;

pub use auth::{Account, Region};
pub use error::Error;
pub use gateway::{ApiRequest, Gateway, GatewayConfig, Method, Reply};
pub use transport::{DirectTransport, ProxyTransport, RawResponse, Transport, TransportConfig};
