// unifi-speedtest: Async client for archived speedtest results from UniFi gateways

pub mod auth;
pub mod client;
pub mod detect;
pub mod error;
pub mod model;
pub mod transport;

mod cache;
mod normalize;
mod report;
mod session;

pub use auth::{ControllerKind, Credentials};
pub use client::SpeedtestClient;
pub use error::{Error, UnreachableKind};
pub use model::{SpeedtestResult, format_speed, relative_time};
pub use transport::{TlsMode, TransportConfig};
