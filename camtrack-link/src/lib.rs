//! camtrack-link: wireless session management for the actuator node
//!
//! Provides:
//! - Pluggable transport/session abstraction
//! - Link manager state machine with fixed-backoff reconnection
//! - Dry-run log transport
//! - Bluetooth Low Energy transport (feature `ble-transport`)

pub mod error;
pub mod transport;
pub mod manager;
pub mod log_transport;
#[cfg(feature = "ble-transport")]
pub mod ble;

pub use error::LinkError;
pub use transport::{DiscoveredDevice, Session, Transport, TransportKind};
pub use manager::{LinkManager, LinkState, LinkStats};
pub use log_transport::LogTransport;
#[cfg(feature = "ble-transport")]
pub use ble::BleTransport;
