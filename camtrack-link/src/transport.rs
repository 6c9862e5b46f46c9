//! Transport layer abstraction
//!
//! A [`Transport`] finds the actuator node and opens sessions to it. A
//! [`Session`] is one established connection; it is owned by the link
//! manager and never handed out.

use crate::error::LinkError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Bluetooth Low Energy
    Ble,
    /// Dry run: payloads are logged, nothing is transmitted
    Log,
    /// Custom transport
    Custom(String),
}

/// A device found during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Advertised name
    pub name: String,
    /// Transport-specific identifier used to open the session
    pub id: String,
}

/// Discovery and session establishment
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get transport kind
    fn kind(&self) -> TransportKind;

    /// Look for a device advertising exactly `device_name`, for at most `timeout`
    async fn discover(
        &mut self,
        device_name: &str,
        timeout: Duration,
    ) -> Result<Option<DiscoveredDevice>, LinkError>;

    /// Open a session to a discovered device
    async fn open(&mut self, device: &DiscoveredDevice) -> Result<Box<dyn Session>, LinkError>;
}

/// One established connection
#[async_trait]
pub trait Session: Send + Sync {
    /// Write one complete payload to the command channel
    async fn write(&mut self, payload: &Bytes) -> Result<(), LinkError>;

    /// Whether the remote end is still connected
    async fn is_alive(&self) -> bool;

    /// Tear the session down
    async fn close(&mut self) -> Result<(), LinkError>;
}
