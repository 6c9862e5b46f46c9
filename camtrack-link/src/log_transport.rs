//! Dry-run transport: every payload is logged instead of transmitted

use crate::error::LinkError;
use crate::transport::{DiscoveredDevice, Session, Transport, TransportKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Transport that always finds the device and logs what would be sent
#[derive(Debug, Default)]
pub struct LogTransport {
    written: Arc<AtomicU64>,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads written through every session opened so far
    pub fn written(&self) -> Arc<AtomicU64> {
        self.written.clone()
    }
}

#[async_trait]
impl Transport for LogTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Log
    }

    async fn discover(
        &mut self,
        device_name: &str,
        _timeout: Duration,
    ) -> Result<Option<DiscoveredDevice>, LinkError> {
        Ok(Some(DiscoveredDevice {
            name: device_name.to_string(),
            id: "dry-run".to_string(),
        }))
    }

    async fn open(&mut self, device: &DiscoveredDevice) -> Result<Box<dyn Session>, LinkError> {
        info!("Dry run: pretending to connect to '{}'", device.name);
        Ok(Box::new(LogSession {
            written: self.written.clone(),
            open: true,
        }))
    }
}

struct LogSession {
    written: Arc<AtomicU64>,
    open: bool,
}

#[async_trait]
impl Session for LogSession {
    async fn write(&mut self, payload: &Bytes) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        self.written.fetch_add(1, Ordering::Relaxed);
        info!("Sending: {}", String::from_utf8_lossy(payload));
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.open = false;
        Ok(())
    }
}
