//! Bluetooth Low Energy transport (btleplug)
//!
//! Discovery matches the advertised local name exactly, optionally narrowed
//! to devices advertising the configured service. Payloads are written with
//! response to the position characteristic. When a status characteristic is
//! configured and notifiable, its notifications are logged.

use crate::error::LinkError;
use crate::transport::{DiscoveredDevice, Session, Transport, TransportKind};
use async_trait::async_trait;
use btleplug::api::{Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use camtrack_core::LinkConfig;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BleTransport {
    config: LinkConfig,
    adapter: Option<Adapter>,
    discovered: HashMap<String, Peripheral>,
}

impl BleTransport {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            adapter: None,
            discovered: HashMap::new(),
        }
    }

    async fn adapter(&mut self) -> Result<Adapter, LinkError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LinkError::Adapter("No Bluetooth adapter found".to_string()))?;

        info!("Using Bluetooth adapter {}", adapter.adapter_info().await.unwrap_or_default());
        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    async fn find_named(adapter: &Adapter, device_name: &str) -> Result<Option<Peripheral>, LinkError> {
        for peripheral in adapter.peripherals().await? {
            let name = peripheral
                .properties()
                .await?
                .and_then(|props| props.local_name);
            if name.as_deref() == Some(device_name) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    async fn subscribe_status(peripheral: &Peripheral, characteristic: &Characteristic) -> Option<JoinHandle<()>> {
        if let Err(e) = peripheral.subscribe(characteristic).await {
            warn!("Could not subscribe to status notifications: {}", e);
            return None;
        }
        let mut notifications = match peripheral.notifications().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Could not open notification stream: {}", e);
                return None;
            }
        };

        let status_uuid = characteristic.uuid;
        Some(tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid == status_uuid {
                    info!("Actuator status: {}", String::from_utf8_lossy(&notification.value));
                }
            }
            debug!("Status notification stream ended");
        }))
    }
}

#[async_trait]
impl Transport for BleTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    async fn discover(
        &mut self,
        device_name: &str,
        timeout: Duration,
    ) -> Result<Option<DiscoveredDevice>, LinkError> {
        let adapter = self.adapter().await?;
        let filter = ScanFilter {
            services: self.config.service_uuid.into_iter().collect(),
        };
        adapter
            .start_scan(filter)
            .await
            .map_err(|e| LinkError::Scan(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + timeout;
        let found = loop {
            match Self::find_named(&adapter, device_name).await {
                Ok(Some(peripheral)) => break Ok(Some(peripheral)),
                Ok(None) => {}
                Err(e) => break Err(e),
            }
            if tokio::time::Instant::now() >= deadline {
                break Ok(None);
            }
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        };

        if let Err(e) = adapter.stop_scan().await {
            debug!("Ignoring stop_scan error: {}", e);
        }

        let Some(peripheral) = found? else {
            return Ok(None);
        };

        let id = format!("{:?}", peripheral.id());
        debug!("Discovered '{}' at {}", device_name, peripheral.address());
        self.discovered.insert(id.clone(), peripheral);
        Ok(Some(DiscoveredDevice {
            name: device_name.to_string(),
            id,
        }))
    }

    async fn open(&mut self, device: &DiscoveredDevice) -> Result<Box<dyn Session>, LinkError> {
        let peripheral = self
            .discovered
            .remove(&device.id)
            .ok_or_else(|| LinkError::Connect(format!("'{}' was not discovered", device.name)))?;

        peripheral
            .connect()
            .await
            .map_err(|e| LinkError::Connect(e.to_string()))?;

        let opened = open_characteristics(&peripheral, self.config.characteristic_uuid, self.config.status_uuid).await;
        let (command, status) = match opened {
            Ok(found) => found,
            Err(e) => {
                if let Err(close_err) = peripheral.disconnect().await {
                    debug!("Ignoring disconnect error: {}", close_err);
                }
                return Err(e);
            }
        };

        let status_task = match status {
            Some(characteristic) => Self::subscribe_status(&peripheral, &characteristic).await,
            None => None,
        };

        Ok(Box::new(BleSession {
            peripheral,
            command,
            status_task,
        }))
    }
}

async fn open_characteristics(
    peripheral: &Peripheral,
    command_uuid: Uuid,
    status_uuid: Option<Uuid>,
) -> Result<(Characteristic, Option<Characteristic>), LinkError> {
    peripheral
        .discover_services()
        .await
        .map_err(|e| LinkError::Connect(format!("Service discovery failed: {}", e)))?;

    let characteristics = peripheral.characteristics();
    let command = characteristics
        .iter()
        .find(|c| c.uuid == command_uuid)
        .cloned()
        .ok_or_else(|| LinkError::Connect(format!("Characteristic {} not found", command_uuid)))?;

    let status = status_uuid.and_then(|uuid| {
        characteristics
            .iter()
            .find(|c| c.uuid == uuid && c.properties.contains(CharPropFlags::NOTIFY))
            .cloned()
    });

    Ok((command, status))
}

struct BleSession {
    peripheral: Peripheral,
    command: Characteristic,
    status_task: Option<JoinHandle<()>>,
}

#[async_trait]
impl Session for BleSession {
    async fn write(&mut self, payload: &Bytes) -> Result<(), LinkError> {
        self.peripheral
            .write(&self.command, payload, WriteType::WithResponse)
            .await
            .map_err(|e| LinkError::Write(e.to_string()))
    }

    async fn is_alive(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| LinkError::Disconnect(e.to_string()))
    }
}

impl Drop for BleSession {
    fn drop(&mut self) {
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
    }
}
