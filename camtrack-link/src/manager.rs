//! Link manager: session lifecycle for the actuator node
//!
//! `Disconnected -> Connecting -> Connected`, and any state falls back to
//! `Disconnected` on failure. Connecting retries forever with a fixed
//! backoff; callers cancel it by dropping the future. A failed or hung write
//! is a drop: the session is discarded and the next `connect()` starts over
//! from discovery.

use crate::error::LinkError;
use crate::transport::{Session, Transport};
use bytes::Bytes;
use camtrack_core::{Clock, LinkConfig};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Link session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Counters over the lifetime of a link manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub connect_attempts: u64,
    pub sessions_established: u64,
    pub drops: u64,
    pub payloads_sent: u64,
    pub send_failures: u64,
}

pub struct LinkManager {
    config: LinkConfig,
    transport: Box<dyn Transport>,
    session: Option<Box<dyn Session>>,
    state: LinkState,
    clock: Arc<dyn Clock>,
    stats: LinkStats,
}

impl LinkManager {
    pub fn new(config: LinkConfig, transport: Box<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            transport,
            session: None,
            state: LinkState::Disconnected,
            clock,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Non-blocking state query
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Establish a session, retrying until one exists.
    ///
    /// Never returns an error. Each failed attempt is followed by the
    /// configured backoff.
    pub async fn connect(&mut self) {
        if self.is_connected() {
            return;
        }

        self.state = LinkState::Connecting;
        let backoff = self.config.reconnect_backoff();

        loop {
            self.stats.connect_attempts += 1;
            match self.try_connect_once().await {
                Ok(()) => {
                    self.state = LinkState::Connected;
                    self.stats.sessions_established += 1;
                    info!(
                        "Connected to '{}' after {} attempt(s)",
                        self.config.device_name, self.stats.connect_attempts
                    );
                    return;
                }
                Err(LinkError::NotFound(name)) => {
                    info!("'{}' not found, retrying in {:?}", name, backoff);
                }
                Err(e) => {
                    warn!("Connection failed: {}, retrying in {:?}", e, backoff);
                }
            }
            self.clock.sleep(backoff).await;
        }
    }

    /// Write one payload to the command channel.
    ///
    /// Fails with [`LinkError::NotConnected`] without touching the transport
    /// unless connected. Any write failure, including a timeout, drops the
    /// session before returning the error.
    pub async fn send(&mut self, payload: &Bytes) -> Result<(), LinkError> {
        if self.state != LinkState::Connected {
            return Err(LinkError::NotConnected);
        }
        let Some(session) = self.session.as_mut() else {
            self.state = LinkState::Disconnected;
            return Err(LinkError::NotConnected);
        };

        let limit = self.config.write_timeout();
        let result = match with_deadline(self.clock.as_ref(), limit, session.write(payload)).await {
            Some(result) => result,
            None => Err(LinkError::Timeout(format!("write exceeded {:?}", limit))),
        };

        match result {
            Ok(()) => {
                self.stats.payloads_sent += 1;
                debug!("Sent {}", String::from_utf8_lossy(payload));
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Error sending data: {}", e);
                self.drop_session().await;
                Err(e)
            }
        }
    }

    /// Ask the session whether the remote end is still there.
    ///
    /// Returns the resulting connectivity. A dead session is dropped.
    pub async fn check_liveness(&mut self) -> bool {
        let alive = match self.session.as_ref() {
            Some(session) => session.is_alive().await,
            None => false,
        };

        if !alive && self.state == LinkState::Connected {
            warn!("Lost connection to '{}'", self.config.device_name);
            self.drop_session().await;
        }
        self.is_connected()
    }

    /// Close the session, if any
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                debug!("Ignoring disconnect error: {}", e);
            }
            info!("Disconnected from '{}'", self.config.device_name);
        }
        self.state = LinkState::Disconnected;
    }

    async fn try_connect_once(&mut self) -> Result<(), LinkError> {
        let name = self.config.device_name.clone();
        let scan_timeout = self.config.scan_timeout();

        // The transport enforces scan_timeout itself and stops its scan on
        // the way out; the outer bound only catches a transport that hangs.
        let discovery_limit = scan_timeout + scan_timeout / 2;
        let device = with_deadline(
            self.clock.as_ref(),
            discovery_limit,
            self.transport.discover(&name, scan_timeout),
        )
        .await
        .unwrap_or(Ok(None))?
        .ok_or_else(|| LinkError::NotFound(name.clone()))?;

        debug!("Found '{}' ({}), opening session", device.name, device.id);

        let session = with_deadline(self.clock.as_ref(), scan_timeout, self.transport.open(&device))
            .await
            .unwrap_or_else(|| Err(LinkError::Timeout(format!("session handshake exceeded {:?}", scan_timeout))))?;

        self.session = Some(session);
        Ok(())
    }

    async fn drop_session(&mut self) {
        self.stats.drops += 1;
        self.state = LinkState::Disconnected;
        if let Some(mut session) = self.session.take() {
            // The session is being discarded either way
            if let Err(e) = session.close().await {
                debug!("Ignoring error while discarding session: {}", e);
            }
        }
    }
}

/// Race `fut` against a sleep on `clock`; `None` if the sleep wins
async fn with_deadline<F, T>(clock: &dyn Clock, limit: Duration, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        out = fut => Some(out),
        _ = clock.sleep(limit) => None,
    }
}
