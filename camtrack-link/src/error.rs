//! Error types for camtrack-link

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Link is not connected")]
    NotConnected,

    #[error("Device '{0}' not found")]
    NotFound(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Disconnect error: {0}")]
    Disconnect(String),
}

#[cfg(feature = "ble-transport")]
impl From<btleplug::Error> for LinkError {
    fn from(err: btleplug::Error) -> Self {
        LinkError::Adapter(err.to_string())
    }
}
