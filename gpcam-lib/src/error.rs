use std::io;
use thiserror::Error;

/// The primary error type for the `gpcam` library.
#[derive(Error, Debug)]
pub enum GpError {
    #[error("no camera found advertising the GoPro service. Is the camera awake?")]
    DeviceNotFound,

    #[error("deadline elapsed before the operation settled")]
    Timeout,

    #[error("no active session")]
    NoActiveSession,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
