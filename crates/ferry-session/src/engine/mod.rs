//! The boundary to the native transfer engine.

use std::time::Duration;

use thiserror::Error;

use crate::option::{OptionValue, TransferOption};

#[cfg(feature = "curl")]
mod libcurl;

#[cfg(feature = "curl")]
pub use self::libcurl::CurlEngine;

/// Reason an engine refused an option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// A transfer that did not complete: the engine's error code and message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer failed ({code}): {message}")]
pub struct TransferFailure {
    pub code: i32,
    pub message: String,
}

/// Post-transfer metadata reported by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferInfo {
    pub connect_time: Duration,
    pub total_time: Duration,
    pub local_ip: Option<String>,
    pub local_port: Option<u16>,
    /// Average download speed in bytes per second.
    pub download_speed: f64,
    pub http_code: u32,
}

/// Synchronous "configure options on a handle, then perform" HTTP engine.
///
/// # Implementations
///
/// - [`CurlEngine`]: libcurl easy handle (feature `curl`)
/// - Scripted engines for testing
pub trait TransferEngine {
    /// Apply one option to the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has the wrong shape for the option or the
    /// engine refuses it. A refused option leaves the handle unchanged.
    fn set_option(&mut self, option: TransferOption, value: &OptionValue) -> Result<(), EngineError>;

    /// Return one option to the engine default.
    fn clear_option(&mut self, option: TransferOption) -> Result<(), EngineError>;

    /// Whether this engine build understands `option` at all.
    fn supports(&self, option: TransferOption) -> bool;

    /// Run the transfer, handing each received body chunk to `on_chunk`.
    ///
    /// Blocks until the transfer finishes or fails.
    fn perform(&mut self, on_chunk: &mut dyn FnMut(&[u8])) -> Result<(), TransferFailure>;

    /// Metadata about the most recent transfer.
    fn info(&mut self) -> TransferInfo;

    /// Human-readable text for an engine error code.
    fn describe_error(&self, code: i32) -> String;
}
