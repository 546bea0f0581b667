//! Error types for the SIE CAN library
//!
//! Every failing MT_API call is surfaced with the raw status code it
//! returned, so callers can match against the `NTCAN_*` constants.

use thiserror::Error;

use crate::constants::status_name;

/// Result type alias for SIE CAN operations
pub type Result<T> = std::result::Result<T, SieCanError>;

/// Configuration step of opening a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// `canOpen`
    Open,
    /// `canSetBaudrate`
    Bitrate,
    /// `canSetFilterMode`
    FilterMode,
    /// `canGetSystemTime` while capturing the timestamp anchor
    SystemTime,
    /// Creating the receive event object
    ReceiveEvent,
}

impl std::fmt::Display for InitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InitStep::Open => "open channel",
            InitStep::Bitrate => "set bitrate",
            InitStep::FilterMode => "set filter mode",
            InitStep::SystemTime => "read device clock",
            InitStep::ReceiveEvent => "create receive event",
        };
        f.write_str(name)
    }
}

/// Error types for SIE CAN operations
#[derive(Error, Debug)]
pub enum SieCanError {
    /// The vendor library cannot be used in this process
    #[error("SIE MT_API unavailable: {0}")]
    UnsupportedPlatform(String),

    /// A configuration step failed while opening a channel
    #[error("Failed to {step}: {} ({code})", status_name(*.code))]
    Init { step: InitStep, code: i32 },

    /// A bus operation returned a failure status
    #[error("{op} failed: {} ({code})", status_name(*.code))]
    Bus { op: &'static str, code: i32 },

    /// Frame could not be transmitted within the channel's transmit timeout
    #[error("Timeout whilst sending frame")]
    SendTimeout,

    /// Transmit buffer was not drained within the flush timeout
    #[error("Timeout whilst flushing transmit buffer")]
    FlushTimeout,

    /// Frame payload exceeds classic CAN
    #[error("Invalid frame: data length {length} exceeds 8 bytes")]
    InvalidFrame { length: usize },

    /// No vendor code for the requested bitrate
    #[error("Unsupported bitrate {0}")]
    UnsupportedBitrate(u32),

    /// Operation only exists on CANUSB adapters
    #[error("Flushing the transmit buffer is only supported on CANUSB (net {net})")]
    FlushNotSupported { net: i32 },

    /// Channel has already been closed
    #[error("Channel is closed")]
    ChannelClosed,
}

impl SieCanError {
    /// Check if this error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, SieCanError::SendTimeout | SieCanError::FlushTimeout)
    }

    /// Raw MT_API status code carried by this error, if any
    pub fn status_code(&self) -> Option<i32> {
        match self {
            SieCanError::Init { code, .. } | SieCanError::Bus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl embedded_can::Error for SieCanError {
    fn kind(&self) -> embedded_can::ErrorKind {
        embedded_can::ErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NTCAN_CONTR_BUSOFF, NTCAN_INVALID_HANDLE};

    #[test]
    fn test_status_code() {
        let err = SieCanError::Bus {
            op: "read",
            code: NTCAN_CONTR_BUSOFF,
        };
        assert_eq!(err.status_code(), Some(NTCAN_CONTR_BUSOFF));
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "read failed: CONTR_BUSOFF (-3)");

        assert_eq!(SieCanError::SendTimeout.status_code(), None);
        assert!(SieCanError::SendTimeout.is_timeout());
    }

    #[test]
    fn test_init_display() {
        let err = SieCanError::Init {
            step: InitStep::FilterMode,
            code: NTCAN_INVALID_HANDLE,
        };
        assert_eq!(
            err.to_string(),
            "Failed to set filter mode: INVALID_HANDLE (-8)"
        );
    }
}
