//! Sontheim MT_API CAN Driver for Rust
//!
//! This crate drives Sontheim (SIE) CAN adapters such as the CANfox,
//! CANUSB and CANAS families through the vendor's `SIECA132.DLL`.
//!
//! # Features
//!
//! - Classic CAN frames (standard, extended, remote and error frames)
//! - Device timestamps converted to host wall-clock time
//! - Event-driven receive waits on Windows, deadline polling elsewhere
//! - Batched non-blocking reads
//! - [`embedded_can`] frame and blocking traits
//!
//! # Example
//!
//! ```no_run
//! use sie_can::{constants::canfox, CanFrame, ChannelOptions, SieCan};
//! use std::time::Duration;
//!
//! fn main() -> sie_can::Result<()> {
//!     // Open the first CANfox channel at 250 kbps
//!     let mut can = SieCan::open_shared(canfox::CAN1, ChannelOptions::new().bitrate(250_000))?;
//!
//!     // Send a frame
//!     let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
//!     let frame = CanFrame::with_data(0x7FF, false, &data)?;
//!     can.send(&frame)?;
//!
//!     // Read frames
//!     loop {
//!         if let Some(frame) = can.read(Some(Duration::from_millis(100)))? {
//!             println!("RX  {}", frame);
//!         }
//!     }
//! }
//! ```
//!
//! # Platform
//!
//! The vendor library exists only as a 32-bit Windows DLL. On any other
//! target, opening a channel fails with [`SieCanError::UnsupportedPlatform`]
//! and device enumeration returns an empty list.

pub mod api;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod receive;
pub mod structures;
pub mod timestamp;
pub mod wait;

#[cfg(test)]
mod fake;

// Re-export main types at crate root
pub use constants::{
    bitrate_code,
    is_canusb_net,
    status_name,
    // CAN ID masks
    CAN_EFF_MASK,
    CAN_MAX_DLEN,
    CAN_SFF_MASK,
    FilterMode,
    // Record flags
    MSG_FLAG_ERROR,
    MSG_FLAG_EXTENDED,
    MSG_FLAG_REMOTE,
    MSG_FLAG_STANDARD,
    MSG_LEN_MASK,
    // Status codes
    NTCAN_CONTR_BUSOFF,
    NTCAN_GET_MUTEX_FAILED,
    NTCAN_RX_TIMEOUT,
    NTCAN_SUCCESS,
    NTCAN_TX_TIMEOUT,
};

pub use api::{ApiHandle, CanApi, Sieca132};
pub use device::{detect_available_channels, scan, ChannelOptions, SieCan};
pub use error::{InitStep, Result, SieCanError};
pub use frame::CanFrame;
pub use structures::{CanIfStatus, CanMsg, DeviceListEntry};
pub use timestamp::TimestampAnchor;
pub use wait::{Completion, CompletionStrategy, WaitOutcome};
