//! SIE CAN frame implementation
//!
//! This module provides the `CanFrame` struct, the normalized form of a
//! classic CAN frame, and its conversion to and from the driver's
//! [`CanMsg`] record.

use embedded_can::{ExtendedId, Id, StandardId};

use crate::constants::{
    CAN_EFF_MASK, CAN_MAX_DLEN, CAN_SFF_MASK, MSG_FLAG_ERROR, MSG_FLAG_EXTENDED,
    MSG_FLAG_REMOTE, MSG_FLAG_STANDARD,
};
use crate::error::{Result, SieCanError};
use crate::structures::CanMsg;

/// Classic CAN frame
///
/// Only the first `data_length` bytes of `data` are meaningful. The
/// timestamp is host time in seconds once the frame has passed through
/// a channel's receive path, and zero otherwise.
#[derive(Clone, Copy, PartialEq)]
pub struct CanFrame {
    /// CAN identifier, 11 or 29 significant bits
    pub arbitration_id: u32,
    /// 29-bit identifier
    pub is_extended: bool,
    /// Remote transmission request
    pub is_remote: bool,
    /// Error frame reported by the hardware
    pub is_error: bool,
    /// Number of valid bytes in `data` (0..=8)
    pub data_length: usize,
    /// Frame data
    pub data: [u8; CAN_MAX_DLEN],
    /// Host timestamp in seconds
    pub timestamp: f64,
}

impl Default for CanFrame {
    fn default() -> Self {
        Self {
            arbitration_id: 0,
            is_extended: false,
            is_remote: false,
            is_error: false,
            data_length: 0,
            data: [0u8; CAN_MAX_DLEN],
            timestamp: 0.0,
        }
    }
}

impl CanFrame {
    /// Create a data frame
    ///
    /// # Arguments
    /// * `arbitration_id` - CAN identifier
    /// * `is_extended` - Use a 29-bit identifier
    /// * `data` - Frame data (up to 8 bytes)
    pub fn with_data(arbitration_id: u32, is_extended: bool, data: &[u8]) -> Result<Self> {
        if data.len() > CAN_MAX_DLEN {
            return Err(SieCanError::InvalidFrame { length: data.len() });
        }

        let mut frame = Self {
            arbitration_id,
            is_extended,
            data_length: data.len(),
            ..Default::default()
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Create a remote transmission request
    pub fn remote(arbitration_id: u32, is_extended: bool, dlc: usize) -> Result<Self> {
        if dlc > CAN_MAX_DLEN {
            return Err(SieCanError::InvalidFrame { length: dlc });
        }

        Ok(Self {
            arbitration_id,
            is_extended,
            is_remote: true,
            data_length: dlc,
            ..Default::default()
        })
    }

    /// Frame data as a slice
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_length.min(CAN_MAX_DLEN)]
    }

    /// Decode a driver record
    ///
    /// The high nibble of the length byte and the lost-message counter
    /// are discarded. The timestamp is left at zero; the record's tick
    /// count must be reconciled against the channel's anchor.
    pub fn decode(record: &CanMsg) -> Self {
        let data_length = record.data_length().min(CAN_MAX_DLEN);

        let mut frame = Self {
            arbitration_id: record.l_id as u32,
            is_extended: record.by_extended & MSG_FLAG_EXTENDED != 0,
            is_remote: record.by_remote & MSG_FLAG_REMOTE != 0,
            is_error: record.by_extended & MSG_FLAG_ERROR != 0,
            data_length,
            ..Default::default()
        };
        frame.data[..data_length].copy_from_slice(&record.aby_data[..data_length]);
        frame
    }

    /// Encode into a driver record for transmission
    ///
    /// The error flag is never transmitted.
    pub fn encode(&self) -> Result<CanMsg> {
        if self.data_length > CAN_MAX_DLEN {
            return Err(SieCanError::InvalidFrame {
                length: self.data_length,
            });
        }

        let mut record = CanMsg {
            l_id: self.arbitration_id as i32,
            by_len: self.data_length as u8,
            by_extended: if self.is_extended {
                MSG_FLAG_EXTENDED
            } else {
                MSG_FLAG_STANDARD
            },
            by_remote: if self.is_remote { MSG_FLAG_REMOTE } else { 0 },
            ..Default::default()
        };
        record.aby_data[..self.data_length].copy_from_slice(&self.data[..self.data_length]);
        Ok(record)
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let (raw, extended) = split_id(id.into());
        Self::with_data(raw, extended, data).ok()
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        let (raw, extended) = split_id(id.into());
        Self::remote(raw, extended, dlc).ok()
    }

    fn is_extended(&self) -> bool {
        self.is_extended
    }

    fn is_remote_frame(&self) -> bool {
        self.is_remote
    }

    fn id(&self) -> Id {
        if self.is_extended {
            Id::Extended(
                ExtendedId::new(self.arbitration_id & CAN_EFF_MASK).unwrap_or(ExtendedId::ZERO),
            )
        } else {
            Id::Standard(
                StandardId::new((self.arbitration_id & CAN_SFF_MASK) as u16)
                    .unwrap_or(StandardId::ZERO),
            )
        }
    }

    fn dlc(&self) -> usize {
        self.data_length
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}

fn split_id(id: Id) -> (u32, bool) {
    match id {
        Id::Standard(id) => (id.as_raw() as u32, false),
        Id::Extended(id) => (id.as_raw(), true),
    }
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match (self.is_error, self.is_extended) {
            (true, _) => " ERR",
            (false, true) => " EXT",
            (false, false) => "",
        };

        let data_str = if self.is_remote {
            "remote request".to_string()
        } else {
            self.data()
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        };

        write!(
            f,
            "{:>8X}{}   [{}]  {}",
            self.arbitration_id, kind, self.data_length, data_str
        )
    }
}

impl std::fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanFrame")
            .field("arbitration_id", &format_args!("0x{:08X}", self.arbitration_id))
            .field("is_extended", &self.is_extended)
            .field("is_remote", &self.is_remote)
            .field("is_error", &self.is_error)
            .field("data", &self.data())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
