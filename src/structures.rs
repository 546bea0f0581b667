//! MT_API record structures
//!
//! This module contains the fixed-layout records exchanged with the
//! vendor library: the frame record, the interface status snapshot and
//! the installed-device record.

use crate::constants::{CAN_MAX_DLEN, MSG_LEN_MASK};

/// Wire frame record (`CMSG`)
///
/// Exchanged verbatim with the driver on send and receive. Use
/// [`CanFrame`](crate::CanFrame) for anything beyond passing it across
/// the library boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanMsg {
    /// CAN identifier
    pub l_id: i32,
    /// Low nibble: data length. High nibble: reserved.
    pub by_len: u8,
    /// Lost-message counter
    pub by_msg_lost: u8,
    /// Flag byte: bit 1 extended identifier, bit 6 error frame
    pub by_extended: u8,
    /// Flag byte: bit 0 remote frame
    pub by_remote: u8,
    /// Frame data, always eight bytes
    pub aby_data: [u8; CAN_MAX_DLEN],
    /// Hardware timestamp in tenths of a millisecond
    pub ul_tstamp: u32,
}

impl CanMsg {
    /// Data length carried in the low nibble of the length byte
    pub fn data_length(&self) -> usize {
        (self.by_len & MSG_LEN_MASK) as usize
    }
}

/// Interface status snapshot (`CAN_IF_STATUS`)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CanIfStatus {
    /// Hardware revision
    pub w_hw_rev: u16,
    /// Firmware revision
    pub w_fw_rev: u16,
    /// Driver revision
    pub w_drv_rev: u16,
    /// DLL revision
    pub w_dll_rev: u16,
    /// Board status bitfield
    pub ul_board_status: u32,
    /// Board identifier
    pub by_board_id: u8,
    /// Bus-off counter
    pub w_busoffctr: u16,
    /// Error flags
    pub w_errorflag: u16,
    /// Error frame counter
    pub w_errorframectr: u16,
    /// Net counter
    pub w_netctr: u16,
    /// Configured baud code
    pub w_baud: u16,
    /// EPLD revision
    pub ui_epld_rev: u32,
}

impl std::fmt::Display for CanIfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HW Rev: 0x{:04x}\nFW Rev: 0x{:04x}\nDriver Rev: 0x{:04x}\nDLL Rev: 0x{:04x}\n\
             Board Status: 0x{:08x}\nBus-Off Counter: {}\nError Flags: 0x{:04x}\n\
             Error Frame Counter: {}\nBaud: {}",
            self.w_hw_rev,
            self.w_fw_rev,
            self.w_drv_rev,
            self.w_dll_rev,
            self.ul_board_status,
            self.w_busoffctr,
            self.w_errorflag,
            self.w_errorframectr,
            self.w_baud
        )
    }
}

/// Installed device record (`T_DeviceList`)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceListEntry {
    /// Net number of the device
    pub net: i32,
    /// NUL-padded device name
    pub name: [u8; 20],
    /// Device status
    pub ul_status: u32,
    /// Feature bitfield
    pub ul_features: u32,
    /// Reserved
    pub reserved: [i32; 18],
}

impl DeviceListEntry {
    /// Device name up to the first NUL byte
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

impl std::fmt::Display for DeviceListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Net: {}\nName: {}\nStatus: 0x{:08x}\nFeatures: 0x{:08x}",
            self.net,
            self.name(),
            self.ul_status,
            self.ul_features
        )
    }
}
