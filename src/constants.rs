//! SIE MT_API constants
//!
//! This module contains the status codes returned by the vendor library,
//! the bitrate and filter-mode codes, and the net numbers of every
//! supported adapter family.

// ============================================================================
// Status Codes (return value of every MT_API call)
// ============================================================================

/// Call succeeded
pub const NTCAN_SUCCESS: i32 = 0;
/// No frame was available within the receive timeout
pub const NTCAN_RX_TIMEOUT: i32 = -1;
/// Frame could not be transmitted within the transmit timeout
pub const NTCAN_TX_TIMEOUT: i32 = -2;
/// CAN controller is bus-off
pub const NTCAN_CONTR_BUSOFF: i32 = -3;
/// No identifier enabled for reception
pub const NTCAN_NO_ID_ENABLED: i32 = -4;
/// Identifier already enabled
pub const NTCAN_ID_ALREADY_ENABLED: i32 = -5;
/// Identifier not enabled
pub const NTCAN_ID_NOT_ENABLED: i32 = -6;
/// Invalid parameter
pub const NTCAN_INVALID_PARAMETER: i32 = -7;
/// Invalid handle
pub const NTCAN_INVALID_HANDLE: i32 = -8;
/// Too many open handles
pub const NTCAN_TOO_MANY_HANDLES: i32 = -9;
/// Initialisation error
pub const NTCAN_INIT_ERROR: i32 = -10;
/// Reset error
pub const NTCAN_RESET_ERROR: i32 = -11;
/// Driver error
pub const NTCAN_DRIVER_ERROR: i32 = -12;
/// DLL already initialised
pub const NTCAN_DLL_ALREADY_INIT: i32 = -13;
/// Channel not initialised
pub const NTCAN_CHANNEL_NOT_INITIALIZED: i32 = -14;
/// Transmit error
pub const NTCAN_TX_ERROR: i32 = -15;
/// No shared memory
pub const NTCAN_NO_SHAREDMEMORY: i32 = -16;
/// Hardware not found
pub const NTCAN_HARDWARE_NOT_FOUND: i32 = -17;
/// Invalid net number
pub const NTCAN_INVALID_NETNUMBER: i32 = -18;
/// Too many J2534 ranges
pub const NTCAN_TOO_MANY_J2534_RANGES: i32 = -19;
/// Too many J2534-2 filters
pub const NTCAN_TOO_MANY_J2534_2_FILTERS: i32 = -20;
/// Driver not installed
pub const NTCAN_DRIVER_NOT_INSTALLED: i32 = -21;
/// Caller does not own the net
pub const NTCAN_NO_OWNER_RIGHTS: i32 = -22;
/// Firmware too old
pub const NTCAN_FIRMWARE_TOO_OLD: i32 = -23;
/// Firmware unsupported
pub const NTCAN_FIRMWARE_UNSUPPORTED: i32 = -24;
/// Firmware update failed
pub const NTCAN_FIRMWAREUPDATE_FAILED: i32 = -25;
/// Hardware not supported
pub const NTCAN_HARDWARE_NOT_SUPPORTED: i32 = -26;
/// File not found
pub const NTCAN_FILE_NOT_FOUND: i32 = -27;
/// Device info not available
pub const NTCAN_DEVICE_INFO_NOTAVAILABLE: i32 = -100;
/// Device has no hardware address
pub const NTCAN_DEVICE_NOHW_ADDRESS: i32 = -101;
/// No interrupt event
pub const NTCAN_NO_INTERRUPT_EVENT: i32 = -102;
/// Interrupt event not set
pub const NTCAN_NO_INTERRUPT_EVENT_SET: i32 = -103;
/// Driver-internal mutex could not be taken (transient)
pub const NTCAN_GET_MUTEX_FAILED: i32 = -104;
/// No shared memory
pub const NTCAN_NO_SHARED_MEMORY: i32 = -105;
/// Net not available
pub const NTCAN_NET_NOT_AVAILABLE: i32 = -106;
/// Setting the baudrate timed out
pub const NTCAN_SETBAUDRATE_TIMEOUT: i32 = -107;
/// Driver executable already started
pub const NTCAN_EXE_ALREADYSTARTED: i32 = -108;
/// Shared memory could not be created
pub const NTCAN_NOTABLE_TOCREATE_SHAREDMEMORY: i32 = -109;
/// Hardware in use by another application
pub const NTCAN_HARDWARE_IN_USE: i32 = -110;
/// API not running
pub const NTCAN_API_NOT_RUNNING: i32 = -111;
/// Channel currently not available
pub const NTCAN_CHANNEL_CURR_NOT_AVAILABLE: i32 = -112;
/// Buffer too small
pub const NTCAN_BUFFER_TOO_SMALL: i32 = -113;
/// Too many bridge filters
pub const NTCAN_TOO_MANY_BRIDGE_FILTER: i32 = -114;
/// Hardware not active
pub const NTCAN_HARDWARENOTACTIVE: i32 = -200;
/// Too many applications
pub const NTCAN_TOO_MANY_APPLICATIONS: i32 = -201;
/// Flushing the transmit buffer timed out
pub const NTCAN_FLUSH_TIMEOUT: i32 = -202;
/// Generic failure
pub const NTCAN_NOSUCCESS: i32 = 0xFFFF_0000_u32 as i32;

/// Get human-readable name for a status code
pub fn status_name(code: i32) -> &'static str {
    match code {
        NTCAN_SUCCESS => "SUCCESS",
        NTCAN_RX_TIMEOUT => "RX_TIMEOUT",
        NTCAN_TX_TIMEOUT => "TX_TIMEOUT",
        NTCAN_CONTR_BUSOFF => "CONTR_BUSOFF",
        NTCAN_NO_ID_ENABLED => "NO_ID_ENABLED",
        NTCAN_ID_ALREADY_ENABLED => "ID_ALREADY_ENABLED",
        NTCAN_ID_NOT_ENABLED => "ID_NOT_ENABLED",
        NTCAN_INVALID_PARAMETER => "INVALID_PARAMETER",
        NTCAN_INVALID_HANDLE => "INVALID_HANDLE",
        NTCAN_TOO_MANY_HANDLES => "TOO_MANY_HANDLES",
        NTCAN_INIT_ERROR => "INIT_ERROR",
        NTCAN_RESET_ERROR => "RESET_ERROR",
        NTCAN_DRIVER_ERROR => "DRIVER_ERROR",
        NTCAN_DLL_ALREADY_INIT => "DLL_ALREADY_INIT",
        NTCAN_CHANNEL_NOT_INITIALIZED => "CHANNEL_NOT_INITIALIZED",
        NTCAN_TX_ERROR => "TX_ERROR",
        NTCAN_NO_SHAREDMEMORY => "NO_SHAREDMEMORY",
        NTCAN_HARDWARE_NOT_FOUND => "HARDWARE_NOT_FOUND",
        NTCAN_INVALID_NETNUMBER => "INVALID_NETNUMBER",
        NTCAN_TOO_MANY_J2534_RANGES => "TOO_MANY_J2534_RANGES",
        NTCAN_TOO_MANY_J2534_2_FILTERS => "TOO_MANY_J2534_2_FILTERS",
        NTCAN_DRIVER_NOT_INSTALLED => "DRIVER_NOT_INSTALLED",
        NTCAN_NO_OWNER_RIGHTS => "NO_OWNER_RIGHTS",
        NTCAN_FIRMWARE_TOO_OLD => "FIRMWARE_TOO_OLD",
        NTCAN_FIRMWARE_UNSUPPORTED => "FIRMWARE_UNSUPPORTED",
        NTCAN_FIRMWAREUPDATE_FAILED => "FIRMWAREUPDATE_FAILED",
        NTCAN_HARDWARE_NOT_SUPPORTED => "HARDWARE_NOT_SUPPORTED",
        NTCAN_FILE_NOT_FOUND => "FILE_NOT_FOUND",
        NTCAN_DEVICE_INFO_NOTAVAILABLE => "DEVICE_INFO_NOTAVAILABLE",
        NTCAN_DEVICE_NOHW_ADDRESS => "DEVICE_NOHW_ADDRESS",
        NTCAN_NO_INTERRUPT_EVENT => "NO_INTERRUPT_EVENT",
        NTCAN_NO_INTERRUPT_EVENT_SET => "NO_INTERRUPT_EVENT_SET",
        NTCAN_GET_MUTEX_FAILED => "GET_MUTEX_FAILED",
        NTCAN_NO_SHARED_MEMORY => "NO_SHARED_MEMORY",
        NTCAN_NET_NOT_AVAILABLE => "NET_NOT_AVAILABLE",
        NTCAN_SETBAUDRATE_TIMEOUT => "SETBAUDRATE_TIMEOUT",
        NTCAN_EXE_ALREADYSTARTED => "EXE_ALREADYSTARTED",
        NTCAN_NOTABLE_TOCREATE_SHAREDMEMORY => "NOTABLE_TOCREATE_SHAREDMEMORY",
        NTCAN_HARDWARE_IN_USE => "HARDWARE_IN_USE",
        NTCAN_API_NOT_RUNNING => "API_NOT_RUNNING",
        NTCAN_CHANNEL_CURR_NOT_AVAILABLE => "CHANNEL_CURR_NOT_AVAILABLE",
        NTCAN_BUFFER_TOO_SMALL => "BUFFER_TOO_SMALL",
        NTCAN_TOO_MANY_BRIDGE_FILTER => "TOO_MANY_BRIDGE_FILTER",
        NTCAN_HARDWARENOTACTIVE => "HARDWARENOTACTIVE",
        NTCAN_TOO_MANY_APPLICATIONS => "TOO_MANY_APPLICATIONS",
        NTCAN_FLUSH_TIMEOUT => "FLUSH_TIMEOUT",
        NTCAN_NOSUCCESS => "NOSUCCESS",
        _ => "UNKNOWN",
    }
}

// ============================================================================
// Frame Record Flags
// ============================================================================

/// Low nibble of the length byte carries the data length
pub const MSG_LEN_MASK: u8 = 0x0F;
/// Extended (29-bit) identifier, in the `by_extended` byte
pub const MSG_FLAG_EXTENDED: u8 = 1 << 1;
/// Standard (11-bit) identifier marker written on transmit
pub const MSG_FLAG_STANDARD: u8 = 1 << 0;
/// Error frame, in the `by_extended` byte
pub const MSG_FLAG_ERROR: u8 = 1 << 6;
/// Remote transmission request, in the `by_remote` byte
pub const MSG_FLAG_REMOTE: u8 = 1 << 0;

/// Maximum data length for classic CAN
pub const CAN_MAX_DLEN: usize = 8;

/// Standard frame format mask (11-bit ID)
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
/// Extended frame format mask (29-bit ID)
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

// ============================================================================
// Timing
// ============================================================================

/// Hardware ticks per second (one tick is a tenth of a millisecond)
pub const TICKS_PER_SECOND: f64 = 10_000.0;

/// Sleep between polls when no native receive event exists
pub const POLL_INTERVAL_MS: u64 = 1;

/// Driver timeout used when flushing the transmit buffer
pub const FLUSH_TIMEOUT_MS: i32 = 10_000;

/// Driver timeout value meaning "use the driver default"
pub const DRIVER_DEFAULT_TIMEOUT: i32 = -1;

// ============================================================================
// Bitrates
// ============================================================================

/// Vendor bitrate codes, indexed by bits per second
pub const BITRATES: [(u32, i32); 8] = [
    (1_000_000, 0),
    (800_000, 1),
    (500_000, 2),
    (250_000, 3),
    (125_000, 4),
    (100_000, 5),
    (50_000, 6),
    (25_000, 7),
];

/// Look up the vendor code for a bitrate in bits per second
pub fn bitrate_code(bitrate: u32) -> Option<i32> {
    BITRATES
        .iter()
        .find(|(bps, _)| *bps == bitrate)
        .map(|(_, code)| *code)
}

// ============================================================================
// Filter Modes (T_FILTER_MODE)
// ============================================================================

/// Acceptance filter modes understood by `canSetFilterMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FilterMode {
    /// Standard identifier filter
    Standard = 0,
    /// J2534 range filter
    J2534 = 1,
    /// Extended identifier filter
    Extended = 2,
    /// J2534-2 filter
    J2534_2 = 3,
    /// All frames pass
    NoFilter = 4,
}

impl FilterMode {
    /// Raw code passed to the driver
    pub fn code(self) -> i32 {
        self as i32
    }
}

// ============================================================================
// Net Numbers
// ============================================================================

/// CANAS
pub mod canas {
    pub const CAN1: i32 = 0;
    pub const CAN2: i32 = 1;
}

/// CANfox (single channel)
pub mod canfox {
    pub const CAN1: i32 = 105;
}

/// CANUSB
pub mod canusb {
    pub const CAN1: i32 = 21;
    pub const CAN2: i32 = 22;
}

/// CANUSB, legacy driver numbering
pub mod canusb_legacy {
    pub const CAN1: i32 = 24;
    pub const CAN2: i32 = 25;
}

/// MobiCAN
pub mod mobican {
    pub const CAN1: i32 = 90;
    pub const CAN2: i32 = 91;
}

/// PC104+
pub mod pc104_plus {
    pub const CAN1: i32 = 0;
    pub const CAN2: i32 = 1;
}

/// PowerPCI and PowerPCI V2
pub mod power_pci {
    pub const CAN1: i32 = 0;
    pub const CAN2: i32 = 1;
}

/// Virtual devices 1 to 5, each with two nets
pub mod virtual_device {
    pub const DEVICE_1: [i32; 2] = [27, 28];
    pub const DEVICE_2: [i32; 2] = [30, 31];
    pub const DEVICE_3: [i32; 2] = [33, 34];
    pub const DEVICE_4: [i32; 2] = [36, 37];
    pub const DEVICE_5: [i32; 2] = [39, 40];
}

/// Check whether a net belongs to a CANUSB adapter
pub fn is_canusb_net(net: i32) -> bool {
    matches!(
        net,
        canusb::CAN1 | canusb::CAN2 | canusb_legacy::CAN1 | canusb_legacy::CAN2
    )
}
