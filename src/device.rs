//! SIE CAN channel implementation
//!
//! This module provides the `SieCan` struct, one open channel ("net") on a
//! Sontheim adapter, along with device enumeration.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::{ApiHandle, CanApi, Sieca132};
use crate::constants::*;
use crate::error::{InitStep, Result, SieCanError};
use crate::frame::CanFrame;
use crate::receive::{receive_many, receive_one};
use crate::structures::{CanIfStatus, DeviceListEntry};
use crate::timestamp::TimestampAnchor;
use crate::wait::{event::EventObject, CompletionStrategy};

/// Channel configuration applied when opening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Bitrate in bits per second
    pub bitrate: u32,
    /// Acceptance filter mode
    pub filter_mode: FilterMode,
    /// Deliver error frames
    pub errors: bool,
    /// Echo transmitted frames back to the receive buffer
    pub echo: bool,
    /// Driver transmit timeout in milliseconds (-1 = driver default)
    pub tx_timeout: i32,
    /// Driver receive timeout in milliseconds (-1 = driver default)
    pub rx_timeout: i32,
    /// Application name registered with the driver
    pub app_name: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            bitrate: 500_000,
            filter_mode: FilterMode::NoFilter,
            errors: true,
            echo: false,
            tx_timeout: DRIVER_DEFAULT_TIMEOUT,
            rx_timeout: DRIVER_DEFAULT_TIMEOUT,
            app_name: "sie_can".to_string(),
        }
    }
}

impl ChannelOptions {
    /// Default options: 500 kbps, no filter, error frames on, echo off
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bitrate in bits per second
    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Set the acceptance filter mode
    pub fn filter_mode(mut self, filter_mode: FilterMode) -> Self {
        self.filter_mode = filter_mode;
        self
    }

    /// Enable or disable error frame delivery
    pub fn errors(mut self, errors: bool) -> Self {
        self.errors = errors;
        self
    }

    /// Enable or disable echo of transmitted frames
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set the driver transmit timeout in milliseconds
    pub fn tx_timeout(mut self, millis: i32) -> Self {
        self.tx_timeout = millis;
        self
    }

    /// Set the driver receive timeout in milliseconds
    pub fn rx_timeout(mut self, millis: i32) -> Self {
        self.rx_timeout = millis;
        self
    }

    /// Set the application name registered with the driver
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }
}

/// Open SIE CAN channel
///
/// Owns the driver handle and the timestamp anchor captured at open. A
/// channel is meant to be used from one thread at a time.
///
/// # Example
///
/// ```no_run
/// use sie_can::{constants::canfox, CanFrame, ChannelOptions, SieCan};
/// use std::time::Duration;
///
/// let mut can = SieCan::open_shared(canfox::CAN1, ChannelOptions::new().bitrate(250_000))?;
///
/// let frame = CanFrame::with_data(0x123, false, &[0x01, 0x02, 0x03, 0x04])?;
/// can.send(&frame)?;
///
/// loop {
///     if let Some(frame) = can.read(Some(Duration::from_millis(100)))? {
///         println!("RX: {}", frame);
///     }
/// }
/// # Ok::<(), sie_can::SieCanError>(())
/// ```
pub struct SieCan<A: CanApi> {
    /// Vendor library
    api: A,
    /// Net number
    net: i32,
    /// Driver handle, `None` once closed
    handle: Option<ApiHandle>,
    /// Host/device time pair captured at open
    anchor: TimestampAnchor,
    /// How blocking reads wait for data
    completion: CompletionStrategy,
    /// Error event registered with the driver, kept alive with the channel
    _error_event: Option<EventObject>,
    /// Options the channel was opened with
    options: ChannelOptions,
}

impl SieCan<Arc<Sieca132>> {
    /// Open a channel through the process-wide vendor library
    pub fn open_shared(net: i32, options: ChannelOptions) -> Result<Self> {
        Self::open(Sieca132::shared()?, net, options)
    }
}

impl<A: CanApi> SieCan<A> {
    /// Open and configure a channel
    ///
    /// Uses a native receive event when the platform has one, polling
    /// otherwise.
    ///
    /// # Arguments
    /// * `api` - Vendor library
    /// * `net` - Net number (see [`constants`](crate::constants))
    /// * `options` - Channel configuration
    pub fn open(api: A, net: i32, options: ChannelOptions) -> Result<Self> {
        let completion = CompletionStrategy::select(&rx_event_name(net))?;
        Self::open_with(api, net, options, completion)
    }

    /// Open and configure a channel with an explicit completion strategy
    pub fn open_with(
        api: A,
        net: i32,
        options: ChannelOptions,
        completion: CompletionStrategy,
    ) -> Result<Self> {
        let bitrate_code =
            bitrate_code(options.bitrate).ok_or(SieCanError::UnsupportedBitrate(options.bitrate))?;

        let error_event = if completion.is_event() {
            Some(EventObject::create(&err_event_name(net))?)
        } else {
            None
        };

        let mut handle = ApiHandle::default();
        let code = api.open(
            net,
            options.errors,
            options.echo,
            options.tx_timeout,
            options.rx_timeout,
            &options.app_name,
            &rx_event_name(net),
            &err_event_name(net),
            &mut handle,
        );
        if code != NTCAN_SUCCESS {
            return Err(SieCanError::Init {
                step: InitStep::Open,
                code,
            });
        }

        let configured = Self::configure(&api, handle, bitrate_code, options.filter_mode)
            .and_then(|()| {
                read_device_tick(&api).map_err(|code| SieCanError::Init {
                    step: InitStep::SystemTime,
                    code,
                })
            });
        let device_tick = match configured {
            Ok(tick) => tick,
            Err(e) => {
                api.close(handle);
                return Err(e);
            }
        };
        let anchor = TimestampAnchor::capture(device_tick);

        log::debug!(
            "Opened net {} at {} bit/s (event wait: {})",
            net,
            options.bitrate,
            completion.is_event()
        );

        Ok(Self {
            api,
            net,
            handle: Some(handle),
            anchor,
            completion,
            _error_event: error_event,
            options,
        })
    }

    fn configure(api: &A, handle: ApiHandle, bitrate_code: i32, filter: FilterMode) -> Result<()> {
        let code = api.set_baudrate(handle, bitrate_code);
        if code != NTCAN_SUCCESS {
            return Err(SieCanError::Init {
                step: InitStep::Bitrate,
                code,
            });
        }

        let code = api.set_filter_mode(handle, filter.code());
        if code != NTCAN_SUCCESS {
            return Err(SieCanError::Init {
                step: InitStep::FilterMode,
                code,
            });
        }

        Ok(())
    }

    fn handle(&self) -> Result<ApiHandle> {
        self.handle.ok_or(SieCanError::ChannelClosed)
    }

    /// Send a CAN frame
    ///
    /// Blocks for at most the channel's transmit timeout.
    pub fn send(&mut self, frame: &CanFrame) -> Result<()> {
        let record = frame.encode()?;
        let handle = self.handle()?;

        match self.api.send(handle, &record) {
            NTCAN_SUCCESS => Ok(()),
            NTCAN_TX_TIMEOUT => Err(SieCanError::SendTimeout),
            code => Err(SieCanError::Bus { op: "send", code }),
        }
    }

    /// Read a CAN frame
    ///
    /// # Arguments
    /// * `timeout` - How long to wait for a frame, `None` to wait forever
    ///
    /// # Returns
    /// The received frame, or `None` if the timeout elapsed first
    pub fn read(&mut self, timeout: Option<Duration>) -> Result<Option<CanFrame>> {
        let handle = self.handle()?;
        let mut wait = self.completion.begin(timeout);
        receive_one(&self.api, handle, &self.anchor, &mut wait)
    }

    /// Read up to `max_count` frames already buffered by the driver
    pub fn read_many(&mut self, max_count: usize) -> Result<Vec<CanFrame>> {
        let handle = self.handle()?;
        receive_many(&self.api, handle, &self.anchor, max_count)
    }

    /// Get the interface status snapshot
    pub fn status(&self) -> Result<CanIfStatus> {
        let handle = self.handle()?;
        let mut status = CanIfStatus::default();
        match self.api.status(handle, &mut status) {
            NTCAN_SUCCESS => Ok(status),
            code => Err(SieCanError::Bus { op: "status", code }),
        }
    }

    /// Read the device tick counter (tenths of a millisecond)
    pub fn device_tick(&self) -> Result<u64> {
        read_device_tick(&self.api).map_err(|code| SieCanError::Bus {
            op: "system time",
            code,
        })
    }

    /// Wait until every queued frame has been transmitted
    ///
    /// Only CANUSB adapters support this.
    pub fn flush_tx_buffer(&mut self) -> Result<()> {
        if !is_canusb_net(self.net) {
            return Err(SieCanError::FlushNotSupported { net: self.net });
        }
        let handle = self.handle()?;

        match self.api.flush(handle, FLUSH_TIMEOUT_MS) {
            NTCAN_SUCCESS => Ok(()),
            NTCAN_TX_TIMEOUT | NTCAN_FLUSH_TIMEOUT => Err(SieCanError::FlushTimeout),
            code => Err(SieCanError::Bus { op: "flush", code }),
        }
    }

    /// Discard every frame in the adapter's receive buffer
    pub fn clear_rx_buffer(&mut self) -> Result<()> {
        let handle = self.handle()?;
        match self.api.clear_buffer(handle) {
            NTCAN_SUCCESS => Ok(()),
            code => Err(SieCanError::Bus {
                op: "clear buffer",
                code,
            }),
        }
    }

    /// Blink the adapter LED for roughly `duration`, then switch it off
    pub fn blink_led(&mut self, duration: Duration) -> Result<()> {
        let handle = self.handle()?;
        let toggles = (duration.as_millis() / 250) as u32 + 1;

        for i in 0..toggles {
            self.api.blink_led(handle, 1, i % 2, 5);
            thread::sleep(Duration::from_millis(250));
        }

        match self.api.blink_led(handle, 0, (toggles - 1) % 2, 5) {
            NTCAN_SUCCESS => Ok(()),
            code => Err(SieCanError::Bus {
                op: "blink LED",
                code,
            }),
        }
    }

    /// Close the channel
    ///
    /// Closing an already closed channel does nothing.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            let code = self.api.close(handle);
            if code != NTCAN_SUCCESS {
                // The handle is gone either way
                log::warn!("Closing net {} returned {}", self.net, status_name(code));
            }
            log::debug!("Closed net {}", self.net);
        }
        Ok(())
    }

    /// Whether the channel is still open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Net number of this channel
    pub fn net(&self) -> i32 {
        self.net
    }

    /// Timestamp anchor captured at open
    pub fn anchor(&self) -> &TimestampAnchor {
        &self.anchor
    }

    /// Options the channel was opened with
    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }
}

impl<A: CanApi> embedded_can::blocking::Can for SieCan<A> {
    type Frame = CanFrame;
    type Error = SieCanError;

    fn transmit(&mut self, frame: &Self::Frame) -> Result<()> {
        self.send(frame)
    }

    fn receive(&mut self) -> Result<Self::Frame> {
        loop {
            if let Some(frame) = self.read(None)? {
                return Ok(frame);
            }
        }
    }
}

impl<A: CanApi> std::fmt::Display for SieCan<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SIE CAN net {} ({} bit/s)", self.net, self.options.bitrate)
    }
}

impl<A: CanApi> std::fmt::Debug for SieCan<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SieCan")
            .field("net", &self.net)
            .field("open", &self.is_open())
            .field("anchor", &self.anchor)
            .field("completion", &self.completion)
            .field("options", &self.options)
            .finish()
    }
}

impl<A: CanApi> Drop for SieCan<A> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn rx_event_name(net: i32) -> String {
    format!("SieCanRx{}", net)
}

fn err_event_name(net: i32) -> String {
    format!("SieCanErr{}", net)
}

fn read_device_tick<A: CanApi + ?Sized>(api: &A) -> std::result::Result<u64, i32> {
    let mut now = 0u64;
    let mut start = 0u64;
    match api.system_time(&mut now, &mut start) {
        NTCAN_SUCCESS => Ok(now),
        code => Err(code),
    }
}

/// List installed devices
///
/// A failing query yields an empty list.
pub fn scan<A: CanApi + ?Sized>(api: &A) -> Vec<DeviceListEntry> {
    let mut entry = DeviceListEntry::default();
    match api.device_list(&mut entry) {
        NTCAN_SUCCESS => vec![entry],
        code => {
            log::debug!("Device list query failed: {}", status_name(code));
            Vec::new()
        }
    }
}

/// List installed devices through the process-wide vendor library
///
/// Returns an empty list when the library is unavailable.
pub fn detect_available_channels() -> Vec<DeviceListEntry> {
    match Sieca132::shared() {
        Ok(lib) => scan(&*lib),
        Err(_) => Vec::new(),
    }
}
