//! Vendor library access
//!
//! [`CanApi`] is the boundary to the SIE MT_API: one method per library
//! call, each returning the raw `NTCAN_*` status code. Channels take it as
//! an explicit dependency, so the receive and send paths can run against
//! any implementation.
//!
//! [`Sieca132`] is the real implementation. It loads `SIECA132.dll` at
//! runtime and is only available to 32-bit Windows processes; everywhere
//! else loading fails with [`SieCanError::UnsupportedPlatform`].

use std::sync::{Arc, OnceLock};

use crate::error::{Result, SieCanError};
use crate::structures::{CanIfStatus, CanMsg, DeviceListEntry};

/// Opaque channel handle issued by `canOpen`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiHandle(pub usize);

/// MT_API calls used by this crate
///
/// Every method returns the status code of the underlying call.
pub trait CanApi {
    /// `canOpen`
    #[allow(clippy::too_many_arguments)]
    fn open(
        &self,
        net: i32,
        errors: bool,
        echo: bool,
        tx_timeout: i32,
        rx_timeout: i32,
        app_name: &str,
        rx_event: &str,
        err_event: &str,
        handle: &mut ApiHandle,
    ) -> i32;

    /// `canClose`
    fn close(&self, handle: ApiHandle) -> i32;

    /// `canSetBaudrate`
    fn set_baudrate(&self, handle: ApiHandle, code: i32) -> i32;

    /// `canSetFilterMode`
    fn set_filter_mode(&self, handle: ApiHandle, mode: i32) -> i32;

    /// `canSend` with a single record
    fn send(&self, handle: ApiHandle, msg: &CanMsg) -> i32;

    /// `canReadNoWait`
    ///
    /// Requests up to `msgs.len()` records; `count` receives the number
    /// actually written.
    fn read_no_wait(&self, handle: ApiHandle, msgs: &mut [CanMsg], count: &mut usize) -> i32;

    /// `canGetSystemTime`, in device ticks
    fn system_time(&self, now: &mut u64, start: &mut u64) -> i32;

    /// `canStatus`
    fn status(&self, handle: ApiHandle, status: &mut CanIfStatus) -> i32;

    /// `canGetDeviceList`
    fn device_list(&self, entry: &mut DeviceListEntry) -> i32;

    /// `canFlush`
    fn flush(&self, handle: ApiHandle, timeout_ms: i32) -> i32;

    /// `canClearBuffer`
    fn clear_buffer(&self, handle: ApiHandle) -> i32;

    /// `canBlinkLED`
    fn blink_led(&self, handle: ApiHandle, mode: u32, state: u32, colour: u32) -> i32;
}

macro_rules! forward_can_api {
    ($($ty:ty),*) => {$(
        impl<T: CanApi + ?Sized> CanApi for $ty {
            fn open(
                &self,
                net: i32,
                errors: bool,
                echo: bool,
                tx_timeout: i32,
                rx_timeout: i32,
                app_name: &str,
                rx_event: &str,
                err_event: &str,
                handle: &mut ApiHandle,
            ) -> i32 {
                (**self).open(
                    net, errors, echo, tx_timeout, rx_timeout, app_name, rx_event, err_event,
                    handle,
                )
            }

            fn close(&self, handle: ApiHandle) -> i32 {
                (**self).close(handle)
            }

            fn set_baudrate(&self, handle: ApiHandle, code: i32) -> i32 {
                (**self).set_baudrate(handle, code)
            }

            fn set_filter_mode(&self, handle: ApiHandle, mode: i32) -> i32 {
                (**self).set_filter_mode(handle, mode)
            }

            fn send(&self, handle: ApiHandle, msg: &CanMsg) -> i32 {
                (**self).send(handle, msg)
            }

            fn read_no_wait(&self, handle: ApiHandle, msgs: &mut [CanMsg], count: &mut usize) -> i32 {
                (**self).read_no_wait(handle, msgs, count)
            }

            fn system_time(&self, now: &mut u64, start: &mut u64) -> i32 {
                (**self).system_time(now, start)
            }

            fn status(&self, handle: ApiHandle, status: &mut CanIfStatus) -> i32 {
                (**self).status(handle, status)
            }

            fn device_list(&self, entry: &mut DeviceListEntry) -> i32 {
                (**self).device_list(entry)
            }

            fn flush(&self, handle: ApiHandle, timeout_ms: i32) -> i32 {
                (**self).flush(handle, timeout_ms)
            }

            fn clear_buffer(&self, handle: ApiHandle) -> i32 {
                (**self).clear_buffer(handle)
            }

            fn blink_led(&self, handle: ApiHandle, mode: u32, state: u32, colour: u32) -> i32 {
                (**self).blink_led(handle, mode, state, colour)
            }
        }
    )*};
}

forward_can_api!(&T, Arc<T>);

impl Sieca132 {
    /// Default install location of the vendor library
    pub const DEFAULT_PATH: &'static str =
        "C:\\Program Files (x86)\\Sontheim\\MT_Api\\SIECA132.dll";

    /// Load the vendor library from its default install location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::DEFAULT_PATH)
    }

    /// Process-wide instance of the vendor library
    ///
    /// The library is loaded on first use. A failed load is remembered
    /// and reported as [`SieCanError::UnsupportedPlatform`] on every call.
    pub fn shared() -> Result<Arc<Self>> {
        static SHARED: OnceLock<std::result::Result<Arc<Sieca132>, String>> = OnceLock::new();
        SHARED
            .get_or_init(|| match Self::load() {
                Ok(lib) => Ok(Arc::new(lib)),
                Err(e) => {
                    log::warn!("Cannot load SIE MT_API: {}", e);
                    Err(e.to_string())
                }
            })
            .clone()
            .map_err(SieCanError::UnsupportedPlatform)
    }
}

#[cfg(all(windows, target_arch = "x86"))]
mod imp {
    use windows_sys::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

    use super::{ApiHandle, CanApi};
    use crate::constants::NTCAN_SUCCESS;
    use crate::error::{Result, SieCanError};
    use crate::structures::{CanIfStatus, CanMsg, DeviceListEntry};

    type FnOpen = unsafe extern "system" fn(
        i32,
        i32,
        i32,
        i32,
        i32,
        *const u16,
        *const u16,
        *const u16,
        *mut ApiHandle,
    ) -> i32;
    type FnHandle = unsafe extern "system" fn(ApiHandle) -> i32;
    type FnHandleArg = unsafe extern "system" fn(ApiHandle, i32) -> i32;
    type FnMsgs = unsafe extern "system" fn(ApiHandle, *mut CanMsg, *mut i32) -> i32;
    type FnSystemTime = unsafe extern "system" fn(*mut u64, *mut u64) -> i32;
    type FnStatus = unsafe extern "system" fn(ApiHandle, *mut CanIfStatus) -> i32;
    type FnDeviceList = unsafe extern "system" fn(*mut DeviceListEntry) -> i32;
    type FnBlink = unsafe extern "system" fn(ApiHandle, u32, u32, u32) -> i32;

    /// Loaded `SIECA132.dll`
    pub struct Sieca132 {
        module: HMODULE,
        can_open: FnOpen,
        can_close: FnHandle,
        can_set_baudrate: FnHandleArg,
        can_set_filter_mode: FnHandleArg,
        can_send: FnMsgs,
        can_read_no_wait: FnMsgs,
        can_get_system_time: FnSystemTime,
        can_status: FnStatus,
        can_get_device_list: FnDeviceList,
        can_flush: FnHandleArg,
        can_clear_buffer: FnHandle,
        can_blink_led: FnBlink,
    }

    // The library serialises access per handle internally; the module
    // handle itself is only used by Drop.
    unsafe impl Send for Sieca132 {}
    unsafe impl Sync for Sieca132 {}

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    macro_rules! symbol {
        ($module:expr, $name:literal) => {{
            // SAFETY: the name is NUL-terminated; the signature of the
            // target field matches the vendor documentation.
            match unsafe { GetProcAddress($module, concat!($name, "\0").as_ptr()) } {
                Some(f) => unsafe { std::mem::transmute(f) },
                None => {
                    unsafe { FreeLibrary($module) };
                    return Err(SieCanError::UnsupportedPlatform(format!(
                        "symbol {} missing from SIECA132",
                        $name
                    )));
                }
            }
        }};
    }

    impl Sieca132 {
        /// Load the vendor library from `path`
        pub fn load_from(path: &str) -> Result<Self> {
            let path_w = wide(path);
            // SAFETY: `path_w` is NUL-terminated and outlives the call.
            let module = unsafe { LoadLibraryW(path_w.as_ptr()) };
            if module.is_null() {
                return Err(SieCanError::UnsupportedPlatform(format!(
                    "cannot load {}: {}",
                    path,
                    std::io::Error::last_os_error()
                )));
            }

            let lib = Self {
                module,
                can_open: symbol!(module, "canOpen"),
                can_close: symbol!(module, "canClose"),
                can_set_baudrate: symbol!(module, "canSetBaudrate"),
                can_set_filter_mode: symbol!(module, "canSetFilterMode"),
                can_send: symbol!(module, "canSend"),
                can_read_no_wait: symbol!(module, "canReadNoWait"),
                can_get_system_time: symbol!(module, "canGetSystemTime"),
                can_status: symbol!(module, "canStatus"),
                can_get_device_list: symbol!(module, "canGetDeviceList"),
                can_flush: symbol!(module, "canFlush"),
                can_clear_buffer: symbol!(module, "canClearBuffer"),
                can_blink_led: symbol!(module, "canBlinkLED"),
            };
            log::debug!("Loaded SIE MT_API from {}", path);
            Ok(lib)
        }
    }

    impl Drop for Sieca132 {
        fn drop(&mut self) {
            // SAFETY: the module was loaded by LoadLibraryW and is freed once.
            unsafe {
                FreeLibrary(self.module);
            }
        }
    }

    impl CanApi for Sieca132 {
        fn open(
            &self,
            net: i32,
            errors: bool,
            echo: bool,
            tx_timeout: i32,
            rx_timeout: i32,
            app_name: &str,
            rx_event: &str,
            err_event: &str,
            handle: &mut ApiHandle,
        ) -> i32 {
            let (app_name, rx_event, err_event) = (wide(app_name), wide(rx_event), wide(err_event));
            // SAFETY: all strings are NUL-terminated and outlive the call.
            unsafe {
                (self.can_open)(
                    net,
                    errors as i32,
                    echo as i32,
                    tx_timeout,
                    rx_timeout,
                    app_name.as_ptr(),
                    rx_event.as_ptr(),
                    err_event.as_ptr(),
                    handle,
                )
            }
        }

        fn close(&self, handle: ApiHandle) -> i32 {
            unsafe { (self.can_close)(handle) }
        }

        fn set_baudrate(&self, handle: ApiHandle, code: i32) -> i32 {
            unsafe { (self.can_set_baudrate)(handle, code) }
        }

        fn set_filter_mode(&self, handle: ApiHandle, mode: i32) -> i32 {
            unsafe { (self.can_set_filter_mode)(handle, mode) }
        }

        fn send(&self, handle: ApiHandle, msg: &CanMsg) -> i32 {
            let mut msg = *msg;
            let mut len = 1;
            unsafe { (self.can_send)(handle, &mut msg, &mut len) }
        }

        fn read_no_wait(&self, handle: ApiHandle, msgs: &mut [CanMsg], count: &mut usize) -> i32 {
            let mut len = msgs.len() as i32;
            // SAFETY: the driver writes at most `len` records.
            let code = unsafe { (self.can_read_no_wait)(handle, msgs.as_mut_ptr(), &mut len) };
            *count = if code == NTCAN_SUCCESS {
                (len.max(0) as usize).min(msgs.len())
            } else {
                0
            };
            code
        }

        fn system_time(&self, now: &mut u64, start: &mut u64) -> i32 {
            unsafe { (self.can_get_system_time)(now, start) }
        }

        fn status(&self, handle: ApiHandle, status: &mut CanIfStatus) -> i32 {
            unsafe { (self.can_status)(handle, status) }
        }

        fn device_list(&self, entry: &mut DeviceListEntry) -> i32 {
            unsafe { (self.can_get_device_list)(entry) }
        }

        fn flush(&self, handle: ApiHandle, timeout_ms: i32) -> i32 {
            unsafe { (self.can_flush)(handle, timeout_ms) }
        }

        fn clear_buffer(&self, handle: ApiHandle) -> i32 {
            unsafe { (self.can_clear_buffer)(handle) }
        }

        fn blink_led(&self, handle: ApiHandle, mode: u32, state: u32, colour: u32) -> i32 {
            unsafe { (self.can_blink_led)(handle, mode, state, colour) }
        }
    }
}

#[cfg(not(all(windows, target_arch = "x86")))]
mod imp {
    use super::{ApiHandle, CanApi};
    use crate::error::{Result, SieCanError};
    use crate::structures::{CanIfStatus, CanMsg, DeviceListEntry};

    /// `SIECA132.dll` is a 32-bit Windows library and cannot be loaded here
    pub enum Sieca132 {}

    impl Sieca132 {
        /// Always fails on this platform
        pub fn load_from(_path: &str) -> Result<Self> {
            let reason = if cfg!(windows) {
                "SIECA132 is a 32-bit library and this is not a 32-bit process".to_string()
            } else {
                format!("SIECA132 requires Windows, running on {}", std::env::consts::OS)
            };
            Err(SieCanError::UnsupportedPlatform(reason))
        }
    }

    impl CanApi for Sieca132 {
        fn open(
            &self,
            _net: i32,
            _errors: bool,
            _echo: bool,
            _tx_timeout: i32,
            _rx_timeout: i32,
            _app_name: &str,
            _rx_event: &str,
            _err_event: &str,
            _handle: &mut ApiHandle,
        ) -> i32 {
            match *self {}
        }

        fn close(&self, _handle: ApiHandle) -> i32 {
            match *self {}
        }

        fn set_baudrate(&self, _handle: ApiHandle, _code: i32) -> i32 {
            match *self {}
        }

        fn set_filter_mode(&self, _handle: ApiHandle, _mode: i32) -> i32 {
            match *self {}
        }

        fn send(&self, _handle: ApiHandle, _msg: &CanMsg) -> i32 {
            match *self {}
        }

        fn read_no_wait(&self, _handle: ApiHandle, _msgs: &mut [CanMsg], _count: &mut usize) -> i32 {
            match *self {}
        }

        fn system_time(&self, _now: &mut u64, _start: &mut u64) -> i32 {
            match *self {}
        }

        fn status(&self, _handle: ApiHandle, _status: &mut CanIfStatus) -> i32 {
            match *self {}
        }

        fn device_list(&self, _entry: &mut DeviceListEntry) -> i32 {
            match *self {}
        }

        fn flush(&self, _handle: ApiHandle, _timeout_ms: i32) -> i32 {
            match *self {}
        }

        fn clear_buffer(&self, _handle: ApiHandle) -> i32 {
            match *self {}
        }

        fn blink_led(&self, _handle: ApiHandle, _mode: u32, _state: u32, _colour: u32) -> i32 {
            match *self {}
        }
    }
}

pub use imp::Sieca132;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(all(windows, target_arch = "x86")))]
    #[test]
    fn test_load_unsupported_platform() {
        assert!(matches!(
            Sieca132::load(),
            Err(SieCanError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            Sieca132::shared(),
            Err(SieCanError::UnsupportedPlatform(_))
        ));
        // Cached failure is reported again
        assert!(matches!(
            Sieca132::shared(),
            Err(SieCanError::UnsupportedPlatform(_))
        ));
    }
}
