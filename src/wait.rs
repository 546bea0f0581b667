//! Receive completion strategies
//!
//! A blocking receive that finds the driver buffer empty has to wait for
//! the next frame or for the caller's timeout. Three mechanisms exist:
//!
//! - a named event object the driver signals on frame arrival (Windows),
//! - polling against a deadline computed once per receive call,
//! - sleep-polling without a deadline when no timeout was requested.
//!
//! Which kind is used is decided once per process by probing for event
//! support. The receive core only sees [`Completion::wait_or_expire`].

use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::POLL_INTERVAL_MS;
use crate::error::Result;

/// Result of waiting for the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Try reading again
    Retry,
    /// Timeout budget exhausted, no data
    GiveUp,
}

/// Wait-or-expire capability used by the receive core
pub trait Completion {
    /// Block until it is worth reading again, or report that the caller's
    /// timeout has elapsed
    fn wait_or_expire(&mut self) -> WaitOutcome;
}

/// Whether native receive events work in this process
///
/// Probed on first use and cached for the lifetime of the process.
pub fn native_events_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        let available = event::probe();
        log::debug!("Native receive events available: {}", available);
        available
    })
}

/// Completion mechanism owned by a channel
#[derive(Debug)]
pub enum CompletionStrategy {
    /// Block on an event object signalled by the driver
    Event(event::EventObject),
    /// Poll the driver with a fixed sleep in between
    Poll {
        /// Sleep between attempts
        interval: Duration,
    },
}

impl CompletionStrategy {
    /// Select the strategy for a channel whose driver signals `event_name`
    pub fn select(event_name: &str) -> Result<Self> {
        if native_events_available() {
            Ok(CompletionStrategy::Event(event::EventObject::create(
                event_name,
            )?))
        } else {
            Ok(Self::polling())
        }
    }

    /// Polling strategy with the default interval
    pub fn polling() -> Self {
        CompletionStrategy::Poll {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }

    /// Whether this strategy blocks on a native event
    pub fn is_event(&self) -> bool {
        matches!(self, CompletionStrategy::Event(_))
    }

    /// Start waiting on behalf of one receive call
    ///
    /// # Arguments
    /// * `timeout` - Caller's timeout, `None` to wait forever
    pub fn begin(&self, timeout: Option<Duration>) -> PendingWait<'_> {
        let deadline = timeout.map(|t| Instant::now() + t);
        match (self, deadline) {
            (CompletionStrategy::Event(event), deadline) => PendingWait::Event { event, deadline },
            (CompletionStrategy::Poll { interval }, Some(deadline)) => PendingWait::Deadline {
                deadline,
                interval: *interval,
            },
            (CompletionStrategy::Poll { interval }, None) => PendingWait::Sleep {
                interval: *interval,
            },
        }
    }
}

/// Wait state of a single receive call
#[derive(Debug)]
pub enum PendingWait<'a> {
    /// Native event, bounded by an optional deadline
    Event {
        event: &'a event::EventObject,
        deadline: Option<Instant>,
    },
    /// Poll until a fixed deadline
    Deadline { deadline: Instant, interval: Duration },
    /// Poll forever
    Sleep { interval: Duration },
}

impl Completion for PendingWait<'_> {
    fn wait_or_expire(&mut self) -> WaitOutcome {
        match self {
            PendingWait::Event { event, deadline } => {
                let remaining = match deadline {
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            return WaitOutcome::GiveUp;
                        }
                        Some(remaining)
                    }
                    None => None,
                };
                match event.wait(remaining) {
                    event::Signal::Signalled => WaitOutcome::Retry,
                    event::Signal::TimedOut => WaitOutcome::GiveUp,
                    event::Signal::Failed => {
                        log::warn!("Waiting on receive event failed");
                        WaitOutcome::GiveUp
                    }
                }
            }
            PendingWait::Deadline { deadline, interval } => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return WaitOutcome::GiveUp;
                }
                thread::sleep(remaining.min(*interval));
                WaitOutcome::Retry
            }
            PendingWait::Sleep { interval } => {
                thread::sleep(*interval);
                WaitOutcome::Retry
            }
        }
    }
}

#[cfg(windows)]
pub mod event {
    //! Win32 event objects

    use std::time::Duration;

    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
    use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};

    use crate::error::{InitStep, Result, SieCanError};

    /// Outcome of waiting on an event
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Signal {
        Signalled,
        TimedOut,
        Failed,
    }

    /// Named auto-reset event
    #[derive(Debug)]
    pub struct EventObject {
        handle: HANDLE,
        name: String,
    }

    // Event handles may be waited on and closed from any thread.
    unsafe impl Send for EventObject {}

    impl EventObject {
        /// Create (or open) the named auto-reset event
        pub fn create(name: &str) -> Result<Self> {
            let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
            // SAFETY: `wide` is NUL-terminated and outlives the call.
            let handle = unsafe { CreateEventW(std::ptr::null(), 0, 0, wide.as_ptr()) };
            if handle.is_null() {
                return Err(SieCanError::Init {
                    step: InitStep::ReceiveEvent,
                    code: std::io::Error::last_os_error().raw_os_error().unwrap_or(-1),
                });
            }
            Ok(Self {
                handle,
                name: name.to_string(),
            })
        }

        /// Event name as passed to the driver
        pub fn name(&self) -> &str {
            &self.name
        }

        /// Block until signalled or until `timeout` elapses (`None` = forever)
        pub fn wait(&self, timeout: Option<Duration>) -> Signal {
            let millis = match timeout {
                Some(t) => t.as_millis().min((INFINITE - 1) as u128) as u32,
                None => INFINITE,
            };
            // SAFETY: the handle stays valid until drop.
            match unsafe { WaitForSingleObject(self.handle, millis) } {
                WAIT_OBJECT_0 => Signal::Signalled,
                WAIT_TIMEOUT => Signal::TimedOut,
                _ => Signal::Failed,
            }
        }
    }

    impl Drop for EventObject {
        fn drop(&mut self) {
            // SAFETY: the handle was returned by CreateEventW and is closed once.
            unsafe {
                CloseHandle(self.handle);
            }
        }
    }

    pub(super) fn probe() -> bool {
        // SAFETY: anonymous event, closed immediately.
        unsafe {
            let handle = CreateEventW(std::ptr::null(), 0, 0, std::ptr::null());
            if handle.is_null() {
                return false;
            }
            CloseHandle(handle);
        }
        true
    }
}

#[cfg(not(windows))]
pub mod event {
    //! Placeholder for platforms without driver-signalled events

    use std::time::Duration;

    use crate::error::{Result, SieCanError};

    /// Outcome of waiting on an event
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Signal {
        Signalled,
        TimedOut,
        Failed,
    }

    /// Event objects cannot be created on this platform
    #[derive(Debug)]
    pub struct EventObject {
        _private: (),
    }

    impl EventObject {
        pub fn create(_name: &str) -> Result<Self> {
            Err(SieCanError::UnsupportedPlatform(
                "event objects require Windows".to_string(),
            ))
        }

        pub fn name(&self) -> &str {
            ""
        }

        pub fn wait(&self, _timeout: Option<Duration>) -> Signal {
            Signal::Failed
        }
    }

    pub(super) fn probe() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_poll_expires() {
        let strategy = CompletionStrategy::polling();
        let start = Instant::now();
        let mut wait = strategy.begin(Some(Duration::from_millis(20)));

        let mut retries = 0;
        while wait.wait_or_expire() == WaitOutcome::Retry {
            retries += 1;
        }

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(retries > 0);
    }

    #[test]
    fn test_zero_timeout_gives_up_immediately() {
        let strategy = CompletionStrategy::polling();
        let mut wait = strategy.begin(Some(Duration::ZERO));
        assert_eq!(wait.wait_or_expire(), WaitOutcome::GiveUp);
    }

    #[test]
    fn test_no_timeout_sleep_polls() {
        let strategy = CompletionStrategy::polling();
        let mut wait = strategy.begin(None);
        assert!(matches!(wait, PendingWait::Sleep { .. }));
        for _ in 0..3 {
            assert_eq!(wait.wait_or_expire(), WaitOutcome::Retry);
        }
    }

    #[test]
    fn test_probe_is_stable() {
        assert_eq!(native_events_available(), native_events_available());
        #[cfg(not(windows))]
        assert!(!native_events_available());
    }

    #[cfg(windows)]
    #[test]
    fn test_event_times_out() {
        let event = event::EventObject::create("sie_can_test_event_timeout").unwrap();
        let strategy = CompletionStrategy::Event(event);
        let start = Instant::now();
        let mut wait = strategy.begin(Some(Duration::from_millis(20)));
        assert_eq!(wait.wait_or_expire(), WaitOutcome::GiveUp);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
