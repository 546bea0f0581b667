//! Receive path
//!
//! Single-frame reads wait for data through a [`Completion`] when the
//! driver reports an empty buffer. Batched reads drain whatever the
//! driver holds and never wait.

use crate::api::{ApiHandle, CanApi};
use crate::constants::{NTCAN_GET_MUTEX_FAILED, NTCAN_RX_TIMEOUT, NTCAN_SUCCESS};
use crate::error::{Result, SieCanError};
use crate::frame::CanFrame;
use crate::structures::CanMsg;
use crate::timestamp::TimestampAnchor;
use crate::wait::{Completion, WaitOutcome};

/// Decode a record and stamp it with host time
fn to_frame(record: &CanMsg, anchor: &TimestampAnchor) -> CanFrame {
    let mut frame = CanFrame::decode(record);
    frame.timestamp = anchor.reconcile(u64::from(record.ul_tstamp));
    log::trace!("Decoded {}", frame);
    frame
}

/// Read one frame, waiting through `completion` while the buffer is empty
///
/// Returns `Ok(None)` once the completion gives up. Any status other
/// than success or receive-timeout fails immediately with
/// [`SieCanError::Bus`].
pub fn receive_one<A, C>(
    api: &A,
    handle: ApiHandle,
    anchor: &TimestampAnchor,
    completion: &mut C,
) -> Result<Option<CanFrame>>
where
    A: CanApi + ?Sized,
    C: Completion + ?Sized,
{
    log::debug!("Trying to read a frame");

    let mut record = [CanMsg::default()];
    loop {
        let mut count = 0;
        match api.read_no_wait(handle, &mut record, &mut count) {
            NTCAN_SUCCESS if count > 0 => {
                log::debug!("Received a frame");
                return Ok(Some(to_frame(&record[0], anchor)));
            }
            // A successful read that returned nothing is an empty buffer
            NTCAN_SUCCESS | NTCAN_RX_TIMEOUT => match completion.wait_or_expire() {
                WaitOutcome::Retry => continue,
                WaitOutcome::GiveUp => {
                    log::debug!("Receive timed out");
                    return Ok(None);
                }
            },
            code => return Err(SieCanError::Bus { op: "read", code }),
        }
    }
}

/// Read up to `max_count` buffered frames without waiting
///
/// Frames are returned in driver order. An empty buffer yields an empty
/// list. The driver's transient mutex status is retried at once.
pub fn receive_many<A>(
    api: &A,
    handle: ApiHandle,
    anchor: &TimestampAnchor,
    max_count: usize,
) -> Result<Vec<CanFrame>>
where
    A: CanApi + ?Sized,
{
    log::debug!("Trying to read up to {} frames", max_count);

    if max_count == 0 {
        return Ok(Vec::new());
    }

    let mut records = vec![CanMsg::default(); max_count];
    let count = loop {
        let mut count = 0;
        match api.read_no_wait(handle, &mut records, &mut count) {
            NTCAN_SUCCESS => break count.min(max_count),
            NTCAN_GET_MUTEX_FAILED => continue,
            NTCAN_RX_TIMEOUT => return Ok(Vec::new()),
            code => {
                return Err(SieCanError::Bus {
                    op: "read multiple",
                    code,
                })
            }
        }
    };

    log::debug!("Received {} frame(s)", count);

    Ok(records[..count]
        .iter()
        .map(|record| to_frame(record, anchor))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::constants::{MSG_FLAG_EXTENDED, NTCAN_CONTR_BUSOFF, NTCAN_INVALID_HANDLE};
    use crate::fake::{FakeApi, ReadStep};
    use crate::wait::CompletionStrategy;

    /// Completion that counts how often it was consulted
    struct Counting {
        calls: usize,
        retries: usize,
    }

    impl Completion for Counting {
        fn wait_or_expire(&mut self) -> WaitOutcome {
            self.calls += 1;
            if self.calls <= self.retries {
                WaitOutcome::Retry
            } else {
                WaitOutcome::GiveUp
            }
        }
    }

    fn record(id: i32, tick: u32) -> CanMsg {
        CanMsg {
            l_id: id,
            by_len: 2,
            aby_data: [id as u8, 0xEE, 0, 0, 0, 0, 0, 0],
            ul_tstamp: tick,
            ..Default::default()
        }
    }

    #[test]
    fn test_receive_one_delivers() {
        let api = FakeApi::new();
        api.push_read(ReadStep::Records(vec![record(0x123, 150_000)]));
        let anchor = TimestampAnchor::new(1000.0, 50_000);
        let mut completion = Counting { calls: 0, retries: 0 };

        let frame = receive_one(&api, ApiHandle(1), &anchor, &mut completion)
            .unwrap()
            .unwrap();

        assert_eq!(frame.arbitration_id, 0x123);
        assert_eq!(frame.data(), &[0x23, 0xEE]);
        assert_eq!(frame.timestamp, 1010.0);
        assert_eq!(completion.calls, 0);
    }

    #[test]
    fn test_receive_one_retries_after_wait() {
        let api = FakeApi::new();
        api.push_read(ReadStep::Status(NTCAN_RX_TIMEOUT));
        api.push_read(ReadStep::Status(NTCAN_RX_TIMEOUT));
        api.push_read(ReadStep::Records(vec![record(0x42, 0)]));
        let anchor = TimestampAnchor::new(0.0, 0);
        let mut completion = Counting { calls: 0, retries: 5 };

        let frame = receive_one(&api, ApiHandle(1), &anchor, &mut completion).unwrap();

        assert_eq!(frame.map(|f| f.arbitration_id), Some(0x42));
        assert_eq!(completion.calls, 2);
        assert_eq!(api.reads(), 3);
    }

    #[test]
    fn test_receive_one_gives_up() {
        let api = FakeApi::new();
        let anchor = TimestampAnchor::new(0.0, 0);
        let mut completion = Counting { calls: 0, retries: 2 };

        let frame = receive_one(&api, ApiHandle(1), &anchor, &mut completion).unwrap();

        assert!(frame.is_none());
        assert_eq!(completion.calls, 3);
        assert_eq!(api.reads(), 3);
    }

    #[test]
    fn test_receive_one_deadline_exhaustion() {
        let api = FakeApi::new();
        let anchor = TimestampAnchor::new(0.0, 0);
        let strategy = CompletionStrategy::polling();
        let timeout = Duration::from_millis(50);

        let start = Instant::now();
        let mut wait = strategy.begin(Some(timeout));
        let frame = receive_one(&api, ApiHandle(1), &anchor, &mut wait).unwrap();
        let elapsed = start.elapsed();

        assert!(frame.is_none());
        assert!(elapsed >= timeout);
        // One poll interval plus scheduler slack
        assert!(elapsed < timeout + Duration::from_millis(100));
    }

    #[test]
    fn test_receive_one_fatal_status() {
        for code in [NTCAN_CONTR_BUSOFF, NTCAN_INVALID_HANDLE, NTCAN_GET_MUTEX_FAILED] {
            let api = FakeApi::new();
            api.push_read(ReadStep::Status(code));
            let anchor = TimestampAnchor::new(0.0, 0);
            let mut completion = Counting { calls: 0, retries: 10 };

            let err = receive_one(&api, ApiHandle(1), &anchor, &mut completion).unwrap_err();

            assert_eq!(err.status_code(), Some(code));
            assert_eq!(api.reads(), 1);
            assert_eq!(completion.calls, 0);
        }
    }

    #[test]
    fn test_receive_many_retries_without_waiting() {
        let api = FakeApi::new();
        api.push_read(ReadStep::Status(NTCAN_GET_MUTEX_FAILED));
        api.push_read(ReadStep::Status(NTCAN_GET_MUTEX_FAILED));
        api.push_read(ReadStep::Records(vec![
            record(1, 10),
            record(2, 20),
            CanMsg {
                by_extended: MSG_FLAG_EXTENDED,
                ..record(3, 30)
            },
        ]));
        let anchor = TimestampAnchor::new(100.0, 0);

        let frames = receive_many(&api, ApiHandle(1), &anchor, 20).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames.iter().map(|f| f.arbitration_id).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(frames[2].is_extended);
        assert!((frames[1].timestamp - 100.002).abs() < 1e-9);
        assert_eq!(api.reads(), 3);
        assert_eq!(api.last_read_capacity(), 20);
    }

    #[test]
    fn test_receive_many_empty_buffer() {
        let api = FakeApi::new();
        let anchor = TimestampAnchor::new(0.0, 0);

        assert!(receive_many(&api, ApiHandle(1), &anchor, 5).unwrap().is_empty());
        assert_eq!(api.reads(), 1);

        assert!(receive_many(&api, ApiHandle(1), &anchor, 0).unwrap().is_empty());
        assert_eq!(api.reads(), 1);
    }

    #[test]
    fn test_receive_many_fatal_status() {
        let api = FakeApi::new();
        api.push_read(ReadStep::Status(NTCAN_CONTR_BUSOFF));
        let anchor = TimestampAnchor::new(0.0, 0);

        let err = receive_many(&api, ApiHandle(1), &anchor, 5).unwrap_err();
        assert!(matches!(
            err,
            SieCanError::Bus {
                code: NTCAN_CONTR_BUSOFF,
                ..
            }
        ));
    }
}
