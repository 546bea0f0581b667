//! Scripted stand-in for the vendor library, used by unit tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::api::{ApiHandle, CanApi};
use crate::constants::{NTCAN_RX_TIMEOUT, NTCAN_SUCCESS};
use crate::structures::{CanIfStatus, CanMsg, DeviceListEntry};

/// Outcome of one scripted `read_no_wait` call
pub enum ReadStep {
    Status(i32),
    Records(Vec<CanMsg>),
}

pub struct FakeApi {
    pub open_status: Cell<i32>,
    pub baudrate_status: Cell<i32>,
    pub filter_status: Cell<i32>,
    pub send_status: Cell<i32>,
    pub flush_status: Cell<i32>,
    pub clear_status: Cell<i32>,
    pub system_time_status: Cell<i32>,
    pub device_list_status: Cell<i32>,
    pub device_tick: Cell<u64>,
    pub device: RefCell<Option<DeviceListEntry>>,
    pub baudrate: Cell<Option<i32>>,
    pub filter_mode: Cell<Option<i32>>,
    pub sent: RefCell<Vec<CanMsg>>,
    pub calls: RefCell<Vec<&'static str>>,
    reads: RefCell<VecDeque<ReadStep>>,
    read_count: Cell<usize>,
    read_capacity: Cell<usize>,
    close_count: Cell<usize>,
    blink_count: Cell<usize>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            open_status: Cell::new(NTCAN_SUCCESS),
            baudrate_status: Cell::new(NTCAN_SUCCESS),
            filter_status: Cell::new(NTCAN_SUCCESS),
            send_status: Cell::new(NTCAN_SUCCESS),
            flush_status: Cell::new(NTCAN_SUCCESS),
            clear_status: Cell::new(NTCAN_SUCCESS),
            system_time_status: Cell::new(NTCAN_SUCCESS),
            device_list_status: Cell::new(NTCAN_SUCCESS),
            device_tick: Cell::new(0),
            device: RefCell::new(None),
            baudrate: Cell::new(None),
            filter_mode: Cell::new(None),
            sent: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            reads: RefCell::new(VecDeque::new()),
            read_count: Cell::new(0),
            read_capacity: Cell::new(0),
            close_count: Cell::new(0),
            blink_count: Cell::new(0),
        }
    }

    /// Queue the result of the next read; an empty queue reads as RX_TIMEOUT
    pub fn push_read(&self, step: ReadStep) {
        self.reads.borrow_mut().push_back(step);
    }

    pub fn reads(&self) -> usize {
        self.read_count.get()
    }

    pub fn last_read_capacity(&self) -> usize {
        self.read_capacity.get()
    }

    pub fn closes(&self) -> usize {
        self.close_count.get()
    }

    pub fn blinks(&self) -> usize {
        self.blink_count.get()
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }
}

impl CanApi for FakeApi {
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
        handle: &mut ApiHandle,
    ) -> i32 {
        self.record("open");
        *handle = ApiHandle(0x5A);
        self.open_status.get()
    }

    fn close(&self, _handle: ApiHandle) -> i32 {
        self.record("close");
        self.close_count.set(self.close_count.get() + 1);
        NTCAN_SUCCESS
    }

    fn set_baudrate(&self, _handle: ApiHandle, code: i32) -> i32 {
        self.record("set_baudrate");
        self.baudrate.set(Some(code));
        self.baudrate_status.get()
    }

    fn set_filter_mode(&self, _handle: ApiHandle, mode: i32) -> i32 {
        self.record("set_filter_mode");
        self.filter_mode.set(Some(mode));
        self.filter_status.get()
    }

    fn send(&self, _handle: ApiHandle, msg: &CanMsg) -> i32 {
        self.record("send");
        self.sent.borrow_mut().push(*msg);
        self.send_status.get()
    }

    fn read_no_wait(&self, _handle: ApiHandle, msgs: &mut [CanMsg], count: &mut usize) -> i32 {
        self.read_count.set(self.read_count.get() + 1);
        self.read_capacity.set(msgs.len());
        *count = 0;
        match self.reads.borrow_mut().pop_front() {
            Some(ReadStep::Status(code)) => code,
            Some(ReadStep::Records(records)) => {
                let n = records.len().min(msgs.len());
                msgs[..n].copy_from_slice(&records[..n]);
                *count = n;
                NTCAN_SUCCESS
            }
            None => NTCAN_RX_TIMEOUT,
        }
    }

    fn system_time(&self, now: &mut u64, start: &mut u64) -> i32 {
        self.record("system_time");
        *now = self.device_tick.get();
        *start = 0;
        self.system_time_status.get()
    }

    fn status(&self, _handle: ApiHandle, status: &mut CanIfStatus) -> i32 {
        status.w_fw_rev = 0x0102;
        status.w_baud = 3;
        NTCAN_SUCCESS
    }

    fn device_list(&self, entry: &mut DeviceListEntry) -> i32 {
        if let Some(device) = *self.device.borrow() {
            *entry = device;
        }
        self.device_list_status.get()
    }

    fn flush(&self, _handle: ApiHandle, _timeout_ms: i32) -> i32 {
        self.record("flush");
        self.flush_status.get()
    }

    fn clear_buffer(&self, _handle: ApiHandle) -> i32 {
        self.record("clear_buffer");
        self.clear_status.get()
    }

    fn blink_led(&self, _handle: ApiHandle, _mode: u32, _state: u32, _colour: u32) -> i32 {
        self.blink_count.set(self.blink_count.get() + 1);
        NTCAN_SUCCESS
    }
}
