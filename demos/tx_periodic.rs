//! Periodic Transmit Example
//!
//! Sends a rotating set of frames once per second while printing
//! everything received in between.

use std::time::{Duration, Instant};

use sie_can::{constants::canfox, CanFrame, ChannelOptions, SieCan, SieCanError};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> sie_can::Result<()> {
    let options = ChannelOptions::new().bitrate(250_000).tx_timeout(100);
    let mut can = match SieCan::open_shared(canfox::CAN1, options) {
        Ok(can) => can,
        Err(SieCanError::UnsupportedPlatform(reason)) => {
            println!("Cannot use the vendor library here: {}", reason);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    println!("Opened {}", can);

    let data: [u8; 8] = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
    let frames = [
        // Standard frame with data
        CanFrame::with_data(0x7FF, false, &data)?,
        // Standard frame without data
        CanFrame::with_data(0x7FF, false, &[])?,
        // Extended frame with data
        CanFrame::with_data(0x12345678, true, &data)?,
        // Remote transmission requests
        CanFrame::remote(0x7FF, false, 8)?,
        CanFrame::remote(0x12345678, true, 0)?,
    ];

    println!("\nStarting CAN communication (press Ctrl+C to stop)...\n");

    let mut next_send_time = Instant::now();
    let mut frame_index = 0;

    loop {
        if let Some(frame) = can.read(Some(Duration::from_millis(1)))? {
            println!("RX  {}", frame);
        }

        if Instant::now() >= next_send_time {
            next_send_time = Instant::now() + Duration::from_secs(1);

            let frame = &frames[frame_index];
            frame_index = (frame_index + 1) % frames.len();

            match can.send(frame) {
                Ok(()) => println!("TX  {}", frame),
                Err(SieCanError::SendTimeout) => eprintln!("TX  timed out"),
                Err(e) => eprintln!("Send error: {}", e),
            }
        }
    }
}
