//! Batched Receive Example
//!
//! Opens the first CANfox channel, lists installed devices and drains the
//! driver buffer in batches of up to 100 frames every 10 ms.

use std::thread;
use std::time::Duration;

use sie_can::{constants::canfox, detect_available_channels, ChannelOptions, SieCan, SieCanError};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> sie_can::Result<()> {
    let devices = detect_available_channels();
    if devices.is_empty() {
        println!("No SIE CAN device found");
    }
    for device in &devices {
        println!("{}\n", device);
    }

    let mut can = match SieCan::open_shared(canfox::CAN1, ChannelOptions::new().bitrate(500_000)) {
        Ok(can) => can,
        Err(SieCanError::UnsupportedPlatform(reason)) => {
            println!("Cannot use the vendor library here: {}", reason);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    println!("Opened {}", can);
    println!("{}\n", can.status()?);

    can.clear_rx_buffer()?;

    println!("Receiving (press Ctrl+C to stop)...\n");
    loop {
        let frames = can.read_many(100)?;
        for frame in &frames {
            println!("{:>14.4}  {}", frame.timestamp, frame);
        }
        thread::sleep(Duration::from_millis(10));
    }
}
