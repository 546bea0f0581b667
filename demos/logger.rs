//! Bus Logger Example
//!
//! Prints every frame seen on a channel, one per line, with its host
//! timestamp. Usage: `logger [net] [bitrate]`.

use std::time::Duration;

use sie_can::{constants::canfox, ChannelOptions, SieCan, SieCanError};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> sie_can::Result<()> {
    let mut args = std::env::args().skip(1);
    let net = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(canfox::CAN1);
    let bitrate = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500_000);

    let options = ChannelOptions::new().bitrate(bitrate).errors(true);
    let mut can = match SieCan::open_shared(net, options) {
        Ok(can) => can,
        Err(SieCanError::UnsupportedPlatform(reason)) => {
            println!("Cannot use the vendor library here: {}", reason);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Logging {} (press Ctrl+C to stop)...\n", can);
    can.blink_led(Duration::from_secs(1))?;

    let mut count = 0u64;
    loop {
        match can.read(Some(Duration::from_secs(1)))? {
            Some(frame) => {
                count += 1;
                let kind = if frame.is_error { "ERR" } else { "RX " };
                println!("{:>14.4}  {}  {}", frame.timestamp, kind, frame);
            }
            None => log::debug!("Idle, {} frame(s) so far", count),
        }
    }
}
