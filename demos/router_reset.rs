//! Factory-reset a router over its serial console.
//!
//! Breaks the attached router into ROMMON, boots it past the startup
//! configuration, wipes NVRAM, and reloads. Progress is streamed to
//! stdout; the full console transcript is written next to the port name.
//!
//! # Prerequisites
//!
//! - A router console cable on a local serial port (9600 8N1)
//!
//! # Usage
//!
//! ```bash
//! cargo run --example router_reset -- /dev/ttyUSB0
//! ```

use std::env;

use conrescue::{
    BackupParameters, PortSettings, ProgressSink, RouterReset, RunContext, RunControl,
    SerialTransport, COMPLETION_SENTINEL,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    println!("Opening {device} at 9600 8N1...");
    let transport = SerialTransport::open(&device, &PortSettings::default())?;

    let (sink, mut progress) = ProgressSink::channel(64);
    let mut ctx = RunContext::new(transport, sink, RunControl::new());

    let printer = tokio::spawn(async move {
        while let Some(message) = progress.recv().await {
            println!("{message}");
            if message == COMPLETION_SENTINEL {
                break;
            }
        }
    });

    let outcome = RouterReset::new(BackupParameters::default())
        .run(&mut ctx)
        .await;

    ctx.dump_transcript("router_reset.transcript.txt").await?;
    outcome?;
    printer.await?;

    println!("Router reset complete; transcript in router_reset.transcript.txt");
    Ok(())
}
