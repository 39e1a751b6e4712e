//! Apply a defaults template to a freshly reset router.
//!
//! Reads a JSON template, validates it, and drives the attached router
//! through interface, line, hostname, and optional SSH setup.
//!
//! # Prerequisites
//!
//! - A router console cable on a local serial port (9600 8N1)
//! - A defaults template, e.g.:
//!
//! ```json
//! {
//!   "version": "1",
//!   "hostname": "lab",
//!   "domainName": "example.com",
//!   "ports": [{ "name": "g0/0/0", "ip": "192.168.1.1", "mask": "255.255.255.0" }],
//!   "lines": [{ "type": "vty", "startLine": 0, "endLine": 4, "password": "hunter2" }]
//! }
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --example apply_defaults -- defaults.json /dev/ttyUSB0
//! ```

use std::env;

use conrescue::{
    DeviceDefaults, PortSettings, ProgressSink, RouterDefaults, RunContext, RunControl,
    SerialTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let template_path = args.next().unwrap_or_else(|| {
        eprintln!("Usage: apply_defaults <template.json> [serial-device]");
        std::process::exit(1);
    });
    let device = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let template: DeviceDefaults = serde_json::from_str(&std::fs::read_to_string(&template_path)?)?;

    println!("Opening {device} at 9600 8N1...");
    let transport = SerialTransport::open(&device, &PortSettings::default())?;
    let mut ctx = RunContext::new(transport, ProgressSink::Log, RunControl::new());

    RouterDefaults::new(template).run(&mut ctx).await?;

    println!("Defaults applied to {device}");
    Ok(())
}
