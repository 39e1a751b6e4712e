//! # Conrescue
//!
//! Async serial-console recovery automation for Cisco routers and
//! switches.
//!
//! Conrescue drives a device attached over a serial console through the
//! classic recovery procedures: break into ROMMON and factory-reset a
//! router, apply a defaults template to the blank device, or erase the
//! stored configuration of a switch from its boot loader.
//!
//! ## Features
//!
//! - Async serial transport via tokio-serial
//! - Generic expect engine with pluggable line matchers and syslog noise
//!   filtering
//! - Router reset, router defaults, and switch reset state machines
//! - Optional startup-config backup over TFTP before the wipe
//! - Per-run progress stream, transcript capture, and cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conrescue::{
//!     BackupParameters, PortSettings, ProgressSink, RouterReset, RunContext, RunControl,
//!     SerialTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), conrescue::Error> {
//!     let transport = SerialTransport::open("/dev/ttyUSB0", &PortSettings::default())?;
//!     let mut ctx = RunContext::new(transport, ProgressSink::Log, RunControl::new());
//!
//!     RouterReset::new(BackupParameters::default())
//!         .run(&mut ctx)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod console;
pub mod error;
pub mod expect;
pub mod flash;
pub mod fsm;
pub mod progress;
pub mod template;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use backup::{BackupCoordinator, BackupParameters, BackupPlan, TftpHandle, TftpLauncher};
pub use error::{Error, Result, RunError, TemplateError, TransportError};
pub use fsm::{
    AutoConfirm, CliMode, OperatorGate, Prompt, RouterDefaults, RouterReset, RunContext,
    RunControl, SwitchReset,
};
pub use progress::{ProgressSink, COMPLETION_SENTINEL};
pub use template::DeviceDefaults;
pub use transport::{ConsoleTransport, PortSettings, SerialTransport};
