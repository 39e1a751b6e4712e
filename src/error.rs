//! Error types for conrescue.

use std::io;
use thiserror::Error;

/// Main error type for conrescue operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Defaults-template validation errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Run-level errors (cancellation, operator, backup)
    #[error("Run error: {0}")]
    Run(#[from] RunError),
}

/// Transport layer errors (serial port open, read, write).
///
/// Every variant is fatal: a recovery run never retries past a hard
/// transport failure. A per-read timeout is not an error at all; the
/// expect loop handles those by retransmitting.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to open the serial device
    #[error("Failed to open {port}: {source}")]
    OpenFailed {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Port settings the serial stack cannot express
    #[error("Unsupported port settings: {0}")]
    UnsupportedSettings(String),

    /// The device closed the line (EOF on read)
    #[error("Console disconnected")]
    Disconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Defaults-template validation errors.
///
/// Raised by [`DeviceDefaults::validate`](crate::template::DeviceDefaults::validate)
/// before any command is sent to the device.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Line range invalid after clamping to [0, 4]
    #[error("Invalid {line_type} line range: start {start} > end {end}")]
    LineRange {
        line_type: String,
        start: u8,
        end: u8,
    },
}

/// Run-level errors terminating an FSM run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The caller cancelled the run
    #[error("Run cancelled")]
    Cancelled,

    /// The run-level deadline expired
    #[error("Run deadline exceeded")]
    DeadlineExceeded,

    /// The operator declined a required physical-action confirmation
    #[error("Operator declined to confirm: {0}")]
    OperatorDeclined(String),

    /// The backup TFTP server could not be started
    #[error("Backup server failed: {0}")]
    Backup(String),
}

/// Result type alias using conrescue's Error.
pub type Result<T> = std::result::Result<T, Error>;
