//! Serial transport layer.
//!
//! This module provides the low-level byte transport the console session
//! is built on: a trait for duplex, timeout-bounded byte I/O, plus the
//! tokio-serial implementation used against real console servers.

pub mod config;
mod serial;

pub use config::{DataBits, Parity, PortSettings, StopBits};
pub use serial::SerialTransport;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Trait for duplex byte transports carrying a device console.
///
/// Implementations are expected to be line-agnostic: they move raw bytes
/// and nothing else. Line framing, normalization, and prompt detection all
/// live in the session layer above.
pub trait ConsoleTransport: Send {
    /// Write raw bytes to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived within the timeout. An EOF on
    /// the underlying device is `TransportError::Disconnected`; a console
    /// line going away mid-run is always fatal.
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Close the transport.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
