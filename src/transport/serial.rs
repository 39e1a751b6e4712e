//! Serial port transport implementation using tokio-serial.

use std::time::Duration;

use log::info;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::config::{DataBits, Parity, PortSettings, StopBits};
use super::ConsoleTransport;
use crate::error::{Result, TransportError};

/// Serial port transport wrapping a tokio-serial stream.
pub struct SerialTransport {
    port: SerialStream,
}

impl SerialTransport {
    /// Open a serial device with the given settings.
    pub fn open(device: &str, settings: &PortSettings) -> Result<Self> {
        let port = tokio_serial::new(device, settings.baud)
            .data_bits(map_data_bits(settings.data_bits))
            .parity(map_parity(settings.parity)?)
            .stop_bits(map_stop_bits(settings.stop_bits)?)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|source| TransportError::OpenFailed {
                port: device.to_string(),
                source,
            })?;

        info!(
            "Opened serial port {} ({})",
            device,
            settings.run_id()
        );

        Ok(Self { port })
    }
}

impl ConsoleTransport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .await
            .map_err(TransportError::Io)?;
        self.port.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match tokio::time::timeout(timeout, self.port.read(buf)).await {
            // Timeout is not an error; the expect loop decides what to do.
            Err(_) => Ok(0),
            Ok(Ok(0)) => Err(TransportError::Disconnected.into()),
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(TransportError::Io(e).into()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.port.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}

fn map_data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn map_parity(parity: Parity) -> Result<tokio_serial::Parity> {
    match parity {
        Parity::None => Ok(tokio_serial::Parity::None),
        Parity::Even => Ok(tokio_serial::Parity::Even),
        Parity::Odd => Ok(tokio_serial::Parity::Odd),
        // The serialport stack has no mark/space support.
        Parity::Mark | Parity::Space => Err(TransportError::UnsupportedSettings(
            format!("{parity:?} parity"),
        )
        .into()),
    }
}

fn map_stop_bits(stop: StopBits) -> Result<tokio_serial::StopBits> {
    match stop {
        StopBits::One => Ok(tokio_serial::StopBits::One),
        StopBits::Two => Ok(tokio_serial::StopBits::Two),
        StopBits::OnePointFive => Err(TransportError::UnsupportedSettings(
            "1.5 stop bits".to_string(),
        )
        .into()),
    }
}
