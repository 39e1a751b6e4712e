//! Serial line configuration.

use serde::{Deserialize, Serialize};

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

/// Immutable serial line settings.
///
/// Console recovery almost always runs at the Cisco default of 9600 8N1;
/// the settings are carried anyway because they identify the run (see
/// [`run_id`](Self::run_id)) and because console servers occasionally
/// present other framings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSettings {
    /// Baud rate.
    pub baud: u32,

    /// Data bits (5-8).
    pub data_bits: DataBits,

    /// Parity mode.
    pub parity: Parity,

    /// Stop bits.
    pub stop_bits: StopBits,
}

impl PortSettings {
    /// Derive the run identifier for these settings, e.g. `"9600-8N1"`.
    pub fn run_id(&self) -> String {
        let bits = match self.data_bits {
            DataBits::Five => '5',
            DataBits::Six => '6',
            DataBits::Seven => '7',
            DataBits::Eight => '8',
        };
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        };
        let stop = match self.stop_bits {
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        };
        format!("{}-{}{}{}", self.baud, bits, parity, stop)
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}
