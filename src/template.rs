//! Device defaults template.
//!
//! A structured description of the baseline configuration RouterDefaults
//! applies after a wipe. Loading (JSON or otherwise) is the caller's
//! concern; this module owns the shape, the validation rules, and the
//! clamping the state machine relies on.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::TemplateError;

/// Highest numbered console/vty line the template may address.
pub const MAX_LINE_NUMBER: u8 = 4;

/// Lower and upper bounds for RSA key modulus size.
pub const MIN_KEY_BITS: u32 = 360;
pub const MAX_KEY_BITS: u32 = 2048;

/// Default RSA key modulus when the template does not specify one.
pub const DEFAULT_KEY_BITS: u32 = 512;

/// Baseline configuration template for a router.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceDefaults {
    /// Template format version.
    pub version: String,

    /// Interfaces to configure.
    pub ports: Vec<PortDefaults>,

    /// Console/vty line blocks to configure.
    pub lines: Vec<LineDefaults>,

    /// Enable secret. Empty = leave unset.
    pub enable_password: Option<SecretString>,

    /// MOTD banner text. Empty = skip.
    pub banner: String,

    /// Hostname to assign. Empty = skip.
    pub hostname: String,

    /// Domain name. Empty = skip.
    pub domain_name: String,

    /// Gateway for a default route. Empty = skip.
    pub default_route: String,

    /// SSH enablement block.
    pub ssh: SshDefaults,
}

/// Per-interface defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortDefaults {
    /// Interface name as typed at the CLI, e.g. `g0/0/1`.
    pub name: String,

    /// Explicitly shut or un-shut the interface. None = leave as is.
    pub shutdown: Option<bool>,

    /// Address to assign, with `mask`.
    pub ip: String,

    /// Subnet mask for `ip`.
    pub mask: String,
}

/// Console or vty line block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineDefaults {
    /// Line class.
    #[serde(rename = "type")]
    pub line_type: LineType,

    /// First line number; clamped to [0, 4].
    pub start_line: u8,

    /// Last line number; clamped to [0, 4].
    pub end_line: u8,

    /// Login mode (`local`, ...). Empty = unset; vty lines with a
    /// password default to `local`.
    pub login: String,

    /// Transport input mode (`ssh`, `telnet`, `all`); vty only.
    pub transport: String,

    /// Line password. None = no password command.
    pub password: Option<SecretString>,
}

impl LineDefaults {
    /// Start/end clamped to the device's line range.
    pub fn clamped_range(&self) -> (u8, u8) {
        (
            self.start_line.min(MAX_LINE_NUMBER),
            self.end_line.min(MAX_LINE_NUMBER),
        )
    }
}

/// Line class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Console,
    Vty,
}

impl std::fmt::Display for LineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::Vty => write!(f, "vty"),
        }
    }
}

/// SSH enablement block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SshDefaults {
    /// Whether to attempt SSH setup at all.
    pub enable: bool,

    /// Local username to create.
    pub username: String,

    /// Password for the local user.
    pub password: Option<SecretString>,

    /// RSA modulus size; 0 = use the default, otherwise clamped to
    /// [360, 2048].
    pub key_bits: u32,
}

impl SshDefaults {
    /// The modulus size actually sent to the device.
    pub fn clamped_key_bits(&self) -> u32 {
        if self.key_bits == 0 {
            DEFAULT_KEY_BITS
        } else {
            self.key_bits.clamp(MIN_KEY_BITS, MAX_KEY_BITS)
        }
    }
}

impl DeviceDefaults {
    /// Validate the template. Fatal problems are raised here, before any
    /// command is sent to a device.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for line in &self.lines {
            let (start, end) = line.clamped_range();
            if start > end {
                return Err(TemplateError::LineRange {
                    line_type: line.line_type.to_string(),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Whether all SSH prerequisites are present.
    ///
    /// SSH needs a username, a password, a domain name, and a hostname;
    /// when any is missing the SSH step is skipped with a warning rather
    /// than failing the run.
    pub fn ssh_ready(&self) -> bool {
        self.ssh.enable
            && !self.ssh.username.is_empty()
            && self
                .ssh
                .password
                .as_ref()
                .is_some_and(|p| !p.expose_secret().is_empty())
            && !self.domain_name.is_empty()
            && !self.hostname.is_empty()
    }
}
