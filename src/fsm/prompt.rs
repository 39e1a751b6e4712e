//! Live prompt tracking.

use crate::expect::Suffix;

/// CLI mode, as reflected in the prompt suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    /// `hostname>`
    UserExec,
    /// `hostname#`
    PrivExec,
    /// `hostname(config)#`
    Config,
    /// `hostname(config-if)#`
    ConfigIf,
    /// `hostname(config-line)#`
    ConfigLine,
}

/// The prompt currently expected from the device, derived from hostname
/// and CLI mode. Mutates only when one of those changes (the `hostname`
/// command, or a mode transition).
#[derive(Debug, Clone)]
pub struct Prompt {
    hostname: String,
    mode: CliMode,
}

impl Prompt {
    /// Start in user exec mode. The hostname is folded to lowercase to
    /// match normalized console lines.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into().to_lowercase(),
            mode: CliMode::UserExec,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn mode(&self) -> CliMode {
        self.mode
    }

    pub fn set_hostname(&mut self, hostname: &str) {
        self.hostname = hostname.to_lowercase();
    }

    pub fn set_mode(&mut self, mode: CliMode) {
        self.mode = mode;
    }

    /// The normalized prompt text.
    pub fn render(&self) -> String {
        match self.mode {
            CliMode::UserExec => format!("{}>", self.hostname),
            CliMode::PrivExec => format!("{}#", self.hostname),
            CliMode::Config => format!("{}(config)#", self.hostname),
            CliMode::ConfigIf => format!("{}(config-if)#", self.hostname),
            CliMode::ConfigLine => format!("{}(config-line)#", self.hostname),
        }
    }

    /// Suffix matcher for the current prompt.
    pub fn matcher(&self) -> Suffix {
        Suffix::new(self.render())
    }

    /// Matcher for a specific mode without changing the live state.
    pub fn matcher_for(&self, mode: CliMode) -> Suffix {
        let mut prompt = self.clone();
        prompt.set_mode(mode);
        prompt.matcher()
    }
}
