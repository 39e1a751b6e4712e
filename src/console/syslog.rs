//! Classifier for asynchronous syslog noise on the console stream.
//!
//! Cisco devices interleave log lines with command replies on the same
//! console. A log line carries a timestamp token (optionally `*`-prefixed,
//! optionally preceded by a sequence number) followed by a
//! `%FACILITY-SEVERITY-MNEMONIC:` token:
//!
//! ```text
//! *Mar  1 00:01:18.915: %LINK-3-UPDOWN: Interface GigabitEthernet0/0/0, changed state to up
//! 000123: *Mar  1 00:02:04.101: %SYS-5-CONFIG_I: Configured from console by console
//! ```
//!
//! The expect loop uses this to keep waiting for a real reply instead of
//! mistaking noise for one.

use once_cell::sync::Lazy;
use regex::Regex;

// Operates on normalized (lowercased) lines. Timestamp forms covered:
// "mar  1 00:01:18.915", bare uptime "00:01:18", with optional trailing
// timezone token, each terminated by ": " before the facility token.
static SYSLOG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\*? ?(?:\d+: \*?)?(?:[a-z]{3} +\d{1,2} )?\d{1,2}:\d{2}:\d{2}(?:\.\d{1,3})?(?: [a-z]{3,4})?: %[a-z0-9_]+-\d+-[a-z0-9_]+:",
    )
    .unwrap()
});

/// Returns true when the normalized line is asynchronous device log
/// output rather than a command reply.
///
/// The input must already be [`normalize`](super::normalize)d.
pub fn is_syslog(line: &str) -> bool {
    SYSLOG_RE.is_match(line)
}
