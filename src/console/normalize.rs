//! Line normalization for console output.
//!
//! Serial consoles pad lines with NUL bytes after breaks and baud
//! negotiation, and Cisco devices mix CR/LF line endings. Everything the
//! matchers and the classifier see goes through [`normalize`] first; raw
//! lines are kept verbatim in the transcript.

/// Strip NUL bytes and carriage returns and trim, preserving case.
///
/// Used where the original casing must survive, such as flash filenames
/// that get echoed back in `del` commands.
pub fn scrub(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != '\0' && c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalize a raw console line: strip NUL bytes and carriage returns,
/// trim surrounding whitespace, fold to lowercase.
///
/// An all-NUL buffer normalizes to the empty string.
pub fn normalize(raw: &str) -> String {
    scrub(raw).to_lowercase()
}
