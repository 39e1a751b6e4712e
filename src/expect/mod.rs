//! Generic console expect engine.
//!
//! One parameterized read-normalize-test loop replaces the many ad-hoc
//! "retransmit until the text appears" sites a console automation script
//! accumulates: [`await_condition`] reads a line, normalizes it, discards
//! syslog noise, and on mismatch optionally performs a [`Nudge`]
//! (retransmit) before sleeping and reading again. The matching style
//! (suffix for prompts, substring for banners) is chosen per call site
//! via the [`LineMatcher`] passed in.

use std::time::Duration;

use log::debug;

use crate::console::{is_syslog, normalize, ConsoleSession};
use crate::error::Result;
use crate::fsm::RunControl;
use crate::transport::ConsoleTransport;

/// Default read buffer for a single line.
pub const DEFAULT_LINE_LEN: usize = 500;

/// Enlarged line buffer for flash directory listings.
pub const LISTING_LINE_LEN: usize = 16384;

/// Trait for testing a normalized line against an expectation.
///
/// Regex patterns and plain closures implement it too, so call sites can
/// pass whatever reads best.
pub trait LineMatcher: Send + Sync {
    /// Check the normalized line.
    fn is_match(&self, line: &str) -> bool;
}

/// Suffix match, used for prompts (`router#`, `rommon 1 >`).
pub struct Suffix(pub String);

impl Suffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }
}

impl LineMatcher for Suffix {
    fn is_match(&self, line: &str) -> bool {
        !line.is_empty() && line.ends_with(&self.0)
    }
}

/// Substring match, used for banners and free-text phrases.
pub struct Contains(pub String);

impl Contains {
    pub fn new(needle: impl Into<String>) -> Self {
        Self(needle.into())
    }
}

impl LineMatcher for Contains {
    fn is_match(&self, line: &str) -> bool {
        line.contains(&self.0)
    }
}

/// Matches when any inner matcher matches.
pub struct AnyOf(pub Vec<Box<dyn LineMatcher>>);

impl LineMatcher for AnyOf {
    fn is_match(&self, line: &str) -> bool {
        self.0.iter().any(|m| m.is_match(line))
    }
}

impl LineMatcher for regex::Regex {
    fn is_match(&self, line: &str) -> bool {
        regex::Regex::is_match(self, line)
    }
}

impl<F> LineMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_match(&self, line: &str) -> bool {
        self(line)
    }
}

/// Retransmit action performed when a read does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    /// Send a bare CRLF.
    Newline,
    /// Send a single Ctrl-C byte.
    Interrupt,
    /// Send nothing; just poll again.
    None,
}

/// Poll/read cadence for an FSM run.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Sleep between mismatched reads.
    pub poll_interval: Duration,
    /// Per-read timeout.
    pub read_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// Options for one [`await_condition`] call.
pub struct ExpectOptions {
    /// Retransmit action on mismatch.
    pub nudge: Nudge,
    /// Sleep between mismatched reads.
    pub poll_interval: Duration,
    /// Per-read timeout.
    pub read_timeout: Duration,
    /// Line buffer size.
    pub max_line_len: usize,
    /// Interjection replies: when a non-matching line contains the
    /// normalized substring, the reply is sent and the loop re-reads
    /// without nudging (used for `[yes/no]`-style questions).
    pub answers: Vec<(String, String)>,
}

impl Default for ExpectOptions {
    fn default() -> Self {
        Self {
            nudge: Nudge::None,
            poll_interval: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
            max_line_len: DEFAULT_LINE_LEN,
            answers: Vec::new(),
        }
    }
}

impl ExpectOptions {
    pub fn new(nudge: Nudge) -> Self {
        Self {
            nudge,
            ..Self::default()
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.poll_interval = timing.poll_interval;
        self.read_timeout = timing.read_timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    pub fn with_answer(mut self, question: impl Into<String>, reply: impl Into<String>) -> Self {
        self.answers.push((question.into(), reply.into()));
        self
    }
}

/// Read lines until one satisfies the matcher; returns the raw matched line.
///
/// Per iteration: read one line, normalize it. Syslog noise is logged and
/// the loop re-reads immediately: noise can never satisfy the matcher,
/// and more output may already be queued behind it. A genuine mismatch
/// performs the nudge and sleeps `poll_interval` first. The loop is
/// iteration-unbounded: it ends only on matcher success, a hard transport
/// error, or the run's cancellation/deadline tripping.
pub async fn await_condition<T, M>(
    session: &mut ConsoleSession<T>,
    control: &RunControl,
    matcher: &M,
    options: &ExpectOptions,
) -> Result<String>
where
    T: ConsoleTransport,
    M: LineMatcher + ?Sized,
{
    loop {
        control.check()?;

        let raw = session
            .read_line(options.max_line_len, options.read_timeout)
            .await?;
        let line = normalize(&raw);

        if !line.is_empty() && is_syslog(&line) {
            debug!("discarding syslog noise: {line}");
            continue;
        }

        if matcher.is_match(&line) {
            return Ok(raw);
        }

        if let Some((question, reply)) = options
            .answers
            .iter()
            .find(|(question, _)| !line.is_empty() && line.contains(question.as_str()))
        {
            debug!("answering {question:?} with {reply:?}");
            session.send_line(reply).await?;
            continue;
        }

        match options.nudge {
            Nudge::Newline => session.send_line("").await?,
            Nudge::Interrupt => session.send_interrupt().await?,
            Nudge::None => {}
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedTransport;

    fn fast() -> ExpectOptions {
        ExpectOptions::new(Nudge::Newline).with_timing(Timing {
            poll_interval: Duration::from_millis(1),
            read_timeout: Duration::from_millis(20),
        })
    }

    #[tokio::test]
    async fn test_match_on_third_read_two_retransmits() {
        let transport = ScriptedTransport::silent().with_output("one\ntwo\nthree\n");
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();

        let matched = await_condition(
            &mut session,
            &control,
            &|line: &str| line == "three",
            &fast(),
        )
        .await
        .unwrap();

        assert_eq!(matched, "three");
        // Exactly two mismatches, so exactly two CRLF retransmits.
        assert_eq!(session.transport.count_command(""), 2);
    }

    #[tokio::test]
    async fn test_suffix_match_on_prompt() {
        let transport = ScriptedTransport::silent().with_output("some output\nRouter>");
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();

        let matched = await_condition(
            &mut session,
            &control,
            &Suffix::new("router>"),
            &fast(),
        )
        .await
        .unwrap();
        assert_eq!(matched, "Router>");
    }

    #[tokio::test]
    async fn test_syslog_noise_never_matches_and_never_nudges() {
        // The syslog line ends with the prompt text, but noise must not
        // satisfy a prompt predicate; it must also not trigger a nudge.
        let transport = ScriptedTransport::silent().with_output(
            "*Mar  1 00:01:19.001: %LINK-3-UPDOWN: router#\nrouter#",
        );
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();

        let matched =
            await_condition(&mut session, &control, &Suffix::new("router#"), &fast())
                .await
                .unwrap();
        assert_eq!(normalize(&matched), "router#");
        assert_eq!(session.transport.count_command(""), 0);
    }

    #[tokio::test]
    async fn test_interrupt_nudge() {
        let mut countdown = 2;
        let transport = ScriptedTransport::new(move |w: &[u8]| {
            if w == [0x03] {
                countdown -= 1;
                if countdown == 0 {
                    return b"rommon 1 >".to_vec();
                }
            }
            Vec::new()
        });
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();

        let options = ExpectOptions {
            nudge: Nudge::Interrupt,
            ..fast()
        };
        await_condition(&mut session, &control, &Suffix::new("rommon 1 >"), &options)
            .await
            .unwrap();
        assert_eq!(session.transport.count_interrupts(), 2);
    }

    #[tokio::test]
    async fn test_answer_interjection() {
        let transport = ScriptedTransport::new(|w: &[u8]| {
            if w == b"no\r\n" {
                b"Router>".to_vec()
            } else {
                Vec::new()
            }
        })
        .with_output(
            "Would you like to enter the initial configuration dialog? [yes/no]:",
        );
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();

        let options = fast().with_answer("initial configuration dialog", "no");
        await_condition(&mut session, &control, &Suffix::new("router>"), &options)
            .await
            .unwrap();
        assert_eq!(session.transport.count_command("no"), 1);
    }

    #[tokio::test]
    async fn test_deadline_trips_the_loop() {
        let transport = ScriptedTransport::silent();
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new().with_deadline_in(Duration::from_millis(30));

        let result =
            await_condition(&mut session, &control, &Suffix::new("never"), &fast()).await;
        assert!(matches!(
            result,
            Err(crate::Error::Run(crate::error::RunError::DeadlineExceeded))
        ));
    }

    #[tokio::test]
    async fn test_cancellation_trips_the_loop() {
        let transport = ScriptedTransport::silent();
        let mut session = ConsoleSession::new(transport);
        let control = RunControl::new();
        control.cancel();

        let result =
            await_condition(&mut session, &control, &Suffix::new("never"), &fast()).await;
        assert!(matches!(
            result,
            Err(crate::Error::Run(crate::error::RunError::Cancelled))
        ));
    }

    #[test]
    fn test_any_of_matcher() {
        let matcher = AnyOf(vec![
            Box::new(Contains::new("password-recovery")),
            Box::new(Contains::new("switch:")),
            Box::new(Contains::new("switches:")),
        ]);
        assert!(matcher.is_match("the password-recovery mechanism is enabled"));
        assert!(matcher.is_match("switch:"));
        assert!(matcher.is_match("switches:"));
        // "switches:" is not a superstring of "switch:"; only the third
        // arm accepts it.
        assert!(!Contains::new("switch:").is_match("switches:"));
        assert!(!matcher.is_match("router#"));
    }
}
