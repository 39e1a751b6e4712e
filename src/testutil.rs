//! Test doubles for driving the state machines without hardware.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;
use crate::transport::ConsoleTransport;

/// A scripted console device for tests.
///
/// Every write is recorded and handed to the handler closure, whose
/// return bytes are queued as device output. `recv` drains the queue
/// immediately or sleeps out its timeout, so tests run with millisecond
/// timings.
pub struct ScriptedTransport {
    handler: Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>,
    rx: VecDeque<u8>,
    pub writes: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            rx: VecDeque::new(),
            writes: Vec::new(),
        }
    }

    /// A device that never answers writes.
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    /// Preload device output.
    pub fn with_output(mut self, output: &str) -> Self {
        self.rx.extend(output.as_bytes());
        self
    }

    /// Recorded writes as lossy strings.
    pub fn writes_str(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Recorded writes, CRLF-trimmed, excluding bare control bytes.
    pub fn commands(&self) -> Vec<String> {
        self.writes_str()
            .iter()
            .filter(|w| w.ends_with("\r\n"))
            .map(|w| w.trim_end_matches("\r\n").to_string())
            .collect()
    }

    /// How many times a given command line was written.
    pub fn count_command(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    /// How many single Ctrl-C bytes were written.
    pub fn count_interrupts(&self) -> usize {
        self.writes.iter().filter(|w| w.as_slice() == [0x03]).count()
    }
}

impl ConsoleTransport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.writes.push(data.to_vec());
        let reply = (self.handler)(data);
        self.rx.extend(reply);
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if self.rx.is_empty() {
            tokio::time::sleep(timeout).await;
            return Ok(0);
        }
        let n = buf.len().min(self.rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.rx.pop_front().expect("len checked");
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
