//! Per-run console transcript.

use std::path::Path;

/// Ordered, append-only record of every line read during a run.
///
/// Raw lines are recorded before normalization so the dump shows exactly
/// what the device sent. One transcript is owned by one session; nothing
/// is shared between runs.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// The recorded lines in append order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of recorded lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Flush the transcript verbatim, in append order, to a file for
    /// offline review.
    pub async fn flush_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut contents = self.lines.join("\n");
        contents.push('\n');
        tokio::fs::write(path, contents).await
    }
}
