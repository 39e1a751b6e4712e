//! Switch factory reset from the boot loader.
//!
//! Catalyst-style switches recover through the boot loader rather than
//! ROMMON: the operator holds the Mode button while reconnecting power,
//! the loader prints a password-recovery banner, and the reset proceeds
//! by erasing the stored configuration from `flash:`. When password
//! recovery has been disabled on the device, the loader instead offers a
//! one-question wipe-and-boot, which is taken as the reset.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use super::{OperatorGate, RunContext};
use crate::console::{normalize, scrub};
use crate::error::{Result, RunError};
use crate::expect::{AnyOf, Contains, ExpectOptions, LineMatcher, Nudge, Timing, LISTING_LINE_LEN};
use crate::flash::files_to_erase;
use crate::transport::ConsoleTransport;

/// Boot loader prompt spellings; consoles render `switch:` or
/// `switches:` depending on model.
const SWITCH_PROMPTS: [&str; 2] = ["switch:", "switches:"];

/// A line showing the boot loader prompt, in either spelling.
fn is_switch_prompt(line: &str) -> bool {
    SWITCH_PROMPTS.iter().any(|p| line.contains(p))
}

/// Banner substring present in both the recovery-enabled and
/// recovery-disabled variants.
const RECOVERY_BANNER: &str = "password-recovery";

/// Flash listings stream slowly relative to prompts; each read gets a
/// long leash.
const LISTING_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Lines drained after the final `reset` before declaring completion.
const DRAIN_LINES: usize = 10;

/// Boot-loader reset state machine for switches.
pub struct SwitchReset {
    gate: Arc<dyn OperatorGate>,
    timing: Timing,
    listing_timeout: Duration,
}

impl SwitchReset {
    pub fn new(gate: Arc<dyn OperatorGate>) -> Self {
        Self {
            gate,
            timing: Timing::default(),
            listing_timeout: LISTING_READ_TIMEOUT,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_listing_timeout(mut self, timeout: Duration) -> Self {
        self.listing_timeout = timeout;
        self
    }

    pub async fn run<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        let banner = self.wait_recovery_banner(ctx).await?;

        if banner.contains(RECOVERY_BANNER) && banner.contains("disabled") {
            self.reset_via_disabled_recovery(ctx).await?;
        } else {
            self.flash_init(ctx).await?;
            let listing = self.dir_listing(ctx).await?;
            let targets = files_to_erase(listing.iter().map(String::as_str));
            self.delete_files(ctx, &targets).await?;
            self.restart(ctx).await?;
        }

        ctx.progress("Switch reset complete");
        ctx.finish();
        Ok(())
    }

    /// Wait for the loader's recovery banner (or bare prompt), then get
    /// operator confirmation that the Mode-button sequence was done.
    async fn wait_recovery_banner<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
    ) -> Result<String> {
        ctx.progress("Waiting for the boot loader");
        let matcher = AnyOf(vec![
            Box::new(Contains::new(RECOVERY_BANNER)) as Box<dyn LineMatcher>,
            Box::new(is_switch_prompt as fn(&str) -> bool),
        ]);
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        let raw = ctx.await_line(&matcher, &options).await?;

        let confirmed = self
            .gate
            .confirm("Hold the Mode button while reconnecting power, then confirm")
            .await;
        if !confirmed {
            return Err(RunError::OperatorDeclined("switch reset".to_string()).into());
        }
        Ok(normalize(&raw))
    }

    /// Password recovery is disabled: answering the loader's one
    /// question wipes the configuration, so take that as the reset.
    async fn reset_via_disabled_recovery<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
    ) -> Result<()> {
        info!("password recovery disabled; taking the wipe-and-boot path");
        ctx.progress("Password recovery disabled; wiping via the loader prompt");
        let options = ExpectOptions::new(Nudge::None).with_timing(self.timing);

        ctx.await_line(&Contains::new("(y/n)?"), &options).await?;
        ctx.send_line("y").await?;
        ctx.await_line(&is_switch_prompt, &options).await?;
        ctx.send_line("boot").await?;
        self.drain(ctx).await?;
        Ok(())
    }

    async fn flash_init<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        ctx.progress("Initializing flash");
        let options = ExpectOptions::new(Nudge::None).with_timing(self.timing);
        ctx.send_line("flash_init").await?;
        ctx.await_line(&is_switch_prompt, &options).await?;
        Ok(())
    }

    /// Capture the full `dir flash:` output, terminal prompt line
    /// included. Listing lines arrive in bursts, so only an empty read
    /// nudges; anything else is accumulated and re-read immediately.
    async fn dir_listing<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
    ) -> Result<Vec<String>> {
        ctx.send_line("dir flash:").await?;

        let mut lines = Vec::new();
        loop {
            ctx.control().check()?;
            let raw = ctx.read_once(LISTING_LINE_LEN, self.listing_timeout).await?;
            let line = normalize(&raw);
            // Filenames are echoed back in del commands, so the kept
            // copy preserves casing; the lowered copy only drives the
            // prompt and nudge decisions.
            lines.push(scrub(&raw));
            if is_switch_prompt(&line) {
                return Ok(lines);
            }
            if line.is_empty() {
                ctx.send_line("").await?;
                tokio::time::sleep(self.timing.poll_interval).await;
            }
        }
    }

    /// Delete the selected files. Each delete is fire-and-mostly-forget:
    /// one read after the command, one after the `y`, success not
    /// independently verified.
    async fn delete_files<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        targets: &indexmap::IndexSet<String>,
    ) -> Result<()> {
        if targets.is_empty() {
            debug!("no configuration files on flash; nothing to delete");
            ctx.progress("No configuration files found on flash");
            return Ok(());
        }
        for file in targets {
            ctx.progress(format!("Deleting flash:{file}"));
            ctx.send_line(&format!("del flash:{file}")).await?;
            ctx.read_once(LISTING_LINE_LEN, self.timing.read_timeout).await?;
            ctx.send_line("y").await?;
            ctx.read_once(LISTING_LINE_LEN, self.timing.read_timeout).await?;
        }
        Ok(())
    }

    async fn restart<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        ctx.progress("Restarting");
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        ctx.await_line(&is_switch_prompt, &options).await?;
        ctx.send_line("reset").await?;
        ctx.read_once(LISTING_LINE_LEN, self.timing.read_timeout).await?;
        ctx.send_line("y").await?;
        self.drain(ctx).await?;
        Ok(())
    }

    /// Swallow a bounded amount of boot chatter so the transcript shows
    /// the device actually went down.
    async fn drain<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        for _ in 0..DRAIN_LINES {
            ctx.read_once(LISTING_LINE_LEN, self.timing.read_timeout).await?;
        }
        Ok(())
    }
}
