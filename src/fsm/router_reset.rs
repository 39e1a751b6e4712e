//! Router recovery and factory reset.
//!
//! Drives a router from a wedged or password-locked state back to a
//! clean one: break into ROMMON, boot past the startup config, wipe
//! NVRAM (optionally backing the config up over TFTP first), restore the
//! normal configuration register, and reload.

use std::sync::Arc;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{CliMode, Prompt, RunContext};
use crate::backup::{Addressing, BackupCoordinator, BackupParameters, BackupPlan, TftpLauncher};
use crate::error::Result;
use crate::expect::{Contains, ExpectOptions, LineMatcher, Nudge, Suffix, Timing};
use crate::transport::ConsoleTransport;

/// Hostname a factory-fresh router boots with.
const RECOVERY_HOSTNAME: &str = "router";

/// First ROMMON prompt after the break.
const ROMMON_FIRST_PROMPT: &str = "rommon 1 >";

/// Any numbered ROMMON prompt; the number increments per command.
static ROMMON_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^rommon \d+ >$").unwrap());

const BOOT_BANNER: &str = "press return to get started";
const CONFIG_MODE_BANNER: &str = "enter configuration commands";

/// ROMMON-recovery state machine for routers.
pub struct RouterReset {
    backup: BackupParameters,
    launcher: Option<Arc<dyn TftpLauncher>>,
    timing: Timing,
}

impl RouterReset {
    pub fn new(backup: BackupParameters) -> Self {
        Self {
            backup,
            launcher: None,
            timing: Timing::default(),
        }
    }

    /// Supply the launcher used when the parameters request the built-in
    /// TFTP server.
    pub fn with_launcher(mut self, launcher: Arc<dyn TftpLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Run the recovery to completion. Any transport error aborts
    /// immediately; there is no partial resume.
    pub async fn run<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        self.seek_rommon(ctx).await?;
        self.rommon_configure(ctx).await?;
        self.boot_wait(ctx).await?;
        self.shell_ready(ctx).await?;

        let coordinator = BackupCoordinator::new(&self.backup, self.launcher.clone());
        let plan = coordinator.plan().clone();
        if let BackupPlan::Disabled { reasons } = &plan {
            for reason in reasons {
                warn!("backup disabled: {reason}");
                ctx.progress(format!("Backup disabled: {reason}"));
            }
        }
        let handle = coordinator.begin().await?;

        self.command_loop(ctx, &plan).await?;
        self.reload_confirm(ctx).await?;

        // Only after the terminal confirmation may the server stop.
        coordinator.finish(handle).await;
        ctx.progress("Router reset complete");
        ctx.finish();
        Ok(())
    }

    /// Send Ctrl-C until the device drops into ROMMON.
    async fn seek_rommon<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        ctx.progress("Breaking into ROMMON");
        let options = ExpectOptions::new(Nudge::Interrupt).with_timing(self.timing);
        ctx.await_line(&Suffix::new(ROMMON_FIRST_PROMPT), &options)
            .await?;
        Ok(())
    }

    /// Point the config register past the startup config and reboot.
    async fn rommon_configure<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        ctx.progress("Setting configuration register 0x2142");
        let options = ExpectOptions::new(Nudge::None).with_timing(self.timing);

        ctx.send_line("confreg 0x2142").await?;
        ctx.await_line(&*ROMMON_PROMPT, &options).await?;

        ctx.progress("Rebooting");
        ctx.send_line("reset").await?;
        Ok(())
    }

    /// Wait out the boot until the press-return banner.
    async fn boot_wait<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        ctx.send_line("").await?;
        let options = ExpectOptions::new(Nudge::None).with_timing(self.timing);
        ctx.await_line(&Contains::new(BOOT_BANNER), &options).await?;
        Ok(())
    }

    /// Nudge past the banner to the user exec prompt.
    async fn shell_ready<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        let prompt = Prompt::new(RECOVERY_HOSTNAME);
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        ctx.await_line(&prompt.matcher(), &options).await?;
        ctx.progress("Device shell ready");
        Ok(())
    }

    /// The ordered command/response exchanges of the reset proper.
    ///
    /// After each command the expect loop treats syslog noise and
    /// non-matching replies the same way: retransmit a blank line and
    /// read again until the expected prompt suffix (or banner substring)
    /// shows up.
    async fn command_loop<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        plan: &BackupPlan,
    ) -> Result<()> {
        let prompt = Prompt::new(RECOVERY_HOSTNAME);
        let mut steps: Vec<(String, Box<dyn LineMatcher>)> = vec![
            (
                "enable".into(),
                Box::new(prompt.matcher_for(CliMode::PrivExec)),
            ),
            (
                "conf t".into(),
                Box::new(Contains::new(CONFIG_MODE_BANNER)),
            ),
            (
                "config-register 0x2102".into(),
                Box::new(prompt.matcher_for(CliMode::Config)),
            ),
        ];

        if let BackupPlan::Enabled { addressing, .. } = plan {
            let ip_command = match addressing {
                Addressing::Static { ip, mask } => format!("ip addr {ip} {mask}"),
                Addressing::Dhcp => "ip addr dhcp".to_string(),
            };
            steps.push((
                "inter g0/0/0".into(),
                Box::new(prompt.matcher_for(CliMode::ConfigIf)),
            ));
            steps.push((ip_command, Box::new(prompt.matcher_for(CliMode::ConfigIf))));
            steps.push((
                "no shutdown".into(),
                Box::new(prompt.matcher_for(CliMode::ConfigIf)),
            ));
        }

        steps.push((
            "end".into(),
            Box::new(prompt.matcher_for(CliMode::PrivExec)),
        ));

        if let BackupPlan::Enabled {
            destination,
            filename,
            ..
        } = plan
        {
            ctx.progress(format!("Backing up startup-config to {destination}"));
            steps.push((
                format!("copy startup-config tftp://{destination}/{filename}"),
                Box::new(prompt.matcher_for(CliMode::PrivExec)),
            ));
        }

        steps.push((
            "erase nvram:".into(),
            Box::new(prompt.matcher_for(CliMode::PrivExec)),
        ));
        // The trailing blank confirms the erase.
        steps.push((
            String::new(),
            Box::new(prompt.matcher_for(CliMode::PrivExec)),
        ));

        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        for (command, expected) in steps {
            if !command.is_empty() {
                ctx.progress(format!("Sending: {command}"));
            }
            ctx.send_line(&command).await?;
            ctx.await_line(expected.as_ref(), &options).await?;
        }
        ctx.progress("NVRAM erased");
        Ok(())
    }

    /// Reload and answer the confirmation questions.
    async fn reload_confirm<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        let options = ExpectOptions::new(Nudge::None).with_timing(self.timing);

        ctx.progress("Reloading");
        ctx.send_line("reload").await?;
        ctx.await_line(&Contains::new("[yes/no]:"), &options).await?;
        ctx.send_line("yes").await?;
        ctx.await_line(&Contains::new("[confirm]"), &options).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::backup::TftpHandle;
    use crate::error::Result;
    use crate::progress::{ProgressSink, COMPLETION_SENTINEL};
    use crate::fsm::RunControl;
    use crate::testutil::ScriptedTransport;

    fn fast_timing() -> Timing {
        Timing {
            poll_interval: Duration::from_millis(1),
            read_timeout: Duration::from_millis(20),
        }
    }

    /// Simulated router: ROMMON after three breaks, then a normal boot
    /// and IOS command handling.
    fn simulated_router() -> ScriptedTransport {
        let mut ctrl_c = 0usize;
        let mut prompt = String::new();
        ScriptedTransport::new(move |w: &[u8]| {
            if w == [0x03] {
                ctrl_c += 1;
                return if ctrl_c == 3 {
                    b"rommon 1 >".to_vec()
                } else {
                    Vec::new()
                };
            }
            let written = String::from_utf8_lossy(w);
            let cmd = written.trim_end_matches("\r\n");
            match cmd {
                "confreg 0x2142" => b"rommon 2 >".to_vec(),
                "reset" => {
                    prompt = "Router>".to_string();
                    b"System Bootstrap, Version 15.0\nPress RETURN to get started!\n".to_vec()
                }
                "enable" => {
                    prompt = "Router#".to_string();
                    prompt.clone().into_bytes()
                }
                "conf t" => {
                    prompt = "Router(config)#".to_string();
                    b"Enter configuration commands, one per line.  End with CNTL/Z.\n".to_vec()
                }
                "inter g0/0/0" => {
                    prompt = "Router(config-if)#".to_string();
                    prompt.clone().into_bytes()
                }
                "end" => {
                    prompt = "Router#".to_string();
                    prompt.clone().into_bytes()
                }
                "erase nvram:" => {
                    b"Erasing the nvram filesystem will remove all configuration files! Continue? [confirm]\n"
                        .to_vec()
                }
                "reload" => b"System configuration has been modified. Save? [yes/no]:".to_vec(),
                "yes" => b"Proceed with reload? [confirm]".to_vec(),
                _ => prompt.clone().into_bytes(),
            }
        })
    }

    #[tokio::test]
    async fn test_full_reset_without_backup() {
        let (sink, mut rx) = ProgressSink::channel(64);
        let mut ctx = RunContext::new(simulated_router(), sink, RunControl::new());

        RouterReset::new(BackupParameters::default())
            .with_timing(fast_timing())
            .run(&mut ctx)
            .await
            .unwrap();

        let transport = &ctx.session_mut().transport;
        // Exactly three breaks were needed, so SeekRommon looped at
        // least three times (two discarded reads before the prompt).
        assert_eq!(transport.count_interrupts(), 3);
        assert_eq!(transport.count_command("confreg 0x2142"), 1);
        assert_eq!(transport.count_command("reset"), 1);
        assert_eq!(transport.count_command("erase nvram:"), 1);
        assert_eq!(transport.count_command("reload"), 1);
        // No backup: no interface bring-up, no copy.
        assert_eq!(transport.count_command("inter g0/0/0"), 0);
        assert!(transport.commands().iter().all(|c| !c.starts_with("copy ")));
        assert!(ctx.transcript().len() >= 3);

        let mut messages = Vec::new();
        while let Ok(m) = rx.try_recv() {
            messages.push(m);
        }
        assert_eq!(messages.last().map(String::as_str), Some(COMPLETION_SENTINEL));
    }

    struct RecordingLauncher {
        started: AtomicBool,
    }

    #[async_trait]
    impl TftpLauncher for RecordingLauncher {
        async fn launch(&self) -> Result<TftpHandle> {
            self.started.store(true, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            let task = tokio::spawn(async move {
                let _ = rx.await;
            });
            Ok(TftpHandle::new(tx, task))
        }
    }

    #[tokio::test]
    async fn test_full_reset_with_builtin_backup() {
        let launcher = Arc::new(RecordingLauncher {
            started: AtomicBool::new(false),
        });
        let params = BackupParameters {
            enabled: true,
            use_builtin_server: true,
            source_ip: Some(Ipv4Addr::new(10, 0, 0, 2)),
            subnet_mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            destination_host: "10.0.0.1".to_string(),
            filename_prefix: "lab7".to_string(),
        };

        let (sink, _rx) = ProgressSink::channel(64);
        let mut ctx = RunContext::new(simulated_router(), sink, RunControl::new());

        RouterReset::new(params)
            .with_launcher(launcher.clone())
            .with_timing(fast_timing())
            .run(&mut ctx)
            .await
            .unwrap();

        assert!(launcher.started.load(Ordering::SeqCst));
        let commands = ctx.session_mut().transport.commands();
        assert!(commands.contains(&"inter g0/0/0".to_string()));
        assert!(commands.contains(&"ip addr 10.0.0.2 255.255.255.0".to_string()));
        assert!(commands.contains(&"no shutdown".to_string()));
        assert!(commands
            .contains(&"copy startup-config tftp://10.0.0.1/lab7-router-config.txt".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_backup_params_downgrade_and_still_complete() {
        let params = BackupParameters {
            enabled: true,
            use_builtin_server: false,
            source_ip: Some(Ipv4Addr::new(10, 0, 0, 2)),
            subnet_mask: None,
            destination_host: String::new(),
            filename_prefix: "x".to_string(),
        };

        let (sink, mut rx) = ProgressSink::channel(64);
        let mut ctx = RunContext::new(simulated_router(), sink, RunControl::new());

        RouterReset::new(params)
            .with_timing(fast_timing())
            .run(&mut ctx)
            .await
            .unwrap();

        // Downgraded, not fatal: no copy was attempted and the run still
        // reached the sentinel.
        let commands = ctx.session_mut().transport.commands();
        assert!(commands.iter().all(|c| !c.starts_with("copy ")));

        let mut messages = Vec::new();
        while let Ok(m) = rx.try_recv() {
            messages.push(m);
        }
        assert!(messages.iter().any(|m| m.contains("Backup disabled")));
        assert_eq!(messages.last().map(String::as_str), Some(COMPLETION_SENTINEL));
    }
}
