//! Apply a [`DeviceDefaults`] template to a freshly reset router.
//!
//! Assumes the device is at (or booting toward) the user exec prompt of
//! a blank configuration. The template is validated up front; nothing is
//! sent to the device until it passes.

use std::time::Duration;

use log::warn;
use secrecy::ExposeSecret;

use super::{CliMode, Prompt, RunContext};
use crate::error::Result;
use crate::expect::{Contains, ExpectOptions, Nudge, Timing, DEFAULT_LINE_LEN};
use crate::template::{DeviceDefaults, LineType};
use crate::transport::ConsoleTransport;

/// Hostname a blank router answers with before the template renames it.
const FACTORY_HOSTNAME: &str = "router";

const INITIAL_DIALOG: &str = "initial configuration dialog";
const KEY_BITS_QUESTION: &str = "how many bits in the modulus";

/// RSA key generation is slow on real hardware; widen the per-read
/// timeout while waiting for it.
const KEY_GEN_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Template-application state machine for routers.
pub struct RouterDefaults {
    template: DeviceDefaults,
    timing: Timing,
}

impl RouterDefaults {
    pub fn new(template: DeviceDefaults) -> Self {
        Self {
            template,
            timing: Timing::default(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub async fn run<T: ConsoleTransport>(&self, ctx: &mut RunContext<T>) -> Result<()> {
        self.template.validate()?;

        let mut prompt = Prompt::new(FACTORY_HOSTNAME);
        self.shell_ready(ctx, &prompt).await?;
        self.enter_config(ctx, &prompt).await?;
        self.configure_ports(ctx, &prompt).await?;
        self.configure_lines(ctx, &prompt).await?;
        self.apply_singles(ctx, &mut prompt).await?;
        self.setup_ssh(ctx, &prompt).await?;

        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        ctx.send_line("end").await?;
        ctx.await_line(&prompt.matcher_for(CliMode::PrivExec), &options)
            .await?;

        ctx.progress("Defaults applied");
        ctx.finish();
        Ok(())
    }

    /// Nudge to the user exec prompt, declining the initial
    /// configuration dialog if the device offers it.
    async fn shell_ready<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &Prompt,
    ) -> Result<()> {
        let options = ExpectOptions::new(Nudge::Newline)
            .with_timing(self.timing)
            .with_answer(INITIAL_DIALOG, "no");
        ctx.await_line(&prompt.matcher_for(CliMode::UserExec), &options)
            .await?;
        ctx.progress("Device shell ready");
        Ok(())
    }

    async fn enter_config<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &Prompt,
    ) -> Result<()> {
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);

        ctx.send_line("enable").await?;
        ctx.await_line(&prompt.matcher_for(CliMode::PrivExec), &options)
            .await?;
        ctx.send_line("conf t").await?;
        ctx.await_line(&prompt.matcher_for(CliMode::Config), &options)
            .await?;
        Ok(())
    }

    async fn configure_ports<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &Prompt,
    ) -> Result<()> {
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        let in_interface = prompt.matcher_for(CliMode::ConfigIf);

        for port in &self.template.ports {
            ctx.progress(format!("Configuring port {}", port.name));
            ctx.send_line(&format!("inter {}", port.name)).await?;
            ctx.await_line(&in_interface, &options).await?;

            if !port.ip.is_empty() && !port.mask.is_empty() {
                ctx.send_line(&format!("ip addr {} {}", port.ip, port.mask))
                    .await?;
                ctx.await_line(&in_interface, &options).await?;
            }

            let admin_state = if port.shutdown == Some(true) {
                "shutdown"
            } else {
                "no shutdown"
            };
            ctx.send_line(admin_state).await?;
            ctx.await_line(&in_interface, &options).await?;

            ctx.send_line("exit").await?;
            ctx.await_line(&prompt.matcher_for(CliMode::Config), &options)
                .await?;
        }
        Ok(())
    }

    async fn configure_lines<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &Prompt,
    ) -> Result<()> {
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        let in_line = prompt.matcher_for(CliMode::ConfigLine);

        for line in &self.template.lines {
            let (start, end) = line.clamped_range();
            ctx.progress(format!("Configuring {} line {start}-{end}", line.line_type));

            // A single line takes no end argument (`line console 0`);
            // a range takes both.
            let select = if start == end {
                format!("line {} {start}", line.line_type)
            } else {
                format!("line {} {start} {end}", line.line_type)
            };
            ctx.send_line(&select).await?;
            ctx.await_line(&in_line, &options).await?;

            if let Some(password) = &line.password {
                ctx.send_line(&format!("password {}", password.expose_secret()))
                    .await?;
                ctx.await_line(&in_line, &options).await?;
            }

            // Remote lines with a password but no stated login mode get
            // local login rather than silently no authentication.
            let login = if line.login.is_empty() {
                if line.line_type == LineType::Vty && line.password.is_some() {
                    Some("local".to_string())
                } else {
                    None
                }
            } else {
                Some(line.login.clone())
            };
            if let Some(mode) = login {
                ctx.send_line(&format!("login {mode}")).await?;
                ctx.await_line(&in_line, &options).await?;
            }

            if line.line_type == LineType::Vty && !line.transport.is_empty() {
                ctx.send_line(&format!("transport input {}", line.transport))
                    .await?;
                ctx.await_line(&in_line, &options).await?;
            }

            ctx.send_line("exit").await?;
            ctx.await_line(&prompt.matcher_for(CliMode::Config), &options)
                .await?;
        }
        Ok(())
    }

    /// Single global-config commands sent best-effort: one bounded read
    /// apiece, no wait loop. The hostname change also retargets the
    /// prompt every later step expects.
    async fn apply_singles<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &mut Prompt,
    ) -> Result<()> {
        let t = &self.template;
        let mut singles = Vec::new();
        if !t.default_route.is_empty() {
            singles.push(format!("ip route 0.0.0.0 0.0.0.0 {}", t.default_route));
        }
        if !t.domain_name.is_empty() {
            singles.push(format!("ip domain name {}", t.domain_name));
        }
        if let Some(password) = &t.enable_password {
            singles.push(format!("enable secret {}", password.expose_secret()));
        }
        if !t.hostname.is_empty() {
            singles.push(format!("hostname {}", t.hostname));
        }
        if !t.banner.is_empty() {
            singles.push(format!("banner motd ^{}^", t.banner));
        }

        for command in singles {
            ctx.send_line(&command).await?;
            ctx.read_once(DEFAULT_LINE_LEN, self.timing.read_timeout)
                .await?;
        }
        if !t.hostname.is_empty() {
            prompt.set_hostname(&t.hostname);
        }
        Ok(())
    }

    async fn setup_ssh<T: ConsoleTransport>(
        &self,
        ctx: &mut RunContext<T>,
        prompt: &Prompt,
    ) -> Result<()> {
        let ssh = &self.template.ssh;
        if !ssh.enable {
            return Ok(());
        }
        if !self.template.ssh_ready() {
            warn!("ssh requested but prerequisites are missing; skipping");
            ctx.progress("SSH setup skipped: missing username, password, domain, or hostname");
            return Ok(());
        }

        ctx.progress("Generating SSH key");
        let options = ExpectOptions::new(Nudge::Newline).with_timing(self.timing);
        let password = ssh.password.as_ref().map(|p| p.expose_secret().to_string());
        ctx.send_line(&format!(
            "username {} secret {}",
            ssh.username,
            password.unwrap_or_default()
        ))
        .await?;
        ctx.await_line(&prompt.matcher_for(CliMode::Config), &options)
            .await?;

        ctx.send_line("crypto key generate rsa").await?;
        let ask = ExpectOptions::new(Nudge::None).with_timing(self.timing);
        ctx.await_line(&Contains::new(KEY_BITS_QUESTION), &ask).await?;

        let slow = ExpectOptions::new(Nudge::None)
            .with_timing(self.timing)
            .with_read_timeout(self.timing.read_timeout.max(KEY_GEN_READ_TIMEOUT));
        ctx.send_line(&ssh.clamped_key_bits().to_string()).await?;
        ctx.await_line(&prompt.matcher_for(CliMode::Config), &slow)
            .await?;
        Ok(())
    }
}
