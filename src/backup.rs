//! Configuration backup before erase.
//!
//! The device pushes its startup-config over TFTP; this module owns the
//! parameter validation and the lifecycle of an optional built-in TFTP
//! server. The TFTP wire protocol itself stays external; a
//! [`TftpLauncher`] implementation brings whatever server the deployment
//! uses.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Result, RunError};

/// How long a stopping TFTP server may keep running to finish an
/// in-flight transfer before it is aborted.
pub const STOP_GRACE: Duration = Duration::from_secs(30);

/// Caller-supplied backup parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupParameters {
    /// Whether a backup was requested at all.
    pub enabled: bool,

    /// Start the built-in TFTP server for the transfer.
    pub use_builtin_server: bool,

    /// Address assigned to the device interface for the transfer.
    /// Both-empty with `subnet_mask` means DHCP.
    pub source_ip: Option<Ipv4Addr>,

    /// Subnet mask paired with `source_ip`.
    pub subnet_mask: Option<Ipv4Addr>,

    /// TFTP server the device copies to. Empty = backup impossible.
    pub destination_host: String,

    /// Prefix for the uploaded filename.
    pub filename_prefix: String,
}

/// Interface addressing used for the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    Static { ip: Ipv4Addr, mask: Ipv4Addr },
    Dhcp,
}

/// Validated outcome of the backup parameters.
#[derive(Debug, Clone)]
pub enum BackupPlan {
    /// No backup: either not requested, or requested with parameters
    /// that cannot work (each problem listed in `reasons`).
    Disabled { reasons: Vec<String> },

    /// Backup will run.
    Enabled {
        addressing: Addressing,
        destination: String,
        filename: String,
        builtin: bool,
    },
}

impl BackupPlan {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

impl BackupParameters {
    /// Validate into a [`BackupPlan`].
    ///
    /// Invalid combinations force-disable the backup; they never fail
    /// the recovery run itself.
    pub fn plan(&self) -> BackupPlan {
        if !self.enabled {
            return BackupPlan::Disabled { reasons: vec![] };
        }

        let mut reasons = Vec::new();
        if self.destination_host.is_empty() {
            reasons.push("destinationHost is not set".to_string());
        }

        let addressing = match (self.source_ip, self.subnet_mask) {
            (Some(ip), Some(mask)) => Addressing::Static { ip, mask },
            (None, None) => Addressing::Dhcp,
            (Some(_), None) => {
                reasons.push("sourceIP is set but subnetMask is not".to_string());
                Addressing::Dhcp
            }
            (None, Some(_)) => {
                reasons.push("subnetMask is set but sourceIP is not".to_string());
                Addressing::Dhcp
            }
        };

        if !reasons.is_empty() {
            return BackupPlan::Disabled { reasons };
        }

        BackupPlan::Enabled {
            addressing,
            destination: self.destination_host.clone(),
            filename: format!("{}-router-config.txt", self.filename_prefix),
            builtin: self.use_builtin_server,
        }
    }
}

/// Handle to a running transient TFTP server.
pub struct TftpHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TftpHandle {
    pub fn new(stop: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    /// Signal the server to stop and wait for it, bounded by `grace`.
    ///
    /// The stop signal may race an in-flight transfer; the server is
    /// given the transfer deadline to drain, then aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.stop.send(());
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            warn!("backup server still running after {grace:?}, aborting");
            self.task.abort();
        }
    }
}

/// Launches the transient built-in TFTP server.
#[async_trait]
pub trait TftpLauncher: Send + Sync {
    /// Start the server as a background task.
    async fn launch(&self) -> Result<TftpHandle>;
}

/// Binds a backup plan to an optional launcher and sequences the server
/// around the device's `copy` command.
pub struct BackupCoordinator {
    plan: BackupPlan,
    launcher: Option<Arc<dyn TftpLauncher>>,
}

impl BackupCoordinator {
    pub fn new(params: &BackupParameters, launcher: Option<Arc<dyn TftpLauncher>>) -> Self {
        Self {
            plan: params.plan(),
            launcher,
        }
    }

    pub fn plan(&self) -> &BackupPlan {
        &self.plan
    }

    /// Start the built-in server when the plan calls for one. Must run
    /// before the device's `copy` command is issued.
    pub async fn begin(&self) -> Result<Option<TftpHandle>> {
        match &self.plan {
            BackupPlan::Enabled { builtin: true, .. } => match &self.launcher {
                Some(launcher) => Ok(Some(launcher.launch().await?)),
                None => Err(RunError::Backup(
                    "built-in TFTP server requested but no launcher configured".to_string(),
                )
                .into()),
            },
            _ => Ok(None),
        }
    }

    /// Stop the server after the run's terminal confirmation.
    pub async fn finish(&self, handle: Option<TftpHandle>) {
        if let Some(handle) = handle {
            debug!("stopping backup server");
            handle.shutdown(STOP_GRACE).await;
        }
    }
}
