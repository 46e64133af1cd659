//! Nmap invocation.
//!
//! Only the closed set of presets in [`ScanType`] ever reaches the process
//! boundary; the target is the single user-controlled argument and it is
//! validated before anything is spawned.

use std::process::Stdio;
use std::time::{Duration, Instant};

use strum::{Display, EnumString, VariantNames};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{info, warn};

use crate::metrics::{SCAN_DURATION, SCANS_FAILED};
use crate::validator::{is_private_network, is_valid_target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ScanType {
    Basic,
    Aggressive,
    Passive,
}

impl ScanType {
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ScanType::Basic => &["-F", "-T4"],
            ScanType::Aggressive => &["-A", "-T4"],
            ScanType::Passive => &["-sS", "-T3", "-Pn"],
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid or missing target. Provide a valid IP, hostname or CIDR block.")]
    InvalidTarget,
    #[error("Invalid scan type.")]
    InvalidScanType,
    #[error("Scanning private networks is not allowed in production")]
    PrivateNetworkBlocked,
    #[error("Failed to start scanner: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Scan timeout - operation took too long ({0}s)")]
    Timeout(u64),
    #[error("{0}")]
    Failed(String),
}

/// Collected output of a scan that counts as a success.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub output: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ScanInvoker {
    program: String,
    timeout: Duration,
    block_private: bool,
}

impl ScanInvoker {
    pub fn new(program: impl Into<String>, timeout: Duration, block_private: bool) -> Self {
        Self {
            program: program.into(),
            timeout,
            block_private,
        }
    }

    /// Validates the target, parses the scan type and runs the scan.
    pub async fn run_named(&self, target: &str, scan_type: &str) -> Result<ScanOutput, ScanError> {
        if !is_valid_target(target) {
            return Err(ScanError::InvalidTarget);
        }
        let scan_type: ScanType = scan_type.parse().map_err(|_| ScanError::InvalidScanType)?;
        self.run(target, scan_type).await
    }

    pub async fn run(&self, target: &str, scan_type: ScanType) -> Result<ScanOutput, ScanError> {
        if !is_valid_target(target) {
            return Err(ScanError::InvalidTarget);
        }
        let target = target.trim();
        if self.block_private && is_private_network(target) {
            return Err(ScanError::PrivateNetworkBlocked);
        }

        info!("Starting {} scan for target: {}", scan_type, target);
        let start = Instant::now();
        let result = self.execute(scan_type.args(), target).await;
        SCAN_DURATION.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(scan) => info!(exit_code = ?scan.exit_code, "Scan completed for target: {}", target),
            Err(e) => {
                SCANS_FAILED.inc();
                warn!("Scan failed for target {}: {}", target, e);
            }
        }
        result
    }

    async fn execute(&self, args: &[&str], target: &str) -> Result<ScanOutput, ScanError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ScanError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collected = tokio::time::timeout(self.timeout, async {
            let (out, err, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());
            (out, err, status)
        })
        .await;

        let (out, err, status) = match collected {
            Ok(collected) => collected,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out scanner: {}", e);
                }
                return Err(ScanError::Timeout(self.timeout.as_secs()));
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill().await;
                return Err(ScanError::Failed(e.to_string()));
            }
        };

        let output = String::from_utf8_lossy(&out).into_owned();
        // Partial output before a nonzero exit is still worth returning
        if status.success() || !output.is_empty() {
            return Ok(ScanOutput {
                output,
                exit_code: status.code(),
            });
        }

        let stderr = String::from_utf8_lossy(&err).trim().to_string();
        if stderr.is_empty() {
            Err(ScanError::Failed("Unknown error".to_string()))
        } else {
            Err(ScanError::Failed(stderr))
        }
    }
}

// Reads a pipe chunk by chunk until EOF
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut collected = Vec::new();
    let Some(mut pipe) = pipe else {
        return collected;
    };

    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => collected.extend_from_slice(&buf[..n]),
            Err(e) => {
                warn!("Error reading scanner output: {}", e);
                break;
            }
        }
    }
    collected
}
