//! Per-integration run lock using PID files
//!
//! Prevents two processes from pushing the same integration at once, which
//! would submit duplicate batches and race on the run marker.

use std::fs;
use std::path::{Path, PathBuf};

use mailsync_domain::{MailsyncError, Result};

const LOCK_FILE_NAME: &str = "run.pid";

/// Held for the duration of one integration run
#[derive(Debug)]
pub struct RunLock {
    pid_file: PathBuf,
}

impl RunLock {
    /// Take the lock in `lock_dir`, creating the directory if needed.
    ///
    /// A PID file left by a process that is no longer running is replaced.
    /// Returns `MailsyncError::Conflict` if another live process holds it.
    pub fn acquire<P: AsRef<Path>>(lock_dir: P) -> Result<Self> {
        let lock_dir = lock_dir.as_ref();
        fs::create_dir_all(lock_dir).map_err(|e| {
            MailsyncError::Internal(format!(
                "Failed to create lock directory {}: {}",
                lock_dir.display(),
                e
            ))
        })?;
        let pid_file = lock_dir.join(LOCK_FILE_NAME);

        if pid_file.exists() {
            if let Ok(content) = fs::read_to_string(&pid_file) {
                if let Ok(pid) = content.trim().parse::<u32>() {
                    if Self::is_process_running(pid) {
                        tracing::warn!(existing_pid = pid, "run_lock.process_active");
                        return Err(MailsyncError::Conflict(format!(
                            "integration is already running (PID: {}, lock: {})",
                            pid,
                            pid_file.display()
                        )));
                    }
                    tracing::warn!(stale_pid = pid, "run_lock.stale_pid_file_detected");
                }
            }
            if let Err(err) = fs::remove_file(&pid_file) {
                tracing::warn!(error = %err, path = %pid_file.display(), "run_lock.remove_stale_pid_failed");
            }
        }

        let current_pid = std::process::id();
        fs::write(&pid_file, current_pid.to_string())
            .map_err(|e| MailsyncError::Internal(format!("Failed to create PID file: {}", e)))?;

        tracing::debug!(pid = current_pid, path = %pid_file.display(), "run_lock.acquired");

        Ok(Self { pid_file })
    }

    #[cfg(unix)]
    fn is_process_running(pid: u32) -> bool {
        if pid == std::process::id() {
            return true;
        }

        #[cfg(target_os = "linux")]
        {
            Path::new("/proc").join(pid.to_string()).exists()
        }

        #[cfg(not(target_os = "linux"))]
        {
            use std::process::Command;

            // `kill -0` checks existence without sending a signal
            Command::new("kill")
                .arg("-0")
                .arg(pid.to_string())
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        }
    }

    #[cfg(not(unix))]
    fn is_process_running(pid: u32) -> bool {
        // Without a process probe only our own PID counts as live
        pid == std::process::id()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.pid_file) {
            tracing::warn!(error = %e, path = %self.pid_file.display(), "run_lock.remove_pid_failed");
        } else {
            tracing::debug!(path = %self.pid_file.display(), "run_lock.released");
        }
    }
}
