//! Directory Lock
//!
//! Advisory `lock.pid` file that keeps two processes from opening the same
//! data directory. It says nothing about threads within one process; the
//! Database's RwLock handles those.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CaskError, Result};

use super::layout;

/// Ownership of a data directory by the current process
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    pid: u32,
}

impl DirLock {
    /// Take the lock for `dir`
    ///
    /// Succeeds when there is no lock file, when it names this process, or
    /// when the process it names is gone (stale lock). Fails with
    /// `LockConflict` when another live process holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = layout::lock_path(dir);
        let pid = std::process::id();

        match read_pid(&path)? {
            Some(owner) if owner != pid && process_alive(owner) => {
                return Err(CaskError::LockConflict { pid: owner });
            }
            Some(owner) if owner != pid => {
                warn!(stale_pid = owner, path = %path.display(), "taking over stale lock");
            }
            _ => {}
        }

        fs::write(&path, pid.to_string())?;
        debug!(pid, path = %path.display(), "acquired directory lock");
        Ok(Self { path, pid })
    }

    /// Live process currently holding the lock on `dir`, if any
    pub fn owner(dir: &Path) -> Result<Option<u32>> {
        let owner = read_pid(&layout::lock_path(dir))?;
        Ok(owner.filter(|&pid| pid == std::process::id() || process_alive(pid)))
    }

    /// Remove the lock file if it is still ours or has gone stale
    pub fn release(self) -> Result<()> {
        match read_pid(&self.path)? {
            Some(owner) if owner != self.pid && process_alive(owner) => {
                debug!(owner, "lock now held by another process, leaving it");
                return Ok(());
            }
            _ => {}
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(pid = self.pid, "released directory lock");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// Pid stored in the lock file; `None` if absent or unparseable
fn read_pid(path: &Path) -> Result<Option<u32>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().parse().ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let pid = match libc::pid_t::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return false,
    };
    // Signal 0 only checks that the process exists and may be signalled
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    // No cheap liveness probe; treat every recorded owner as live
    true
}
