use crate::error::InitError;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCK_FILE_PATH: &str = "/tmp/moode-oled.lock";

/// PID file that keeps a second process off the panel.
/// Removed again when dropped.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, InitError> {
        let path = path.into();
        let own_pid = std::process::id() as i32;

        // 1. Check if lock file exists
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(pid) = content.trim().parse::<i32>() {
                // 2. Check if process is alive
                if pid != own_pid && process_alive(pid) {
                    return Err(InitError::AlreadyRunning(pid));
                }
                tracing::debug!(pid, path = %path.display(), "taking over stale lock");
            }
        }

        // 3. Create/Overwrite lock file
        fs::write(&path, own_pid.to_string()).map_err(|e| {
            InitError::MissingDependency(format!("lock file {}: {}", path.display(), e))
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // no signal, existence check only
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("moode-oled-{}-{}.lock", name, std::process::id()))
    }

    #[test]
    fn test_lock_written_and_removed() {
        let path = scratch("basic");
        {
            let lock = InstanceLock::acquire(&path).unwrap();
            let pid = fs::read_to_string(lock.path()).unwrap();
            assert_eq!(pid, std::process::id().to_string());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_live_owner_blocks() {
        let path = scratch("live");
        fs::write(&path, "1").unwrap();
        let result = InstanceLock::acquire(&path);
        assert!(matches!(result, Err(InitError::AlreadyRunning(1))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let path = scratch("stale");
        fs::write(&path, i32::MAX.to_string()).unwrap();
        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(fs::read_to_string(lock.path()).unwrap(), std::process::id().to_string());
    }
}
