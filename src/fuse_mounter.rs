//! Mounts the filesystem by launching its FUSE binary
//!
//! The binary is started as `<binary> [flags] MOUNTDIR STORAGEDIR` and is
//! expected to serve the mount until it is unmounted. A directory counts as
//! mounted when its device id differs from its parent's.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::stat;
use nix::unistd::Pid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::MountError;
use crate::mounter::{MountHandle, MountRequest, Mounter};

pub const DEFAULT_MOUNT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What `stat` says about a directory that may be a mount point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountState {
    Mounted,
    NotMounted,
    /// FUSE server gone but the kernel mount is still there
    Stale,
}

fn mount_state(path: &Path) -> MountState {
    let own = match stat(path) {
        Ok(st) => st,
        Err(Errno::ENOTCONN) => return MountState::Stale,
        Err(_) => return MountState::NotMounted,
    };
    match stat(path.join("..").as_path()) {
        Ok(parent) if parent.st_dev != own.st_dev => MountState::Mounted,
        _ => MountState::NotMounted,
    }
}

fn unmount(mountpoint: &Path) -> Result<(), MountError> {
    // root can unmount any filesystem type directly
    #[cfg(target_os = "linux")]
    {
        if nix::unistd::geteuid().is_root() {
            return nix::mount::umount(mountpoint).map_err(|errno| MountError::Unmount {
                mountpoint: mountpoint.display().to_string(),
                reason: errno.to_string(),
            });
        }
    }

    let program = if cfg!(target_os = "linux") {
        "fusermount"
    } else {
        "umount"
    };
    let mut cmd = Command::new(program);
    if cfg!(target_os = "linux") {
        cmd.arg("-u");
    }
    let output = cmd
        .arg(mountpoint)
        .stdout(Stdio::null())
        .output()
        .map_err(|e| MountError::Unmount {
            mountpoint: mountpoint.display().to_string(),
            reason: format!("failed to run {}: {}", program, e),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(MountError::Unmount {
            mountpoint: mountpoint.display().to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn prepare_dir(path: &Path) -> Result<(), MountError> {
    fs::create_dir_all(path).map_err(|source| MountError::Storage {
        path: path.display().to_string(),
        source,
    })
}

fn discard_storage(path: &Path) -> Result<(), MountError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MountError::Storage {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn terminate(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
        }
    }
}

/// [`Mounter`] that runs the filesystem binary as a child process
#[derive(Debug, Clone)]
pub struct FuseMounter {
    binary: PathBuf,
    mount_timeout: Duration,
    poll_interval: Duration,
}

impl FuseMounter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            mount_timeout: DEFAULT_MOUNT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeouts(mut self, mount_timeout: Duration, poll_interval: Duration) -> Self {
        self.mount_timeout = mount_timeout;
        self.poll_interval = poll_interval;
        self
    }
}

impl Mounter for FuseMounter {
    type Handle = FuseMount;

    fn mount(&mut self, request: &MountRequest) -> Result<FuseMount, MountError> {
        let mountpoint = &request.mountpoint;

        if mount_state(mountpoint) != MountState::NotMounted {
            tracing::info!(mountpoint = %mountpoint.display(), "unmounting leftover mount");
            if let Err(e) = unmount(mountpoint) {
                tracing::warn!("{}", e);
            }
        }
        if request.clean {
            tracing::debug!(storage = %request.storage_dir.display(), "discarding old storage");
            discard_storage(&request.storage_dir)?;
        }
        prepare_dir(mountpoint)?;
        prepare_dir(&request.storage_dir)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(request.options.to_flags())
            .arg(mountpoint)
            .arg(&request.storage_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        tracing::info!(
            binary = %self.binary.display(),
            mountpoint = %mountpoint.display(),
            clean = request.clean,
            "mounting"
        );
        let child = cmd.spawn().map_err(|source| MountError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;

        let mut handle = FuseMount {
            child: Some(child),
            mountpoint: mountpoint.clone(),
            timeout: self.mount_timeout,
            poll_interval: self.poll_interval,
        };
        handle.wait_until_mounted()?;
        Ok(handle)
    }
}

/// A filesystem served by a child process
#[derive(Debug)]
pub struct FuseMount {
    child: Option<Child>,
    mountpoint: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl FuseMount {
    fn wait_until_mounted(&mut self) -> Result<(), MountError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    self.child = None;
                    return Err(MountError::Exited {
                        status: status.to_string(),
                    });
                }
            }
            if mount_state(&self.mountpoint) == MountState::Mounted {
                tracing::debug!(mountpoint = %self.mountpoint.display(), "mounted");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MountError::Timeout {
                    what: format!("{} to be mounted", self.mountpoint.display()),
                    millis: self.timeout.as_millis(),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn wait_for_exit(&self, child: &mut Child) -> Result<(), MountError> {
        let deadline = Instant::now() + self.timeout;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return Ok(());
            }
            thread::sleep(self.poll_interval);
        }
        terminate(child);
        let _ = child.wait();
        Err(MountError::Timeout {
            what: "filesystem process to exit".to_string(),
            millis: self.timeout.as_millis(),
        })
    }
}

impl MountHandle for FuseMount {
    fn mounted(&mut self) -> bool {
        let running = match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        running && mount_state(&self.mountpoint) == MountState::Mounted
    }

    fn close(mut self) -> Result<(), MountError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        tracing::info!(mountpoint = %self.mountpoint.display(), "unmounting");
        let unmounted = unmount(&self.mountpoint);
        if unmounted.is_err() {
            terminate(&mut child);
        }
        let exited = self.wait_for_exit(&mut child);
        unmounted.and(exited)
    }
}

impl Drop for FuseMount {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            terminate(&mut child);
            let _ = child.wait();
            if mount_state(&self.mountpoint) != MountState::NotMounted {
                let _ = unmount(&self.mountpoint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendOptions;

    fn request(dir: &Path, clean: bool) -> MountRequest {
        MountRequest {
            mountpoint: dir.join("mnt"),
            storage_dir: dir.join("storage"),
            clean,
            options: BackendOptions::default(),
        }
    }

    #[test]
    fn test_plain_directory_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(mount_state(dir.path()), MountState::NotMounted);
    }

    #[test]
    fn test_missing_directory_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(mount_state(&dir.path().join("nope")), MountState::NotMounted);
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mounter = FuseMounter::new("/nonexistent/tfhfs");
        let err = mounter.mount(&request(dir.path(), true)).unwrap_err();
        assert!(matches!(err, MountError::Spawn { .. }));
        assert!(dir.path().join("mnt").is_dir());
        assert!(dir.path().join("storage").is_dir());
    }

    #[test]
    fn test_clean_discards_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage");
        fs::create_dir_all(&storage).unwrap();
        fs::write(storage.join("block"), b"old").unwrap();

        let mut mounter = FuseMounter::new("/nonexistent/tfhfs");
        let _ = mounter.mount(&request(dir.path(), true));
        assert!(!storage.join("block").exists());
    }

    #[test]
    fn test_unclean_keeps_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage");
        fs::create_dir_all(&storage).unwrap();
        fs::write(storage.join("block"), b"old").unwrap();

        let mut mounter = FuseMounter::new("/nonexistent/tfhfs");
        let _ = mounter.mount(&request(dir.path(), false));
        assert!(storage.join("block").exists());
    }

    #[test]
    fn test_binary_exiting_early_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut mounter = FuseMounter::new("false")
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(10));
        let err = mounter.mount(&request(dir.path(), true)).unwrap_err();
        assert!(matches!(err, MountError::Exited { .. }));
    }

    /// Stand-in filesystem binary that mounts a tmpfs and serves it until
    /// the mount goes away
    const TMPFS_STUB: &str = r#"#!/bin/sh
while [ $# -gt 2 ]; do shift; done
mount -t tmpfs tmpfs "$1" || exit 1
trap 'umount "$1"; exit 0' TERM
while grep -qs " $1 tmpfs " /proc/mounts; do sleep 0.05; done
"#;

    #[test]
    #[ignore = "needs root to mount tmpfs"]
    fn test_mounted_until_closed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("tfhfs");
        fs::write(&stub, TMPFS_STUB).unwrap();
        fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

        let mut mounter =
            FuseMounter::new(&stub).with_timeouts(Duration::from_secs(5), Duration::from_millis(10));
        let req = request(dir.path(), true);
        let mut handle = mounter.mount(&req).unwrap();
        assert!(handle.mounted());
        assert_eq!(mount_state(&req.mountpoint), MountState::Mounted);

        handle.close().unwrap();
        assert_eq!(mount_state(&req.mountpoint), MountState::NotMounted);
    }

    #[test]
    fn test_binary_that_never_mounts_times_out() {
        let dir = tempfile::tempdir().unwrap();
        // `yes` ignores what its arguments mean and runs until signalled
        let mut mounter = FuseMounter::new("yes")
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(20));
        let err = mounter.mount(&request(dir.path(), true)).unwrap_err();
        assert!(matches!(err, MountError::Timeout { .. }));
    }
}
