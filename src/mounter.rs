//! Contract between the driver and whatever mounts the filesystem under test

use std::path::PathBuf;

use crate::backend::BackendOptions;
use crate::error::MountError;

/// Where and how to mount the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub mountpoint: PathBuf,
    pub storage_dir: PathBuf,
    /// Discard any state left in `storage_dir` before mounting
    pub clean: bool,
    pub options: BackendOptions,
}

/// A live (or failed) mount
pub trait MountHandle {
    /// Whether the filesystem is currently mounted and healthy
    ///
    /// Called right after mounting and again after workload commands ran.
    fn mounted(&mut self) -> bool;

    /// Unmount and release everything the mount holds
    fn close(self) -> Result<(), MountError>;
}

/// Produces mounts of the filesystem under test
pub trait Mounter {
    type Handle: MountHandle;

    /// Mount according to `request`
    ///
    /// An `Err` and a handle whose `mounted()` is false are both treated as
    /// "backend unavailable" by the driver.
    fn mount(&mut self, request: &MountRequest) -> Result<Self::Handle, MountError>;
}
