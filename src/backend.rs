//! Storage backends understood by the filesystem binary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;

/// Storage engine the filesystem keeps its blocks in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain in-memory map, nothing survives an unmount
    InMemory,
    /// Custom nested b-tree in one file with superblocks
    Tree,
    /// Badger key-value store (the filesystem's default)
    Badger,
    /// Bolt key-value store
    Bolt,
    /// Raw 64 KiB blocks as files on the host filesystem
    File,
}

impl Backend {
    /// Name passed to the filesystem's `-backend` flag
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::InMemory => "inmemory",
            Backend::Tree => "tree",
            Backend::Badger => "badger",
            Backend::Bolt => "bolt",
            Backend::File => "file",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend choice plus any extra flags for the filesystem binary
///
/// `backend: None` leaves the choice to the binary. Extra options are
/// passed as `-key=value`, e.g. `password`, `salt` or `cpuprofile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl BackendOptions {
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend: Some(backend),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True unless the backend forgets everything on unmount
    pub fn persists_data(&self) -> bool {
        self.backend != Some(Backend::InMemory)
    }

    /// Command-line flags for the filesystem binary, backend first
    pub fn to_flags(&self) -> Vec<OsString> {
        let mut flags = Vec::with_capacity(self.extra.len() + 1);
        if let Some(backend) = self.backend {
            flags.push(OsString::from(format!("-backend={}", backend)));
        }
        for (key, value) in &self.extra {
            flags.push(OsString::from(format!("-{}={}", key, value)));
        }
        flags
    }
}
