//! tfhfs-perf - whole-system throughput benchmark for the tfhfs filesystem
//!
//! Mounts the filesystem on each storage backend in turn, times bulk write
//! workloads (`dd`, `rsync`) and a read-back of everything written, and
//! reports units per second.

pub mod backend;
pub mod cli;
pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod fuse_mounter;
pub mod json_output;
pub mod measurement;
pub mod mounter;
pub mod report;
pub mod suite;
pub mod text_output;
