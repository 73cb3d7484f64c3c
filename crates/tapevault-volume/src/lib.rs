//! Volume contract and stub volumes for TapeVault.
//!
//! A volume is the persistent, append-only, randomly-readable storage
//! unit backing one device session. This crate provides:
//! - The `Volume` trait, the complete boundary between the device core
//!   and a storage engine
//! - `MemVolume`, an in-memory fake with failure injection for tests
//! - `DirVolume`, a directory-backed stub (flat directory of index and
//!   payload segment files)
//!
//! The content-addressing machinery of a real dedup engine lives
//! behind this boundary and is out of scope here.

pub mod contract;
pub mod dir;
pub mod mem;

pub use contract::{OpenMode, Volume, VolumeOpener};
pub use dir::{DirVolume, DirVolumeConfig, DirVolumeOpener};
pub use mem::{MemVolume, MemVolumeOpener};
