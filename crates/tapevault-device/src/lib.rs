//! Tape-emulation device backed by a dedup volume.
//!
//! This crate provides:
//! - `scatter`: decomposition of one wire block into volume-stored
//!   fragments plus index entries
//! - `gather`: reconstruction of one wire block from those fragments
//! - `DedupDevice`: the sequential-device illusion (position,
//!   end-of-data, mount state, open/close lifecycle) on top of an
//!   append-only, randomly-readable volume
//! - The secure-erase collaborator boundary used by truncate

mod device;
mod erase;
mod gather;
mod scatter;

pub use device::{DedupDevice, DeviceHandle};
pub use erase::{delete_volume, SecureEraser, ZeroFillEraser};
pub use gather::gather;
pub use scatter::scatter;
