//! TapeVault common types, errors, and configuration.
//!
//! This crate provides shared definitions used across all TapeVault components.

pub mod config;
pub mod error;
pub mod position;

pub use config::{DeviceConfig, DeviceOptions, DEFAULT_BLOCK_SIZE};
pub use error::{Result, VaultError};
pub use position::Position;
