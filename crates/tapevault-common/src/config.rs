//! Configuration structures for TapeVault devices.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};

/// Default block size when the option string does not set one (4 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Process-level device configuration.
///
/// Threaded into device construction so policy decisions stay testable
/// instead of living in ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Securely erase volume contents on truncate instead of resetting
    /// the volume in place.
    pub secure_erase: bool,
    /// Enable fsync for volume durability.
    pub fsync_enabled: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            secure_erase: false,
            fsync_enabled: true,
        }
    }
}

/// Parsed device option string.
///
/// Option strings are comma-separated `key=value` lists. The single
/// recognized key is `blocksize`; anything else is collected as a
/// warning, never a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Block size for the open volume, in bytes.
    pub block_size: usize,
    /// Human-readable warnings collected while parsing.
    pub warnings: Vec<String>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            warnings: Vec::new(),
        }
    }
}

impl DeviceOptions {
    /// Parses a device option string.
    pub fn parse(input: &str) -> Result<Self> {
        let mut result = Self::default();
        let mut unknown: Vec<&str> = Vec::new();
        let mut saw_block_size = false;

        for pair in input.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let Some((key, value)) = pair.split_once('=') else {
                return Err(VaultError::InvalidOption {
                    name: pair.to_string(),
                    value: "(missing value)".to_string(),
                });
            };

            match key.trim() {
                "blocksize" => {
                    let size =
                        parse_size(value.trim()).ok_or_else(|| VaultError::InvalidOption {
                            name: "blocksize".to_string(),
                            value: value.trim().to_string(),
                        })?;
                    result.block_size = size as usize;
                    saw_block_size = true;
                }
                other => unknown.push(other),
            }
        }

        if !saw_block_size {
            result.warnings.push(format!(
                "Blocksize was not set explicitly; set to default {}",
                DEFAULT_BLOCK_SIZE
            ));
        }

        if !unknown.is_empty() {
            result
                .warnings
                .push(format!("Unknown options: {}", unknown.join(" ")));
        }

        Ok(result)
    }
}

/// Parses a size with an optional unit suffix (`k`, `m`, `g`; powers
/// of 1024, case-insensitive). Returns None on malformed input.
pub fn parse_size(input: &str) -> Option<u64> {
    if input.is_empty() {
        return None;
    }

    let (digits, multiplier) = match input.as_bytes()[input.len() - 1].to_ascii_lowercase() {
        b'k' => (&input[..input.len() - 1], 1024u64),
        b'm' => (&input[..input.len() - 1], 1024 * 1024),
        b'g' => (&input[..input.len() - 1], 1024 * 1024 * 1024),
        _ => (input, 1),
    };

    let value: u64 = digits.parse().ok()?;
    value.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_plain() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("0"), Some(0));
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("8k"), Some(8192));
        assert_eq!(parse_size("8K"), Some(8192));
        assert_eq!(parse_size("2m"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("1g"), Some(1024 * 1024 * 1024));
    }

    #[test]
    fn test_parse_size_malformed() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("k"), None);
        assert_eq!(parse_size("12q"), None);
        assert_eq!(parse_size("-4"), None);
        assert_eq!(parse_size("4.5k"), None);
    }

    #[test]
    fn test_options_blocksize_with_unknown_key() {
        let opts = DeviceOptions::parse("blocksize=8k,foo=bar").unwrap();
        assert_eq!(opts.block_size, 8192);
        assert_eq!(opts.warnings.len(), 1);
        assert!(opts.warnings[0].contains("foo"));
        assert!(opts.warnings[0].contains("Unknown options"));
    }

    #[test]
    fn test_options_default_blocksize_warns() {
        let opts = DeviceOptions::parse("foo=bar").unwrap();
        assert_eq!(opts.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(opts.warnings.len(), 2);
        assert!(opts.warnings[0].contains("default"));
    }

    #[test]
    fn test_options_empty_string_warns_default() {
        let opts = DeviceOptions::parse("").unwrap();
        assert_eq!(opts.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(opts.warnings.len(), 1);
    }

    #[test]
    fn test_options_bad_blocksize_is_error() {
        let err = DeviceOptions::parse("blocksize=12q").unwrap_err();
        assert!(matches!(err, VaultError::InvalidOption { .. }));
        assert!(err.to_string().contains("12q"));
    }

    #[test]
    fn test_options_missing_value_is_error() {
        let err = DeviceOptions::parse("blocksize").unwrap_err();
        assert!(matches!(err, VaultError::InvalidOption { .. }));
    }

    #[test]
    fn test_options_whitespace_tolerated() {
        let opts = DeviceOptions::parse(" blocksize = 4k , ").unwrap();
        assert_eq!(opts.block_size, 4096);
        assert!(opts.warnings.is_empty());
    }

    #[test]
    fn test_device_config_defaults() {
        let config = DeviceConfig::default();
        assert!(!config.secure_erase);
        assert!(config.fsync_enabled);
    }

    #[test]
    fn test_device_config_serde_roundtrip() {
        let original = DeviceConfig {
            secure_erase: true,
            fsync_enabled: false,
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: DeviceConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original.secure_erase, deserialized.secure_erase);
        assert_eq!(original.fsync_enabled, deserialized.fsync_enabled);
    }
}
