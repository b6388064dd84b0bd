//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Validate Checksums
///  > default: [`true`]
///
/// If enabled, the `crc32c` codec validates that encoded data matches its stored checksum on decode.
/// A mismatch is reported as a warning and the data is still returned.
///
/// ## Approximate Fill Value Match
///  > default: [`true`]
///
/// If enabled, a floating point element is considered equal to the fill value when it is within
/// `sqrt(machine epsilon)` (relative) of it, so values written close to the fill sentinel read back
/// as missing. Disable for bitwise fill value comparison.
#[derive(Debug)]
pub struct Config {
    validate_checksums: bool,
    approximate_fill_value_match: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            validate_checksums: true,
            approximate_fill_value_match: true,
        }
    }
}

impl Config {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [approximate fill value match](#approximate-fill-value-match) configuration.
    #[must_use]
    pub fn approximate_fill_value_match(&self) -> bool {
        self.approximate_fill_value_match
    }

    /// Set the [approximate fill value match](#approximate-fill-value-match) configuration.
    pub fn set_approximate_fill_value_match(&mut self, approximate: bool) {
        self.approximate_fill_value_match = approximate;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
