//! Global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the readers.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// # Concurrency Configuration Options
/// ## Block Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`, or `1` if unavailable
///
/// The maximum number of block requests issued concurrently by a single read.
/// Requests are issued sequentially if set to `0` or `1`.
/// The order of the assembled result never depends on this option.
///
/// # Miscellaneous Configuration Options
/// ## Validate Coordinates
/// > default: [`true`]
///
/// If enabled, constructing a [`DataArray`](crate::container::DataArray) checks that every coordinate dimension shared with the data has the same size as in the data.
#[derive(Debug)]
pub struct Config {
    block_concurrent_limit: usize,
    validate_coordinates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            block_concurrent_limit: std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get),
            validate_coordinates: true,
        }
    }
}

impl Config {
    /// Get the [block concurrent limit](#block-concurrent-limit) configuration.
    #[must_use]
    pub fn block_concurrent_limit(&self) -> usize {
        self.block_concurrent_limit
    }

    /// Set the [block concurrent limit](#block-concurrent-limit) configuration.
    pub fn set_block_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.block_concurrent_limit = concurrent_limit;
    }

    /// Get the [validate coordinates](#validate-coordinates) configuration.
    #[must_use]
    pub fn validate_coordinates(&self) -> bool {
        self.validate_coordinates
    }

    /// Set the [validate coordinates](#validate-coordinates) configuration.
    pub fn set_validate_coordinates(&mut self, validate_coordinates: bool) {
        self.validate_coordinates = validate_coordinates;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// This might deadlock if the global config is already held mutably by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global configuration.
///
/// This might deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_block_concurrent_limit() {
        let limit = global_config().block_concurrent_limit();
        assert!(limit >= 1);
        global_config_mut().set_block_concurrent_limit(1);
        assert_eq!(global_config().block_concurrent_limit(), 1);
        global_config_mut().set_block_concurrent_limit(limit);
    }

    #[test]
    fn config_default() {
        let config = Config::default();
        assert!(config.validate_coordinates());
        assert!(config.block_concurrent_limit() >= 1);
    }
}
