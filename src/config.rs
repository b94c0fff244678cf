//! Runtime configuration for the active backend.
//!
//! A process-wide [`Config`] is stored behind a lock and can be replaced with
//! [`set()`]. Code that needs a different policy for a bounded region (tests
//! in particular) can use [`scoped()`], which overrides the configuration for
//! the current thread only.

use core::{cell::Cell, str::FromStr};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable read by [`Config::from_env()`] for the device.
pub const DEVICE_ENV: &str = "TENSORSHIM_DEVICE";

/// Environment variable read by [`Config::from_env()`] for the index mode.
pub const INDEX_MODE_ENV: &str = "TENSORSHIM_INDEX_MODE";

/// Compute device results are placed on before they are returned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Device {
    /// Host memory, row-major contiguous layout.
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            other => Err(Error::invalid_argument(format!(
                "unknown device `{other}`, expected `cpu`"
            ))),
        }
    }
}

/// What gather and scatter do with an index outside its axis.
///
/// Negative indices in `[-len, 0)` always count from the end of the axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Fail with [`Error::IndexOutOfBounds`].
    #[default]
    Strict,
    /// Clamp into `[0, len)`.
    Clamp,
}

impl FromStr for IndexMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "clamp" => Ok(Self::Clamp),
            other => Err(Error::invalid_argument(format!(
                "unknown index mode `{other}`, expected `strict` or `clamp`"
            ))),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Device results are placed on.
    pub device: Device,
    /// Out-of-range index policy.
    pub index_mode: IndexMode,
}

impl Config {
    /// The configuration used until [`set()`] is called.
    pub const DEFAULT: Self = Self {
        device: Device::Cpu,
        index_mode: IndexMode::Strict,
    };

    /// Builds a configuration from [`DEVICE_ENV`] and [`INDEX_MODE_ENV`],
    /// falling back to the defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when a variable is set to a value
    /// that does not name a device or index mode.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::DEFAULT;

        if let Ok(device) = std::env::var(DEVICE_ENV) {
            config.device = device.parse()?;
        }
        if let Ok(mode) = std::env::var(INDEX_MODE_ENV) {
            config.index_mode = mode.parse()?;
        }

        Ok(config)
    }

    /// Returns a copy with the given index mode.
    #[must_use]
    pub const fn with_index_mode(mut self, index_mode: IndexMode) -> Self {
        self.index_mode = index_mode;
        self
    }
}

static GLOBAL: RwLock<Config> = RwLock::new(Config::DEFAULT);

thread_local! {
    static OVERRIDE: Cell<Option<Config>> = const { Cell::new(None) };
}

/// Returns the configuration in effect on the calling thread.
pub fn current() -> Config {
    OVERRIDE.with(Cell::get).unwrap_or_else(|| {
        *GLOBAL.read().unwrap_or_else(PoisonError::into_inner)
    })
}

/// Replaces the process-wide configuration, returning the previous one.
pub fn set(config: Config) -> Config {
    let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    debug!(?config, "replacing backend configuration");
    core::mem::replace(&mut *guard, config)
}

/// Runs `f` with `config` in effect on the current thread.
///
/// The previous override is restored when `f` returns or unwinds.
pub fn scoped<R>(config: Config, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Config>);

    impl Drop for Restore {
        fn drop(&mut self) {
            OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let _restore = Restore(OVERRIDE.with(|cell| cell.replace(Some(config))));
    f()
}
