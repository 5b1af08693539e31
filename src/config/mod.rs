//! config — explicit run configuration.
//!
//! - [`RegimeConfig`]: every option of a run, TOML-loadable, validated
//!   up front.
//! - [`ConfigError`]: the invalid-configuration family.

pub mod errors;
pub mod settings;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ConfigError, ConfigResult};
pub use self::settings::{RegimeConfig, DEFAULT_INDICATORS};
