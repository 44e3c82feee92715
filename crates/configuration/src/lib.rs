use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    BrokerKind, BrokerSettings, DatabaseBackend, DatabaseSettings, IndexSettings,
    LoggingSettings, PaperSettings, RebalanceDefaults, RedistributionKind, Settings,
};

/// Loads the application settings from `config.toml` and the environment.
///
/// The file is optional; every field has a default. Environment variables
/// prefixed with `REBALANCER__` override file values, using `__` as the
/// nesting separator (e.g. `REBALANCER__BROKER__KIND=alpaca`).
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config.toml")
}

/// Same as [`load_config`], reading the file at `path`.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("REBALANCER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
