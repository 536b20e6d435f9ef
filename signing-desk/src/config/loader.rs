//! Configuration loading from files and environment variables.

use config::{Config, Environment, File};

use crate::error::{DeskError, DeskResult};

use super::static_config::DeskConfig;

/// Environment variable prefix, e.g. `SIGNING_DESK__BACKEND__API_URL`
const ENV_PREFIX: &str = "SIGNING_DESK";

/// Load configuration from an optional `config` file and env vars
pub fn load_config() -> DeskResult<DeskConfig> {
    load_from(Config::builder().add_source(File::with_name("config").required(false)))
}

fn load_from(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> DeskResult<DeskConfig> {
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| DeskError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| DeskError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}
