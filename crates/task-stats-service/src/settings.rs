//! Layered configuration loading.
//!
//! Sources, later overriding earlier:
//!  1. `/etc/task-stats/service.yaml`
//!  2. `./config/service.yaml`
//!  3. the file named by `TS_CONFIG_FILE` (must exist when the variable is set)
//!  4. environment variables prefixed `TS__`, e.g. `TS__SERVER__PORT=9090`
//!
//! Absent files are skipped. A malformed file or a value that cannot be
//! coerced to its field type is an error.

use task_stats_api::{ConfigError, ServiceConfig};

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

pub const CONFIG_FILE_VAR: &str = "TS_CONFIG_FILE";
pub const ENV_PREFIX: &str = "TS";

/// Load and validate the service configuration
pub fn load_configuration() -> Result<ServiceConfig, ConfigError> {
    let explicit = std::env::var(CONFIG_FILE_VAR)
        .ok()
        .filter(|path| !path.is_empty());

    load_from(
        &["/etc/task-stats/service", "config/service"],
        explicit.as_deref(),
    )
}

fn load_from(
    optional_files: &[&str],
    explicit_file: Option<&str>,
) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder();

    for path in optional_files {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(false)
                .format(config::FileFormat::Yaml),
        );
    }

    if let Some(path) = explicit_file {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let service_config: ServiceConfig = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    service_config.validate()?;
    Ok(service_config)
}
