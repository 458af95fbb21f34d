//! Service configuration loading.
//!
//! Sources, applied in order (later sources override earlier ones):
//!  1. `/etc/edge-router/service.yaml`: system-wide defaults
//!  2. `./config/service.yaml`: deployment-local override
//!  3. the file named by `EDGE_ROUTER_CONFIG_FILE`, which must exist when set
//!  4. environment variables prefixed `EDGE__` with `__` separators,
//!     e.g. `EDGE__SERVER__PORT=9090` sets `server.port`
//!
//! Every section has serde defaults, so missing files yield the built-in
//! configuration. A malformed file or an environment value of the wrong type
//! is a hard error.

use edge_router_api::ServiceConfig;
use tracing::info;

/// Names the operator-supplied configuration file.
pub const CONFIG_FILE_ENV: &str = "EDGE_ROUTER_CONFIG_FILE";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "EDGE";

const DEFAULT_CONFIG_FILES: [&str; 2] = ["/etc/edge-router/service", "config/service"];

/// Load the service configuration from the standard locations.
pub fn load_service_config() -> Result<ServiceConfig, config::ConfigError> {
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty());

    load_from(&DEFAULT_CONFIG_FILES, explicit_path.as_deref())
}

/// Load configuration from optional `base_files`, an optional required
/// `explicit_path` and the environment.
pub fn load_from(
    base_files: &[&str],
    explicit_path: Option<&str>,
) -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in base_files {
        builder = builder.add_source(
            config::File::with_name(name)
                .required(false)
                .format(config::FileFormat::Yaml),
        );
    }

    if let Some(path) = explicit_path {
        info!(path = %path, "Loading configuration from explicit path");
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
