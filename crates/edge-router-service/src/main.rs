//! # Edge Router Service
//!
//! Binary entry point for the edge router.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes logging
//! - Starts the HTTP server from edge-router-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error.

mod settings;

use edge_router_api::{start_server, LoggingConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIGURATION_EXIT_CODE: i32 = 3;

#[tokio::main]
async fn main() {
    let service_config = match settings::load_service_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(CONFIGURATION_EXIT_CODE);
        }
    };

    init_logging(&service_config.logging);
    info!("Starting Edge Router Service");

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(CONFIGURATION_EXIT_CODE);
    }

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config).await {
        error!("Failed to start server: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) {
    let level = &config.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "edge_router_service={level},edge_router_api={level},edge_router_core={level},tower_http=debug"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
