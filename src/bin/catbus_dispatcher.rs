//! catbus-dispatcher: category broker
//!
//! Owns the well-known dispatcher endpoint, accepts producer and consumer
//! registrations, and fans every notification out to the subscribers of its
//! category.
//!
//! ## Usage
//! ```text
//! catbus-dispatcher [config.yaml]
//! ```
//!
//! ## Configuration
//! - CATBUS_CONFIG: additional YAML config file
//! - CATBUS__DISPATCHER__ENDPOINT: dispatcher endpoint (default: 42)
//! - CATBUS__TRANSPORT__UDS__BASE_PATH: socket directory (default: /tmp/catbus)
//! - CATBUS_LOG: tracing filter (default: info)

use tracing::{error, info};

use catbus::config::Config;
use catbus::dispatcher::Dispatcher;
use catbus::transport::init_transport;
use catbus::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        endpoint = %config.dispatcher.endpoint,
        send_policy = ?config.dispatcher.send_policy,
        "Starting catbus-dispatcher"
    );

    let transport = init_transport(&config.transport)?;
    let mut dispatcher = Dispatcher::bind(transport, config.dispatcher)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to bind dispatcher endpoint");
            e
        })?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    };

    dispatcher.run_until(shutdown).await.map_err(|e| {
        error!(error = %e, "Dispatcher stopped");
        e
    })?;

    info!(
        categories = dispatcher.categories().len(),
        subscriptions = dispatcher.subscriptions().len(),
        "Dispatcher exited"
    );

    Ok(())
}
