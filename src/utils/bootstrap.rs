//! Bootstrap utilities for catbus binaries.
//!
//! Shared initialization code for the dispatcher and the client tools.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;
use crate::packet::{ClientId, EndpointId};

/// First endpoint handed out to command-line clients.
pub const CLIENT_ENDPOINT_BASE: u32 = 1000;

/// Initialize tracing with the CATBUS_LOG environment variable.
///
/// Defaults to "info" level if CATBUS_LOG is not set. Output goes to stderr
/// so client tools keep stdout for payloads.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Endpoints a command-line client binds: `(action, notification)`.
///
/// Each client id gets two adjacent endpoints above [`CLIENT_ENDPOINT_BASE`].
/// Returns `None` for negative ids or ids that overflow the endpoint space.
pub fn client_endpoints(id: ClientId) -> Option<(EndpointId, EndpointId)> {
    let id = u32::try_from(id.0).ok()?;
    let action = id.checked_mul(2)?.checked_add(CLIENT_ENDPOINT_BASE)?;
    let notification = action.checked_add(1)?;
    Some((EndpointId(action), EndpointId(notification)))
}
