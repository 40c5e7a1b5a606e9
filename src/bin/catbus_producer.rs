//! catbus-producer: publish stdin lines to one category
//!
//! Registers as the owner of a category, then sends every line read from
//! stdin as a notification. `exit` or end of input quits.
//!
//! ## Usage
//! ```text
//! catbus-producer <producer_id> <category>
//! ```
//!
//! Endpoints are derived from the producer id; see
//! [`catbus::utils::bootstrap::client_endpoints`].

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use catbus::client::Producer;
use catbus::config::Config;
use catbus::packet::{Body, Category, ClientId, MAX_BODY_LEN};
use catbus::transport::init_transport;
use catbus::utils::bootstrap::{client_endpoints, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err(format!("Usage: {} <producer_id> <category>", args[0]).into());
    }
    let id = ClientId(args[1].parse()?);
    let category = Category(args[2].parse()?);
    let (action, _) = client_endpoints(id).ok_or("producer id out of range")?;

    let config = Config::load(None)?;
    let transport = init_transport(&config.transport)?;

    let producer =
        Producer::register(transport, config.dispatcher.endpoint, id, category, action)
            .await
            .map_err(|e| {
                error!(producer = %id, category = %category, error = %e, "Registration failed");
                e
            })?;

    println!("Registered producer {} for category {}", id, category);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        if line == "exit" {
            break;
        }

        if line.len() > MAX_BODY_LEN {
            warn!(len = line.len(), max = MAX_BODY_LEN, "Truncating notification");
        }
        let body = Body::truncated(line);

        match producer.notify(body.as_str()).await {
            Ok(()) => println!("Notification sent: {}", body),
            Err(e) => error!(error = %e, "Failed to send notification"),
        }
    }

    info!(producer = %producer.id(), "Producer exiting");
    Ok(())
}
