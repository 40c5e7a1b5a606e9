//! catbus-consumer: subscribe and print notifications
//!
//! Registers a consumer, prints the categories currently on offer, subscribes
//! to the categories given on the command line (or one read from stdin), then
//! prints every notification until interrupted.
//!
//! ## Usage
//! ```text
//! catbus-consumer <consumer_id> [category...]
//! ```

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use catbus::client::{Consumer, ConsumerEndpoints};
use catbus::config::Config;
use catbus::packet::{Category, ClientId};
use catbus::transport::init_transport;
use catbus::utils::bootstrap::{client_endpoints, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        return Err(format!("Usage: {} <consumer_id> [category...]", args[0]).into());
    }
    let id = ClientId(args[1].parse()?);
    let mut categories = args[2..]
        .iter()
        .map(|arg| arg.parse().map(Category))
        .collect::<Result<Vec<_>, _>>()?;
    let (action, notification) = client_endpoints(id).ok_or("consumer id out of range")?;

    let config = Config::load(None)?;
    let transport = init_transport(&config.transport)?;

    let mut consumer = Consumer::register(
        transport,
        config.dispatcher.endpoint,
        id,
        ConsumerEndpoints {
            action,
            notification,
        },
    )
    .await
    .map_err(|e| {
        error!(consumer = %id, error = %e, "Registration failed");
        e
    })?;

    println!("Consumer {} registered", id);

    let available = consumer.available_categories().await?;
    if available.is_empty() {
        println!("No categories available yet");
    } else {
        println!("Available categories:");
        for listing in &available {
            println!("  category {} (producer {})", listing.category, listing.producer);
        }
    }

    if categories.is_empty() {
        println!("Enter category to subscribe to:");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let line = lines.next_line().await?.ok_or("no category given")?;
        categories.push(Category(line.trim().parse()?));
    }

    for category in &categories {
        consumer.subscribe(*category).await?;
        println!("Subscribed to category {}", category);
    }

    let mut notifications = consumer
        .notifications()
        .ok_or("notification stream unavailable")?;

    println!("Waiting for notifications...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = notifications.next() => match next {
                Some(n) => println!("[category {}] {}", n.category, n.body),
                None => {
                    println!("Notification endpoint closed");
                    break;
                }
            },
        }
    }

    info!(consumer = %consumer.id(), "Consumer exiting");
    Ok(())
}
