//! Notification fan-out.

use tracing::{debug, info, warn};

use super::Dispatcher;
use crate::packet::{Body, Category, ControlPacket};

/// Tally of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Subscribers of the category when the pass started.
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl Dispatcher {
    /// Send one copy of `body` to every subscriber of `category`.
    ///
    /// Subscribers are visited in subscription order. A failed send is
    /// logged and the pass moves on to the next subscriber.
    #[tracing::instrument(name = "dispatcher.distribute", skip_all, fields(category = %category))]
    pub async fn distribute(&self, category: Category, body: &Body) -> FanOutReport {
        let subscribers = self.subscriptions.subscribers_of(category);
        let mut report = FanOutReport {
            matched: subscribers.len(),
            ..Default::default()
        };

        if subscribers.is_empty() {
            info!(category = %category, "No subscribers for category");
            return report;
        }

        let notification = ControlPacket::notification(category, body.clone());

        for record in &subscribers {
            match self.deliver(record.endpoint, &notification).await {
                Ok(()) => {
                    debug!(
                        subscriber = %record.subscriber,
                        endpoint = %record.endpoint,
                        "Delivered notification"
                    );
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(
                        subscriber = %record.subscriber,
                        endpoint = %record.endpoint,
                        error = %e,
                        "Failed to deliver notification"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            category = %category,
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            "Notification distributed"
        );

        report
    }
}
