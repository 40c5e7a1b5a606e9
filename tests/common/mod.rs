//! Shared utilities for integration tests.
//!
//! Spawns a dispatcher on its own task and hands out clients wired to it.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use catbus::client::{Consumer, ConsumerEndpoints, Producer};
use catbus::dispatcher::{Dispatcher, DispatcherConfig};
use catbus::packet::{Category, ClientId, EndpointId};
use catbus::transport::Transport;

/// How long a test waits for something that should not arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// A dispatcher running in the background.
pub struct RunningDispatcher {
    pub transport: Arc<dyn Transport>,
    pub endpoint: EndpointId,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Dispatcher>,
}

impl RunningDispatcher {
    pub async fn start(transport: Arc<dyn Transport>) -> Self {
        Self::start_with(transport, DispatcherConfig::default()).await
    }

    pub async fn start_with(transport: Arc<dyn Transport>, config: DispatcherConfig) -> Self {
        let mut dispatcher = Dispatcher::bind(transport.clone(), config)
            .await
            .expect("dispatcher should bind");
        let endpoint = dispatcher.endpoint();
        let (shutdown, signal) = oneshot::channel();

        let handle = tokio::spawn(async move {
            dispatcher
                .run_until(async {
                    let _ = signal.await;
                })
                .await
                .expect("dispatcher loop should not fail");
            dispatcher
        });

        Self {
            transport,
            endpoint,
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub async fn producer(&self, id: i32, category: i32) -> Producer {
        Producer::register(
            self.transport.clone(),
            self.endpoint,
            ClientId(id),
            Category(category),
            action_endpoint(id),
        )
        .await
        .expect("producer should register")
    }

    pub async fn consumer(&self, id: i32) -> Consumer {
        Consumer::register(
            self.transport.clone(),
            self.endpoint,
            ClientId(id),
            consumer_endpoints(id),
        )
        .await
        .expect("consumer should register")
    }

    /// Stop the loop and return the dispatcher for inspection.
    pub async fn stop(mut self) -> Dispatcher {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.await.expect("dispatcher task panicked")
    }
}

pub fn action_endpoint(id: i32) -> EndpointId {
    EndpointId(2000 + id as u32 * 2)
}

pub fn consumer_endpoints(id: i32) -> ConsumerEndpoints {
    ConsumerEndpoints {
        action: action_endpoint(id),
        notification: EndpointId(2001 + id as u32 * 2),
    }
}
