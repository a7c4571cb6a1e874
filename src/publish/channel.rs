//! In-memory publisher over a tokio broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use super::{PublishError, PublishRequest, Publisher};

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 1024;

/// Publisher delivering to in-process subscribers.
///
/// Every subscriber sees every request; topic filtering is up to the
/// receiver. Publishing with no live subscriber fails, so the event stays
/// in the outbox until someone listens.
pub struct ChannelPublisher {
    sender: broadcast::Sender<Arc<PublishRequest>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PublishRequest>> {
        self.sender.subscribe()
    }
}

impl Default for ChannelPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, request: PublishRequest) -> Result<(), PublishError> {
        let topic = request.topic.clone();
        let receivers = self
            .sender
            .send(Arc::new(request))
            .map_err(|_| PublishError::NoSubscribers(topic.clone()))?;
        debug!(topic = %topic, receivers = receivers, "Published to channel");
        Ok(())
    }
}
