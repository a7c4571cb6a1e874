//! Mock publisher for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PublishError, PublishRequest, Publisher};

/// Records every request; can be switched to fail.
#[derive(Default)]
pub struct MockPublisher {
    published: RwLock<Vec<PublishRequest>>,
    fail_on_publish: RwLock<bool>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn take_published(&self) -> Vec<PublishRequest> {
        std::mem::take(&mut *self.published.write().await)
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, request: PublishRequest) -> Result<(), PublishError> {
        if *self.fail_on_publish.read().await {
            return Err(PublishError::Connection(
                "Mock publish failure".to_string(),
            ));
        }
        self.published.write().await.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request() -> PublishRequest {
        PublishRequest {
            pubsub_name: "pubsub".into(),
            topic: "orders".into(),
            metadata: HashMap::new(),
            content_type: "json".into(),
            data: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_publisher_records() {
        let publisher = MockPublisher::new();
        tokio_test::assert_ok!(publisher.publish(request()).await);
        assert_eq!(publisher.published_count().await, 1);
        assert_eq!(publisher.take_published().await.len(), 1);
        assert_eq!(publisher.published_count().await, 0);
    }

    #[tokio::test]
    async fn test_mock_publisher_fail_on_publish() {
        let publisher = MockPublisher::new();
        publisher.set_fail_on_publish(true).await;
        tokio_test::assert_err!(publisher.publish(request()).await);
        assert_eq!(publisher.published_count().await, 0);
    }
}
