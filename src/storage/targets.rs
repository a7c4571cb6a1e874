//! Name to physical-target cache for relation tables/collections.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// Idempotent get-or-create cache keyed by target name.
///
/// Creation runs outside the lock. Two racing callers may both create the
/// same target; the creator must therefore be idempotent, and the later
/// insert simply overwrites an equivalent handle.
pub struct TargetCache<H> {
    targets: RwLock<HashMap<String, H>>,
}

impl<H: Clone + Send + Sync> TargetCache<H> {
    pub fn new() -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, name: &str) -> Option<H> {
        self.targets.read().await.get(name).cloned()
    }

    pub async fn get_or_create<F, Fut>(&self, name: &str, create: F) -> Result<H>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H>>,
    {
        if let Some(handle) = self.get(name).await {
            return Ok(handle);
        }
        let handle = create().await?;
        debug!(target_name = %name, "Relation target resolved");
        self.targets
            .write()
            .await
            .insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn len(&self) -> usize {
        self.targets.read().await.len()
    }
}

impl<H: Clone + Send + Sync> Default for TargetCache<H> {
    fn default() -> Self {
        Self::new()
    }
}
