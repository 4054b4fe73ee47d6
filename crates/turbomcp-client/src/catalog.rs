//! `PromptResourceCatalog` caches prompt/resource listings, refreshing
//! lazily or on `list_changed` notifications, with concurrent refreshes
//! collapsed so readers never observe a half-updated snapshot.

use std::sync::Arc;

use tokio::sync::Mutex;
use turbomcp_core::Result;
use turbomcp_protocol::types::{PromptDescriptor, ResourceDescriptor};

use crate::client::Client;

struct Cached<T> {
    value: Option<Vec<T>>,
}

/// Owned by [`Client`]; not constructed directly.
pub struct PromptResourceCatalog {
    client: Arc<Client>,
    prompts: Mutex<Cached<PromptDescriptor>>,
    resources: Mutex<Cached<ResourceDescriptor>>,
}

impl std::fmt::Debug for PromptResourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptResourceCatalog").finish_non_exhaustive()
    }
}

impl PromptResourceCatalog {
    pub(crate) fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            prompts: Mutex::new(Cached { value: None }),
            resources: Mutex::new(Cached { value: None }),
        }
    }

    /// Returns the cached prompt list, refreshing it first if empty.
    /// Concurrent callers serialize behind the same lock, so they all see
    /// one consistent refresh rather than racing independent RPCs.
    pub async fn prompts(&self) -> Result<Vec<PromptDescriptor>> {
        let mut cached = self.prompts.lock().await;
        if cached.value.is_none() {
            cached.value = Some(self.client.list_prompts().await?);
        }
        Ok(cached.value.clone().unwrap())
    }

    pub async fn resources(&self) -> Result<Vec<ResourceDescriptor>> {
        let mut cached = self.resources.lock().await;
        if cached.value.is_none() {
            cached.value = Some(self.client.list_resources().await?);
        }
        Ok(cached.value.clone().unwrap())
    }

    /// Invalidate the prompt cache; called when a `prompts/list_changed`
    /// notification arrives.
    pub async fn invalidate_prompts(&self) {
        self.prompts.lock().await.value = None;
    }

    pub async fn invalidate_resources(&self) {
        self.resources.lock().await.value = None;
    }
}
