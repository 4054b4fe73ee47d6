//! The resource registry: `resources/list` and `resources/read`.
//!
//! `uri` is the identity key; comparisons are case-insensitive while the
//! originally-registered casing is preserved in listings.

use std::sync::Arc;

use async_trait::async_trait;
use turbomcp_core::{Error, Result};
use turbomcp_protocol::types::{ResourceContent, ResourceDescriptor};

use super::ChangeNotifier;

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self) -> Result<Vec<ResourceContent>>;
}

#[async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Vec<ResourceContent>>> + Send,
{
    async fn read(&self) -> Result<Vec<ResourceContent>> {
        (self)().await
    }
}

struct Entry {
    descriptor: ResourceDescriptor,
    handler: Arc<dyn ResourceHandler>,
}

#[derive(Default)]
pub struct ResourceRegistry {
    entries: std::sync::Mutex<Vec<Entry>>,
    changed: ChangeNotifier,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_list_changed(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    pub fn register(
        &self,
        descriptor: ResourceDescriptor,
        handler: Arc<dyn ResourceHandler>,
        overwrite: bool,
    ) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.descriptor.uri.eq_ignore_ascii_case(&descriptor.uri))
        {
            if !overwrite {
                return Err(Error::invalid_params(format!(
                    "resource '{}' already registered",
                    descriptor.uri
                )));
            }
            existing.descriptor = descriptor;
            existing.handler = handler;
        } else {
            entries.push(Entry { descriptor, handler });
        }
        drop(entries);
        self.changed.notify_changed();
        Ok(())
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub async fn read(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        let handler = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .find(|e| e.descriptor.uri.eq_ignore_ascii_case(uri))
                .map(|e| e.handler.clone())
                .ok_or_else(|| Error::not_found(format!("resource '{uri}'")))?
        };
        handler.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let registry = ResourceRegistry::new();
        registry
            .register(
                ResourceDescriptor::new("file:///Notes.txt"),
                Arc::new(|| async {
                    Ok(vec![ResourceContent::Text {
                        uri: "file:///Notes.txt".into(),
                        mime_type: None,
                        text: "hi".into(),
                    }])
                }),
                false,
            )
            .unwrap();
        let content = registry.read("file:///notes.txt").await.unwrap();
        assert_eq!(content.len(), 1);
    }
}
