//! The prompt registry: `prompts/list` and `prompts/get`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use turbomcp_core::{CancellationToken, Error, Result};
use turbomcp_protocol::types::{PromptDescriptor, PromptMessage};

use super::ChangeNotifier;

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(
        &self,
        arguments: HashMap<String, String>,
        cancellation: CancellationToken,
    ) -> Result<Vec<PromptMessage>>;
}

#[async_trait]
impl<F, Fut> PromptHandler for F
where
    F: Fn(HashMap<String, String>, CancellationToken) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Vec<PromptMessage>>> + Send,
{
    async fn get(
        &self,
        arguments: HashMap<String, String>,
        cancellation: CancellationToken,
    ) -> Result<Vec<PromptMessage>> {
        (self)(arguments, cancellation).await
    }
}

struct Entry {
    descriptor: PromptDescriptor,
    handler: Arc<dyn PromptHandler>,
}

#[derive(Default)]
pub struct PromptRegistry {
    entries: std::sync::Mutex<Vec<Entry>>,
    changed: ChangeNotifier,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_list_changed(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    pub fn register(
        &self,
        descriptor: PromptDescriptor,
        handler: Arc<dyn PromptHandler>,
        overwrite: bool,
    ) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.iter_mut().find(|e| e.descriptor.name == descriptor.name) {
            if !overwrite {
                return Err(Error::invalid_params(format!(
                    "prompt '{}' already registered",
                    descriptor.name
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

    pub fn list(&self) -> Vec<PromptDescriptor> {
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

    pub async fn get(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
        cancellation: CancellationToken,
    ) -> Result<Vec<PromptMessage>> {
        let handler = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .find(|e| e.descriptor.name == name)
                .map(|e| e.handler.clone())
                .ok_or_else(|| Error::not_found(format!("prompt '{name}'")))?
        };
        handler.get(arguments, cancellation).await
    }
}
