//! The tool registry: `tools/list` and `tools/call`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use turbomcp_core::{Error, Result};
use turbomcp_protocol::types::{ToolCallResult, ToolDescriptor};

use super::{ChangeNotifier, InvocationContext};

/// A registered tool's callable behavior.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value, ctx: InvocationContext) -> Result<ToolCallResult>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ToolCallResult>> + Send,
{
    async fn call(&self, arguments: Value, ctx: InvocationContext) -> Result<ToolCallResult> {
        (self)(arguments, ctx).await
    }
}

struct Entry {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Read-mostly, mutex-guarded store of tools, insert-ordered.
#[derive(Default)]
pub struct ToolRegistry {
    entries: std::sync::Mutex<Vec<Entry>>,
    changed: ChangeNotifier,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_list_changed(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    /// Register a tool. Fails without mutating the registry if `name` is
    /// already registered and `overwrite` is false; with `overwrite=true`
    /// the previous descriptor and handler are fully replaced.
    pub fn register(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
        overwrite: bool,
    ) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.iter_mut().find(|e| e.descriptor.name == descriptor.name) {
            if !overwrite {
                return Err(Error::invalid_params(format!(
                    "tool '{}' already registered",
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

    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.descriptor.name != name);
        let removed = entries.len() != before;
        drop(entries);
        if removed {
            self.changed.notify_changed();
        }
        removed
    }

    /// Defensive clones, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
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

    /// Bind `arguments` and invoke `name`'s handler.
    ///
    /// Binding order: exact name match on the tool; for each declared
    /// schema property, an exact-named argument, else the schema's default,
    /// else `InvalidParams` if the property is required.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        ctx: InvocationContext,
    ) -> Result<ToolCallResult> {
        let (handler, schema) = {
            let entries = self.entries.lock().unwrap();
            let entry = entries
                .iter()
                .find(|e| e.descriptor.name == name)
                .ok_or_else(|| Error::not_found(format!("tool '{name}'")))?;
            (entry.handler.clone(), entry.descriptor.input_schema.clone())
        };
        let bound = bind_arguments(&schema, arguments)?;
        handler.call(bound, ctx).await
    }
}

/// Apply the exact-name -> schema-default -> required-missing binding rule
/// against a JSON Schema object's `properties`/`required`.
fn bind_arguments(schema: &Value, mut arguments: Value) -> Result<Value> {
    let Some(obj) = arguments.as_object_mut() else {
        return Err(Error::invalid_params("arguments must be a JSON object"));
    };
    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(properties) = properties {
        for (prop_name, prop_schema) in properties {
            if obj.contains_key(prop_name) {
                continue;
            }
            if let Some(default) = prop_schema.get("default") {
                obj.insert(prop_name.clone(), default.clone());
            } else if required.contains(&prop_name.as_str()) {
                return Err(Error::invalid_params(format!(
                    "missing required argument '{prop_name}'"
                )));
            }
        }
    }
    Ok(Value::Object(obj.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbomcp_core::{CancellationToken, SessionId};

    struct NoopElicit;
    #[async_trait]
    impl super::super::ElicitSink for NoopElicit {
        async fn elicit(
            &self,
            _session_id: SessionId,
            _message: String,
            _schema: Value,
            _cancellation: CancellationToken,
        ) -> Result<turbomcp_protocol::types::ElicitationResult> {
            Ok(turbomcp_protocol::types::ElicitationResult::decline())
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(SessionId::generate(), CancellationToken::new(), Arc::new(NoopElicit))
    }

    #[tokio::test]
    async fn register_twice_without_overwrite_fails_and_does_not_mutate() {
        let registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::new("add", serde_json::json!({}));
        let handler: Arc<dyn ToolHandler> =
            Arc::new(|_args, _ctx| async { Ok(ToolCallResult::text("ok")) });
        registry.register(descriptor.clone(), handler.clone(), false).unwrap();
        let err = registry
            .register(descriptor.clone().with_description("changed"), handler, false)
            .unwrap_err();
        assert!(matches!(err.kind(), turbomcp_core::ErrorKind::InvalidParams(_)));
        assert_eq!(registry.list()[0].description, None);
    }

    #[tokio::test]
    async fn overwrite_replaces_descriptor_fully() {
        let registry = ToolRegistry::new();
        let handler: Arc<dyn ToolHandler> =
            Arc::new(|_args, _ctx| async { Ok(ToolCallResult::text("ok")) });
        registry
            .register(ToolDescriptor::new("add", serde_json::json!({})), handler.clone(), false)
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("add", serde_json::json!({})).with_description("sums"),
                handler,
                true,
            )
            .unwrap();
        assert_eq!(registry.list()[0].description.as_deref(), Some("sums"));
    }

    #[tokio::test]
    async fn binding_prefers_exact_name_over_default() {
        let schema = serde_json::json!({
            "properties": {"a": {"type": "number", "default": 0}},
            "required": ["a"]
        });
        let bound = bind_arguments(&schema, serde_json::json!({"a": 5})).unwrap();
        assert_eq!(bound["a"], 5);
    }

    #[tokio::test]
    async fn binding_falls_back_to_default_then_errors_if_required_missing() {
        let schema = serde_json::json!({
            "properties": {"a": {"type": "number", "default": 1}, "b": {"type": "number"}},
            "required": ["b"]
        });
        let bound = bind_arguments(&schema, serde_json::json!({})).unwrap_err();
        assert!(matches!(bound.kind(), turbomcp_core::ErrorKind::InvalidParams(_)));

        let schema_with_default_only = serde_json::json!({
            "properties": {"a": {"type": "number", "default": 1}}
        });
        let bound = bind_arguments(&schema_with_default_only, serde_json::json!({})).unwrap();
        assert_eq!(bound["a"], 1);
    }

    #[tokio::test]
    async fn call_invokes_registered_handler() {
        let registry = ToolRegistry::new();
        let handler: Arc<dyn ToolHandler> = Arc::new(|args: Value, _ctx| async move {
            let a = args["a"].as_i64().unwrap_or(0);
            let b = args["b"].as_i64().unwrap_or(0);
            Ok(ToolCallResult::text(format!("The sum is {}", a + b)))
        });
        registry
            .register(
                ToolDescriptor::new(
                    "add",
                    serde_json::json!({"properties": {"a": {"type": "number"}, "b": {"type": "number"}}, "required": ["a", "b"]}),
                ),
                handler,
                false,
            )
            .unwrap();
        let result = registry
            .call("add", serde_json::json!({"a": 5, "b": 7}), ctx())
            .await
            .unwrap();
        assert_eq!(result.content[0].as_text(), Some("The sum is 12"));
        assert!(!result.is_error);
    }
}
