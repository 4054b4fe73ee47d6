//! Explicit registration builder (design note ii): a tool is a name, a JSON
//! Schema, and a handler — registered here, never discovered reflectively.

use std::sync::Arc;

use turbomcp_protocol::types::{Implementation, PromptDescriptor, ResourceDescriptor, ToolDescriptor};
use turbomcp_transport::Transport;

use crate::dispatcher::Dispatcher;
use crate::registry::completions::CompletionHandler;
use crate::registry::prompts::PromptHandler;
use crate::registry::resources::ResourceHandler;
use crate::registry::tools::ToolHandler;
use crate::session::Session;

/// Builds a [`Dispatcher`] by registering tools, prompts, resources, and
/// completion handlers before any session connects.
pub struct ServerBuilder {
    server_info: Implementation,
    dispatcher: Dispatcher,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let server_info = Implementation {
            name: name.into(),
            version: version.into(),
        };
        Self {
            dispatcher: Dispatcher::new(server_info.clone()),
            server_info,
        }
    }

    #[must_use]
    pub fn tool(
        self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.dispatcher
            .tools
            .register(descriptor, Arc::new(handler), false)
            .expect("tool registered before startup must not collide");
        self
    }

    #[must_use]
    pub fn prompt(self, descriptor: PromptDescriptor, handler: impl PromptHandler + 'static) -> Self {
        self.dispatcher
            .prompts
            .register(descriptor, Arc::new(handler), false)
            .expect("prompt registered before startup must not collide");
        self
    }

    #[must_use]
    pub fn resource(
        self,
        descriptor: ResourceDescriptor,
        handler: impl ResourceHandler + 'static,
    ) -> Self {
        self.dispatcher
            .resources
            .register(descriptor, Arc::new(handler), false)
            .expect("resource registered before startup must not collide");
        self
    }

    #[must_use]
    pub fn completion(
        self,
        reference_kind: &str,
        identifier: &str,
        handler: impl CompletionHandler + 'static,
    ) -> Self {
        self.dispatcher
            .completions
            .register(reference_kind, identifier, Arc::new(handler));
        self
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn build(self) -> Arc<Dispatcher> {
        Arc::new(self.dispatcher)
    }
}

/// Accept one session on `transport` and drive it until the transport
/// closes. Wire this into a transport's own accept hook (e.g.
/// [`turbomcp_transport::http_sse::SseHub::new`]'s `on_accept`).
pub async fn accept_session(dispatcher: Arc<Dispatcher>, transport: Arc<dyn Transport>) {
    let session = Arc::new(Session::new(Default::default()));
    dispatcher.run(transport, session).await;
}
