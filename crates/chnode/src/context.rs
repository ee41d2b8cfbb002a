//! The seam between the node and its hosting runtime

use async_trait::async_trait;
use chnode_core::{ChNodeError, JsonObject, RawCredentials, Result};
use chnode_transport::HostHttp;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything the node needs from the host for one execution
///
/// The host owns item iteration, expression evaluation and credential
/// storage; the node only ever sees resolved values through this trait.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// JSON payloads of the input items
    fn input_items(&self) -> &[JsonObject];

    /// Resolved value of parameter `name` for the item at `item_index`
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;

    /// Decrypted credential record
    async fn credentials(&self) -> Result<RawCredentials>;

    /// The host's HTTP helper; without one requests go out directly
    fn http_delegate(&self) -> Option<Arc<dyn HostHttp>> {
        None
    }

    /// Whether per-item failures become `{error}` records
    fn continue_on_fail(&self) -> bool {
        false
    }
}

/// In-process context with fixed items, parameters and credentials
///
/// Per-item parameters override node-level ones for their item.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticContext {
    credentials: RawCredentials,
    parameters: JsonObject,
    item_parameters: Vec<JsonObject>,
    items: Vec<JsonObject>,
    continue_on_fail: bool,
    #[serde(skip)]
    delegate: Option<Arc<dyn HostHttp>>,
}

impl StaticContext {
    pub fn new(credentials: RawCredentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Build from `{credentials, parameters, itemParameters, items, continueOnFail}`
    ///
    /// The serde message is left out of the error since it quotes the
    /// offending value, which may be a credential.
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|_| {
            ChNodeError::configuration(
                "Invalid execution context: expected an object with credentials, \
                 parameters, itemParameters, items and continueOnFail",
            )
        })
    }

    pub fn with_items(mut self, items: Vec<JsonObject>) -> Self {
        self.items = items;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_item_parameter(
        mut self,
        item_index: usize,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        if self.item_parameters.len() <= item_index {
            self.item_parameters.resize_with(item_index + 1, JsonObject::new);
        }
        self.item_parameters[item_index].insert(name.into(), value.into());
        self
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn HostHttp>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

impl std::fmt::Debug for StaticContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticContext")
            .field("credentials", &self.credentials)
            .field("parameters", &self.parameters)
            .field("items", &self.items.len())
            .field("continue_on_fail", &self.continue_on_fail)
            .field("delegate", &self.delegate.is_some())
            .finish()
    }
}

#[async_trait]
impl ExecutionContext for StaticContext {
    fn input_items(&self) -> &[JsonObject] {
        &self.items
    }

    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.item_parameters
            .get(item_index)
            .and_then(|overrides| overrides.get(name))
            .or_else(|| self.parameters.get(name))
            .cloned()
    }

    async fn credentials(&self) -> Result<RawCredentials> {
        Ok(self.credentials.clone())
    }

    fn http_delegate(&self) -> Option<Arc<dyn HostHttp>> {
        self.delegate.clone()
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }
}
