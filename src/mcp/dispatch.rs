use std::sync::Arc;

use rmcp::model::{
    CallToolResult, GetPromptResult, JsonObject, Prompt, PromptMessage, PromptMessageRole, Tool,
};
use tracing::{debug, info, warn};

use super::format::error_result;
use super::registry::{OperationRegistry, PromptRegistry};
use super::{prompts, tools};
use crate::bitbucket::Backend;
use crate::error::{DispatchError, OperationError, RegistryError};

/// Routes list/invoke requests to the registries by name.
///
/// Handler failures never escape as protocol errors: operations answer with a
/// flagged `{"error": ...}` envelope, prompts with a single `Error: ...` message.
/// Only an unknown name is reported as a [`DispatchError`].
pub struct Dispatcher {
    operations: OperationRegistry,
    prompts: PromptRegistry,
}

impl Dispatcher {
    pub fn new(operations: OperationRegistry, prompts: PromptRegistry) -> Self {
        Self {
            operations,
            prompts,
        }
    }

    pub fn for_backend(backend: Arc<dyn Backend>) -> Result<Self, RegistryError> {
        let operations = OperationRegistry::from_groups([
            tools::repository::operations(backend.clone()),
            tools::pull_request::operations(backend.clone()),
            tools::branch::operations(backend.clone()),
        ])?;
        let prompts = PromptRegistry::from_groups([prompts::review::prompts(backend)])?;
        info!(operations = operations.len(), "registered operations");
        Ok(Self::new(operations, prompts))
    }

    pub fn list_operations(&self) -> Vec<Tool> {
        self.operations.iter().map(|op| op.descriptor()).collect()
    }

    pub async fn invoke(
        &self,
        name: &str,
        args: Option<JsonObject>,
    ) -> Result<CallToolResult, DispatchError> {
        let operation = self
            .operations
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))?;

        debug!(operation = name, "invoking operation");
        match operation.call(args.unwrap_or_default()).await {
            Ok(result) => Ok(result),
            Err(err) => {
                let status = match &err {
                    OperationError::Backend(e) => e.status(),
                    _ => None,
                };
                warn!(operation = name, status = ?status, error = %err, "operation failed");
                Ok(error_result(&err.to_string()))
            }
        }
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.iter().map(|p| p.descriptor()).collect()
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        args: Option<JsonObject>,
    ) -> Result<GetPromptResult, DispatchError> {
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| DispatchError::UnknownPrompt(name.to_string()))?;

        debug!(prompt = name, "rendering prompt");
        match prompt.render(args.unwrap_or_default()).await {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(prompt = name, error = %err, "prompt failed");
                Ok(GetPromptResult {
                    description: None,
                    messages: vec![PromptMessage::new_text(
                        PromptMessageRole::User,
                        format!("Error: {err}"),
                    )],
                })
            }
        }
    }
}
