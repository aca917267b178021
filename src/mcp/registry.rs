//! Name-indexed operation and prompt registries.
//!
//! Both registries are built once from fixed groups and are read-only afterwards.
//! Listing order is registration order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use rmcp::handler::server::common::schema_for_type;
use rmcp::model::{CallToolResult, GetPromptResult, JsonObject, Prompt, PromptArgument, Tool};
use rmcp::schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::{OperationError, RegistryError};

pub type OperationFuture = BoxFuture<'static, Result<CallToolResult, OperationError>>;
type OperationHandler = Arc<dyn Fn(JsonObject) -> OperationFuture + Send + Sync>;

pub type PromptFuture = BoxFuture<'static, Result<GetPromptResult, OperationError>>;
type PromptHandler = Arc<dyn Fn(JsonObject) -> PromptFuture + Send + Sync>;

#[derive(Clone)]
pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
    handler: OperationHandler,
}

impl Operation {
    /// Wrap a typed handler. The argument bag is deserialized into `P` before the
    /// handler runs; `P`'s JSON schema becomes the operation's input schema.
    pub fn new<P, F, Fut>(name: &'static str, description: &'static str, handler: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, OperationError>> + Send + 'static,
    {
        let handler: OperationHandler = Arc::new(move |args: JsonObject| {
            match serde_json::from_value::<P>(serde_json::Value::Object(args)) {
                Ok(params) => handler(params).boxed(),
                Err(e) => futures::future::ready(Err(OperationError::InvalidArguments(e))).boxed(),
            }
        });

        Self {
            name,
            description,
            input_schema: schema_for_type::<P>(),
            handler,
        }
    }

    pub fn descriptor(&self) -> Tool {
        Tool::new(self.name, self.description, self.input_schema.clone())
    }

    pub fn call(&self, args: JsonObject) -> OperationFuture {
        (self.handler)(args)
    }
}


#[derive(Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
    index: HashMap<&'static str, usize>,
}

impl OperationRegistry {
    pub fn from_groups(
        groups: impl IntoIterator<Item = Vec<Operation>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for operation in groups.into_iter().flatten() {
            registry.insert(operation)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, operation: Operation) -> Result<(), RegistryError> {
        if self.index.contains_key(operation.name) {
            return Err(RegistryError::DuplicateOperation(operation.name.to_string()));
        }
        self.index.insert(operation.name, self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.index.get(name).map(|&i| &self.operations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

#[derive(Debug, Clone)]
pub struct PromptArgumentSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Clone)]
pub struct PromptDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgumentSpec>,
    handler: PromptHandler,
}

impl PromptDescriptor {
    pub fn new<F, Fut>(
        name: &'static str,
        description: &'static str,
        arguments: Vec<PromptArgumentSpec>,
        handler: F,
    ) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GetPromptResult, OperationError>> + Send + 'static,
    {
        Self {
            name,
            description,
            arguments,
            handler: Arc::new(move |args| handler(args).boxed()),
        }
    }

    pub fn descriptor(&self) -> Prompt {
        let arguments = self
            .arguments
            .iter()
            .map(|a| PromptArgument {
                name: a.name.to_string(),
                title: None,
                description: Some(a.description.to_string()),
                required: Some(a.required),
            })
            .collect();
        Prompt::new(self.name, Some(self.description), Some(arguments))
    }

    pub fn render(&self, args: JsonObject) -> PromptFuture {
        (self.handler)(args)
    }
}

#[derive(Default)]
pub struct PromptRegistry {
    prompts: Vec<PromptDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl PromptRegistry {
    pub fn from_groups(
        groups: impl IntoIterator<Item = Vec<PromptDescriptor>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for prompt in groups.into_iter().flatten() {
            if registry.index.contains_key(prompt.name) {
                return Err(RegistryError::DuplicatePrompt(prompt.name.to_string()));
            }
            registry.index.insert(prompt.name, registry.prompts.len());
            registry.prompts.push(prompt);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&PromptDescriptor> {
        self.index.get(name).map(|&i| &self.prompts[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptDescriptor> {
        self.prompts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::format::text_result;
    use rmcp::schemars;

    #[derive(serde::Deserialize, JsonSchema)]
    struct EchoParams {
        #[schemars(description = "Text to echo")]
        text: String,
        #[allow(dead_code)]
        repeat: Option<u32>,
    }

    fn echo(name: &'static str) -> Operation {
        Operation::new(name, "Echo the input", |p: EchoParams| async move {
            text_result(p.text)
        })
    }

    #[test]
    fn duplicate_operation_names_are_rejected() {
        let err = OperationRegistry::from_groups([vec![echo("echo")], vec![echo("echo")]])
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::DuplicateOperation(name) if name == "echo"));
    }

    #[test]
    fn schema_marks_only_non_optional_fields_required() {
        let op = echo("echo");
        let required = op.input_schema["required"].as_array().unwrap();
        assert_eq!(required, &vec![serde_json::json!("text")]);
        assert!(op.input_schema["properties"]["repeat"].is_object());
    }

    #[test]
    fn schema_is_a_bare_object_schema() {
        let op = echo("echo");
        assert!(!op.input_schema.contains_key("$schema"));
        assert_eq!(op.input_schema["type"], "object");
    }

    #[tokio::test]
    async fn bad_arguments_surface_as_invalid_arguments() {
        let op = echo("echo");
        let mut args = JsonObject::new();
        args.insert("text".into(), serde_json::json!(42));
        let err = op.call(args).await.unwrap_err();
        assert!(matches!(err, OperationError::InvalidArguments(_)));
    }
}
