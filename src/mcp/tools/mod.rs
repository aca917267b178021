//! Operation groups. Each group returns its descriptors with handlers bound to a
//! shared backend; the dispatcher composes them into one registry.

pub mod branch;
pub mod pull_request;
pub mod repository;

use std::future::Future;
use std::sync::Arc;

use rmcp::model::CallToolResult;
use rmcp::schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::registry::Operation;
use crate::bitbucket::Backend;
use crate::bitbucket::model::Paged;
use crate::error::OperationError;

pub(crate) const DEFAULT_LIMIT: u32 = 25;

pub(crate) fn bind<P, F, Fut>(
    backend: &Arc<dyn Backend>,
    name: &'static str,
    description: &'static str,
    handler: F,
) -> Operation
where
    P: DeserializeOwned + JsonSchema + 'static,
    F: Fn(Arc<dyn Backend>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, OperationError>> + Send + 'static,
{
    let backend = backend.clone();
    Operation::new(name, description, move |params: P| {
        handler(backend.clone(), params)
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    pub size: u64,
    pub is_last_page: bool,
}

impl Pagination {
    pub fn of<T>(page: &Paged<T>) -> Self {
        Self {
            size: page.size,
            is_last_page: page.is_last_page,
        }
    }
}

/// Pagination echo for listings the caller is expected to page through.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageCursor {
    pub size: u64,
    pub limit: u64,
    pub is_last_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_start: Option<u64>,
}

impl PageCursor {
    pub fn of<T>(page: &Paged<T>) -> Self {
        Self {
            size: page.size,
            limit: page.limit,
            is_last_page: page.is_last_page,
            next_page_start: page.next_page_start,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
