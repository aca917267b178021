use std::sync::Arc;

use rmcp::model::CallToolResult;
use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_LIMIT, Pagination, bind};
use super::repository::RepositoryParams;
use crate::bitbucket::Backend;
use crate::error::OperationError;
use crate::mcp::format::json_result;
use crate::mcp::registry::Operation;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListBranchesParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Filter branches by name (optional)")]
    pub filter_text: Option<String>,
    #[schemars(description = "Maximum number of branches to return (default: 25)")]
    pub limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BranchView<'a> {
    name: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_commit: Option<&'a str>,
    is_default: bool,
}

#[derive(Serialize)]
struct BranchList<'a> {
    branches: Vec<BranchView<'a>>,
    pagination: Pagination,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultBranch<'a> {
    name: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_commit: Option<&'a str>,
}

pub async fn list_branches(
    backend: Arc<dyn Backend>,
    p: ListBranchesParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .list_branches(
            &p.project_key,
            &p.repo_slug,
            p.filter_text.as_deref(),
            p.limit.unwrap_or(DEFAULT_LIMIT),
            0,
        )
        .await?;

    json_result(&BranchList {
        branches: page
            .values
            .iter()
            .map(|b| BranchView {
                name: &b.display_id,
                id: &b.id,
                latest_commit: b.latest_commit.as_deref(),
                is_default: b.is_default,
            })
            .collect(),
        pagination: Pagination::of(&page),
    })
}

pub async fn get_default_branch(
    backend: Arc<dyn Backend>,
    p: RepositoryParams,
) -> Result<CallToolResult, OperationError> {
    let branch = backend
        .default_branch(&p.project_key, &p.repo_slug)
        .await?;
    json_result(&DefaultBranch {
        name: &branch.display_id,
        id: &branch.id,
        latest_commit: branch.latest_commit.as_deref(),
    })
}

pub fn operations(backend: Arc<dyn Backend>) -> Vec<Operation> {
    vec![
        bind(
            &backend,
            "list_branches",
            "List branches in a repository",
            list_branches,
        ),
        bind(
            &backend,
            "get_default_branch",
            "Get the default branch of a repository",
            get_default_branch,
        ),
    ]
}
