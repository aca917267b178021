use std::sync::Arc;

use rmcp::model::CallToolResult;
use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_LIMIT, PageCursor, Pagination, bind};
use crate::bitbucket::Backend;
use crate::bitbucket::model::{Link, SearchRequest};
use crate::error::OperationError;
use crate::mcp::format::{json_result, text_result};
use crate::mcp::registry::Operation;

const BROWSE_LIMIT: u32 = 100;

// Parameter types for each operation

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListProjectsParams {
    #[schemars(description = "Maximum number of projects to return (default: 25)")]
    pub limit: Option<u32>,
    #[schemars(description = "Start index for pagination (default: 0)")]
    pub start: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetProjectParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListRepositoriesParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Maximum number of repositories to return (default: 25)")]
    pub limit: Option<u32>,
    #[schemars(description = "Start index for pagination (default: 0)")]
    pub start: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrowseRepositoryParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Path to browse (default: root)")]
    pub path: Option<String>,
    #[schemars(description = "Branch, tag, or commit to browse at (default: default branch)")]
    pub at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetFileContentParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Path to the file")]
    pub path: String,
    #[schemars(description = "Branch, tag, or commit (default: default branch)")]
    pub at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchCodeParams {
    #[schemars(description = "Search query")]
    pub query: String,
    #[schemars(description = "Limit search to a specific project (optional)")]
    pub project_key: Option<String>,
    #[schemars(description = "Limit search to a specific repository (requires projectKey)")]
    pub repo_slug: Option<String>,
    #[schemars(description = "Maximum number of results (default: 25)")]
    pub limit: Option<u32>,
}

// Projections

#[derive(Serialize)]
struct ProjectSummary<'a> {
    key: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    public: bool,
}

#[derive(Serialize)]
struct ProjectList<'a> {
    projects: Vec<ProjectSummary<'a>>,
    pagination: PageCursor,
}

#[derive(Serialize)]
struct ProjectDetail<'a> {
    key: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositorySummary<'a> {
    slug: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    public: bool,
    clone_urls: &'a [Link],
}

#[derive(Serialize)]
struct RepositoryList<'a> {
    repositories: Vec<RepositorySummary<'a>>,
    pagination: PageCursor,
}

#[derive(Serialize)]
struct ProjectRef<'a> {
    key: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryDetail<'a> {
    slug: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    public: bool,
    forkable: bool,
    project: ProjectRef<'a>,
    clone_urls: &'a [Link],
}

#[derive(Serialize)]
struct BrowseChild<'a> {
    name: &'a str,
    path: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

#[derive(Serialize)]
struct BrowseListing<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<&'a str>,
    children: Vec<BrowseChild<'a>>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct SearchLineView<'a> {
    line: u64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlight: Option<bool>,
}

#[derive(Serialize)]
struct SearchHitView<'a> {
    file: &'a str,
    repository: String,
    matches: Vec<Vec<SearchLineView<'a>>>,
}

#[derive(Serialize)]
struct SearchView<'a> {
    count: u64,
    results: Vec<SearchHitView<'a>>,
}

// Handlers

pub async fn list_projects(
    backend: Arc<dyn Backend>,
    params: ListProjectsParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .list_projects(params.limit.unwrap_or(DEFAULT_LIMIT), params.start.unwrap_or(0))
        .await?;

    json_result(&ProjectList {
        projects: page
            .values
            .iter()
            .map(|p| ProjectSummary {
                key: &p.key,
                name: &p.name,
                description: p.description.as_deref(),
                public: p.public,
            })
            .collect(),
        pagination: PageCursor::of(&page),
    })
}

pub async fn get_project(
    backend: Arc<dyn Backend>,
    params: GetProjectParams,
) -> Result<CallToolResult, OperationError> {
    let project = backend.get_project(&params.project_key).await?;
    json_result(&ProjectDetail {
        key: &project.key,
        name: &project.name,
        description: project.description.as_deref(),
        public: project.public,
        link: project.links.self_href(),
    })
}

pub async fn list_repositories(
    backend: Arc<dyn Backend>,
    params: ListRepositoriesParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .list_repositories(
            &params.project_key,
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.start.unwrap_or(0),
        )
        .await?;

    json_result(&RepositoryList {
        repositories: page
            .values
            .iter()
            .map(|r| RepositorySummary {
                slug: &r.slug,
                name: &r.name,
                description: r.description.as_deref(),
                public: r.public,
                clone_urls: &r.links.clone,
            })
            .collect(),
        pagination: PageCursor::of(&page),
    })
}

pub async fn get_repository(
    backend: Arc<dyn Backend>,
    params: RepositoryParams,
) -> Result<CallToolResult, OperationError> {
    let repo = backend
        .get_repository(&params.project_key, &params.repo_slug)
        .await?;

    json_result(&RepositoryDetail {
        slug: &repo.slug,
        name: &repo.name,
        description: repo.description.as_deref(),
        public: repo.public,
        forkable: repo.forkable,
        project: ProjectRef {
            key: &repo.project.key,
            name: &repo.project.name,
        },
        clone_urls: &repo.links.clone,
    })
}

pub async fn browse_repository(
    backend: Arc<dyn Backend>,
    params: BrowseRepositoryParams,
) -> Result<CallToolResult, OperationError> {
    let listing = backend
        .browse(
            &params.project_key,
            &params.repo_slug,
            params.path.as_deref().unwrap_or(""),
            params.at.as_deref(),
            BROWSE_LIMIT,
        )
        .await?;

    json_result(&BrowseListing {
        path: &listing.path.display,
        revision: listing.revision.as_deref(),
        children: listing
            .children
            .values
            .iter()
            .map(|c| BrowseChild {
                name: &c.path.name,
                path: &c.path.display,
                kind: &c.kind,
                size: c.size,
            })
            .collect(),
        pagination: Pagination::of(&listing.children),
    })
}

pub async fn get_file_content(
    backend: Arc<dyn Backend>,
    params: GetFileContentParams,
) -> Result<CallToolResult, OperationError> {
    let content = backend
        .file_content(
            &params.project_key,
            &params.repo_slug,
            &params.path,
            params.at.as_deref(),
        )
        .await?;
    text_result(content)
}

pub async fn search_code(
    backend: Arc<dyn Backend>,
    params: SearchCodeParams,
) -> Result<CallToolResult, OperationError> {
    let request = SearchRequest::new(
        &params.query,
        params.project_key.as_deref(),
        params.repo_slug.as_deref(),
    );
    let found = backend
        .search_code(&request, params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    let view = match &found.code {
        Some(code) => SearchView {
            count: code.count,
            results: code
                .values
                .iter()
                .map(|hit| SearchHitView {
                    file: &hit.file.path,
                    repository: format!("{}/{}", hit.repository.project.key, hit.repository.slug),
                    matches: hit
                        .hit_contexts
                        .iter()
                        .map(|ctx| {
                            ctx.context
                                .iter()
                                .map(|c| SearchLineView {
                                    line: c.line.line,
                                    text: &c.line.text,
                                    highlight: c.highlight,
                                })
                                .collect()
                        })
                        .collect(),
                })
                .collect(),
        },
        None => SearchView {
            count: 0,
            results: Vec::new(),
        },
    };
    json_result(&view)
}

pub fn operations(backend: Arc<dyn Backend>) -> Vec<Operation> {
    vec![
        bind(&backend, "list_projects", "List all projects in Bitbucket", list_projects),
        bind(&backend, "get_project", "Get details of a specific project", get_project),
        bind(
            &backend,
            "list_repositories",
            "List repositories in a project",
            list_repositories,
        ),
        bind(
            &backend,
            "get_repository",
            "Get details of a specific repository",
            get_repository,
        ),
        bind(
            &backend,
            "browse_repository",
            "Browse files and directories in a repository",
            browse_repository,
        ),
        bind(
            &backend,
            "get_file_content",
            "Get the content of a file in a repository",
            get_file_content,
        ),
        bind(
            &backend,
            "search_code",
            "Search for code across repositories",
            search_code,
        ),
    ]
}
