use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::model::{
    Activity, BrowseResult, Branch, Comment, CommentQuery, CommentUpdate, CurrentUser,
    DashboardRole, Direction, NewComment, NewPullRequest, Paged, ParticipantStatus, Project,
    PullRequest, PullRequestUpdate, Repository, ReviewerStatus, SearchRequest, SearchResult,
    StateFilter,
};
use super::{Backend, BackendResult};
use crate::error::BitbucketError;

type Query<'a> = Vec<(&'a str, String)>;

/// Bearer-token client for a Bitbucket Server instance.
pub struct BitbucketClient {
    http: Client,
    base_url: String,
}

impl BitbucketClient {
    pub fn new(base_url: &str, token: &str) -> BackendResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| BitbucketError::api(format!("invalid token: {e}"), None))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("bitbucket-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/1.0{path}", self.base_url)
    }

    fn repo_url(&self, project: &str, repo: &str, rest: &str) -> String {
        self.api(&format!(
            "/projects/{}/repos/{}{rest}",
            encode(project),
            encode(repo)
        ))
    }

    fn pr_url(&self, project: &str, repo: &str, id: u64, rest: &str) -> String {
        self.repo_url(project, repo, &format!("/pull-requests/{id}{rest}"))
    }

    /// `POST .../merge` or `.../decline`, guarded by the pull request version.
    fn state_change(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        action: &str,
        version: i64,
    ) -> RequestBuilder {
        let url = self.pr_url(project, repo, id, &format!("/{action}"));
        self.http
            .post(url)
            .query(&version_query(version))
            .json(&serde_json::json!({}))
    }

    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let request = builder.build().map_err(transport_error)?;
        debug!(method = %request.method(), url = %request.url(), "bitbucket request");

        let response = self.http.execute(request).await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> BackendResult<T> {
        let response = self.send(builder).await?;
        let url = response.url().to_string();
        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| BitbucketError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    async fn text(&self, builder: RequestBuilder) -> BackendResult<String> {
        self.send(builder)
            .await?
            .text()
            .await
            .map_err(transport_error)
    }

    async fn discard(&self, builder: RequestBuilder) -> BackendResult<()> {
        self.send(builder).await.map(|_| ())
    }
}

fn page(limit: u32, start: u32) -> Query<'static> {
    vec![("limit", limit.to_string()), ("start", start.to_string())]
}

fn version_query(version: i64) -> Query<'static> {
    vec![("version", version.to_string())]
}

/// `ALL` is expressed by leaving the state filter out.
fn dashboard_query(
    role: DashboardRole,
    state: Option<StateFilter>,
    limit: u32,
    start: u32,
) -> Query<'static> {
    let mut query = vec![("role", role.as_str().to_string())];
    push_opt(
        &mut query,
        "state",
        state.filter(|s| *s != StateFilter::All).map(StateFilter::as_str),
    );
    query.extend(page(limit, start));
    query
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode each `/`-separated part of a repository path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/').map(encode).collect::<Vec<_>>().join("/")
}

fn push_opt<'a>(query: &mut Query<'a>, key: &'a str, value: Option<&str>) {
    if let Some(v) = value {
        query.push((key, v.to_string()));
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    message: Option<String>,
}

/// Compose the error for a non-2xx response. Prefers the first structured error,
/// then a top-level `message`, then a generic status line.
pub(crate) fn api_error(status: StatusCode, body: &str) -> BitbucketError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| {
            b.errors
                .into_iter()
                .next()
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .or(b.message)
        })
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
    BitbucketError::api(message, Some(status.as_u16()))
}

fn transport_error(err: reqwest::Error) -> BitbucketError {
    BitbucketError::api(err.to_string(), err.status().map(|s| s.as_u16()))
}

#[async_trait]
impl Backend for BitbucketClient {
    async fn list_projects(&self, limit: u32, start: u32) -> BackendResult<Paged<Project>> {
        self.json(self.http.get(self.api("/projects")).query(&page(limit, start)))
            .await
    }

    async fn get_project(&self, project: &str) -> BackendResult<Project> {
        self.json(self.http.get(self.api(&format!("/projects/{}", encode(project)))))
            .await
    }

    async fn list_repositories(
        &self,
        project: &str,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Repository>> {
        let url = self.api(&format!("/projects/{}/repos", encode(project)));
        self.json(self.http.get(url).query(&page(limit, start))).await
    }

    async fn get_repository(&self, project: &str, repo: &str) -> BackendResult<Repository> {
        self.json(self.http.get(self.repo_url(project, repo, "")))
            .await
    }

    async fn browse(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        at: Option<&str>,
        limit: u32,
    ) -> BackendResult<BrowseResult> {
        let url = self.repo_url(project, repo, &format!("/browse/{}", encode_path(path)));
        let mut query = vec![("limit", limit.to_string())];
        push_opt(&mut query, "at", at);
        self.json(self.http.get(url).query(&query)).await
    }

    async fn file_content(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        at: Option<&str>,
    ) -> BackendResult<String> {
        let url = self.repo_url(project, repo, &format!("/raw/{}", encode_path(path)));
        let mut query = Query::new();
        push_opt(&mut query, "at", at);
        self.text(self.http.get(url).query(&query)).await
    }

    async fn search_code(
        &self,
        request: &SearchRequest,
        limit: u32,
    ) -> BackendResult<SearchResult> {
        let url = format!("{}/rest/search/latest/search", self.base_url);
        self.json(
            self.http
                .post(url)
                .query(&[("limit", limit.to_string())])
                .json(request),
        )
        .await
    }

    async fn list_branches(
        &self,
        project: &str,
        repo: &str,
        filter: Option<&str>,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Branch>> {
        let mut query = page(limit, start);
        push_opt(&mut query, "filterText", filter);
        let url = self.repo_url(project, repo, "/branches");
        self.json(self.http.get(url).query(&query)).await
    }

    async fn default_branch(&self, project: &str, repo: &str) -> BackendResult<Branch> {
        self.json(self.http.get(self.repo_url(project, repo, "/default-branch")))
            .await
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repo: &str,
        state: StateFilter,
        direction: Direction,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        let mut query = page(limit, start);
        query.push(("state", state.as_str().to_string()));
        query.push(("direction", direction.as_str().to_string()));
        let url = self.repo_url(project, repo, "/pull-requests");
        self.json(self.http.get(url).query(&query)).await
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repo: &str,
        id: u64,
    ) -> BackendResult<PullRequest> {
        self.json(self.http.get(self.pr_url(project, repo, id, "")))
            .await
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repo: &str,
        request: &NewPullRequest,
    ) -> BackendResult<PullRequest> {
        let url = self.repo_url(project, repo, "/pull-requests");
        self.json(self.http.post(url).json(request)).await
    }

    async fn update_pull_request(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        update: &PullRequestUpdate,
    ) -> BackendResult<PullRequest> {
        self.json(self.http.put(self.pr_url(project, repo, id, "")).json(update))
            .await
    }

    async fn pull_request_diff(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        context_lines: Option<u32>,
    ) -> BackendResult<String> {
        let mut query = Query::new();
        if let Some(lines) = context_lines {
            query.push(("contextLines", lines.to_string()));
        }
        let url = self.pr_url(project, repo, id, "/diff");
        self.text(
            self.http
                .get(url)
                .header(ACCEPT, "text/plain")
                .query(&query),
        )
        .await
    }

    async fn pull_request_activities(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Activity>> {
        let url = self.pr_url(project, repo, id, "/activities");
        self.json(self.http.get(url).query(&page(limit, start))).await
    }

    async fn approve(&self, project: &str, repo: &str, id: u64) -> BackendResult<()> {
        self.discard(self.http.post(self.pr_url(project, repo, id, "/approve")))
            .await
    }

    async fn unapprove(&self, project: &str, repo: &str, id: u64) -> BackendResult<()> {
        self.discard(self.http.delete(self.pr_url(project, repo, id, "/approve")))
            .await
    }

    async fn set_reviewer_status(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
        status: ReviewerStatus,
    ) -> BackendResult<()> {
        let url = self.pr_url(project, repo, id, &format!("/participants/{}", encode(username)));
        debug!(username, status = status.as_str(), "setting reviewer status");
        let body = ParticipantStatus::new(username, status);
        self.discard(self.http.put(url).json(&body)).await
    }

    async fn remove_participant(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
    ) -> BackendResult<()> {
        let url = self.pr_url(project, repo, id, &format!("/participants/{}", encode(username)));
        self.discard(self.http.delete(url)).await
    }

    async fn merge(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        version: i64,
    ) -> BackendResult<PullRequest> {
        self.json(self.state_change(project, repo, id, "merge", version))
            .await
    }

    async fn decline(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        version: i64,
    ) -> BackendResult<PullRequest> {
        self.json(self.state_change(project, repo, id, "decline", version))
            .await
    }

    async fn add_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment: &NewComment,
    ) -> BackendResult<Comment> {
        let url = self.pr_url(project, repo, id, "/comments");
        self.json(self.http.post(url).json(comment)).await
    }

    async fn comments(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        query: &CommentQuery,
    ) -> BackendResult<Paged<Comment>> {
        let mut params = page(query.limit, query.start);
        push_opt(&mut params, "path", query.path.as_deref());
        params.push(("anchorState", query.anchor_state.as_str().to_string()));
        let url = self.pr_url(project, repo, id, "/comments");
        self.json(self.http.get(url).query(&params)).await
    }

    async fn update_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        update: &CommentUpdate,
    ) -> BackendResult<Comment> {
        let url = self.pr_url(project, repo, id, &format!("/comments/{comment_id}"));
        self.json(self.http.put(url).json(update)).await
    }

    async fn delete_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        version: i64,
    ) -> BackendResult<()> {
        let url = self.pr_url(project, repo, id, &format!("/comments/{comment_id}"));
        self.discard(self.http.delete(url).query(&version_query(version)))
            .await
    }

    async fn current_user(&self) -> CurrentUser {
        // Not every server version ships the applinks servlet; an unknown user is
        // reported instead of an error.
        let url = format!("{}/plugins/servlet/applinks/whoami", self.base_url);
        match self.text(self.http.get(url)).await {
            Ok(body) if !body.trim().is_empty() => {
                let name = body.trim().to_string();
                CurrentUser {
                    display_name: name.clone(),
                    name,
                }
            }
            Ok(_) => {
                warn!("whoami returned an empty body; reporting unknown user");
                CurrentUser::unknown()
            }
            Err(err) => {
                warn!(error = %err, "whoami lookup failed; reporting unknown user");
                CurrentUser::unknown()
            }
        }
    }

    async fn inbox_pull_requests(
        &self,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        let mut query = page(limit, start);
        query.push(("role", "REVIEWER".to_string()));
        self.json(self.http.get(self.api("/inbox/pull-requests")).query(&query))
            .await
    }

    async fn dashboard_pull_requests(
        &self,
        role: DashboardRole,
        state: Option<StateFilter>,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        let query = dashboard_query(role, state, limit, start);
        self.json(
            self.http
                .get(self.api("/dashboard/pull-requests"))
                .query(&query),
        )
        .await
    }
}
