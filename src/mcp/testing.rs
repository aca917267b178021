//! In-memory [`Backend`] for handler and dispatcher tests.

use std::sync::Mutex;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, GetPromptResult, JsonObject, PromptMessageContent};
use serde_json::Value;

use crate::bitbucket::model::{
    Activity, BrowseResult, Branch, Comment, CommentQuery, CommentUpdate, CurrentUser,
    DashboardRole, Direction, NewComment, NewPullRequest, Paged, Project, PullRequest,
    PullRequestUpdate, Repository, ReviewerStatus, SearchRequest, SearchResult, StateFilter,
};
use crate::bitbucket::{Backend, BackendResult};
use crate::error::BitbucketError;

/// Canned responses per endpoint. Anything left as `None` answers with a 501.
#[derive(Default)]
pub struct FakeBackend {
    pub projects: Option<Paged<Project>>,
    pub project: Option<Project>,
    pub repositories: Option<Paged<Repository>>,
    pub repository: Option<Repository>,
    pub browse: Option<BrowseResult>,
    pub file: Option<String>,
    pub search: Option<SearchResult>,
    pub branches: Option<Paged<Branch>>,
    pub default_branch: Option<Branch>,
    pub pull_requests: Option<Paged<PullRequest>>,
    pub pull_request: Option<PullRequest>,
    pub pull_request_error: Option<BitbucketError>,
    pub diff: Option<String>,
    pub activities: Option<Paged<Activity>>,
    pub comments: Option<Paged<Comment>>,
    pub dashboard: Option<Paged<PullRequest>>,
    pub inbox: Option<Paged<PullRequest>>,
    pub current_user: Option<CurrentUser>,

    pub calls: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<PullRequestUpdate>>,
    pub new_comments: Mutex<Vec<NewComment>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<PullRequestUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn added_comments(&self) -> Vec<NewComment> {
        self.new_comments.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pr(&self) -> BackendResult<PullRequest> {
        match &self.pull_request_error {
            Some(err) => Err(err.clone()),
            None => stub(&self.pull_request, "pull_request"),
        }
    }
}

fn stub<T: Clone>(value: &Option<T>, name: &str) -> BackendResult<T> {
    value
        .clone()
        .ok_or_else(|| BitbucketError::api(format!("{name} not stubbed"), Some(501)))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_projects(&self, limit: u32, start: u32) -> BackendResult<Paged<Project>> {
        self.record(format!("list_projects limit={limit} start={start}"));
        stub(&self.projects, "projects")
    }

    async fn get_project(&self, project: &str) -> BackendResult<Project> {
        self.record(format!("get_project {project}"));
        stub(&self.project, "project")
    }

    async fn list_repositories(
        &self,
        project: &str,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Repository>> {
        self.record(format!("list_repositories {project} limit={limit} start={start}"));
        stub(&self.repositories, "repositories")
    }

    async fn get_repository(&self, project: &str, repo: &str) -> BackendResult<Repository> {
        self.record(format!("get_repository {project}/{repo}"));
        stub(&self.repository, "repository")
    }

    async fn browse(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        _at: Option<&str>,
        limit: u32,
    ) -> BackendResult<BrowseResult> {
        self.record(format!("browse {project}/{repo} path={path} limit={limit}"));
        stub(&self.browse, "browse")
    }

    async fn file_content(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        _at: Option<&str>,
    ) -> BackendResult<String> {
        self.record(format!("file_content {project}/{repo} {path}"));
        stub(&self.file, "file")
    }

    async fn search_code(
        &self,
        request: &SearchRequest,
        limit: u32,
    ) -> BackendResult<SearchResult> {
        self.record(format!("search_code {} limit={limit}", request.query));
        stub(&self.search, "search")
    }

    async fn list_branches(
        &self,
        project: &str,
        repo: &str,
        _filter: Option<&str>,
        limit: u32,
        _start: u32,
    ) -> BackendResult<Paged<Branch>> {
        self.record(format!("list_branches {project}/{repo} limit={limit}"));
        stub(&self.branches, "branches")
    }

    async fn default_branch(&self, project: &str, repo: &str) -> BackendResult<Branch> {
        self.record(format!("default_branch {project}/{repo}"));
        stub(&self.default_branch, "default_branch")
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repo: &str,
        state: StateFilter,
        direction: Direction,
        limit: u32,
        _start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        self.record(format!(
            "list_pull_requests {project}/{repo} state={} direction={} limit={limit}",
            state.as_str(),
            direction.as_str()
        ));
        stub(&self.pull_requests, "pull_requests")
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repo: &str,
        id: u64,
    ) -> BackendResult<PullRequest> {
        self.record(format!("get_pull_request {project}/{repo}#{id}"));
        self.pr()
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repo: &str,
        request: &NewPullRequest,
    ) -> BackendResult<PullRequest> {
        self.record(format!("create_pull_request {project}/{repo} {}", request.title));
        self.pr()
    }

    async fn update_pull_request(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        update: &PullRequestUpdate,
    ) -> BackendResult<PullRequest> {
        self.record(format!("update_pull_request {project}/{repo}#{id}"));
        self.updates.lock().unwrap().push(update.clone());
        self.pr()
    }

    async fn pull_request_diff(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        context_lines: Option<u32>,
    ) -> BackendResult<String> {
        let context = context_lines.map_or("default".to_string(), |n| n.to_string());
        self.record(format!("pull_request_diff {project}/{repo}#{id} context={context}"));
        stub(&self.diff, "diff")
    }

    async fn pull_request_activities(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        limit: u32,
        _start: u32,
    ) -> BackendResult<Paged<Activity>> {
        self.record(format!("pull_request_activities {project}/{repo}#{id} limit={limit}"));
        stub(&self.activities, "activities")
    }

    async fn approve(&self, project: &str, repo: &str, id: u64) -> BackendResult<()> {
        self.record(format!("approve {project}/{repo}#{id}"));
        Ok(())
    }

    async fn unapprove(&self, project: &str, repo: &str, id: u64) -> BackendResult<()> {
        self.record(format!("unapprove {project}/{repo}#{id}"));
        Ok(())
    }

    async fn set_reviewer_status(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
        status: ReviewerStatus,
    ) -> BackendResult<()> {
        self.record(format!(
            "set_reviewer_status {project}/{repo}#{id} {username}={}",
            status.as_str()
        ));
        Ok(())
    }

    async fn remove_participant(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
    ) -> BackendResult<()> {
        self.record(format!("remove_participant {project}/{repo}#{id} {username}"));
        Ok(())
    }

    async fn merge(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        version: i64,
    ) -> BackendResult<PullRequest> {
        self.record(format!("merge {project}/{repo}#{id} version={version}"));
        self.pr()
    }

    async fn decline(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        version: i64,
    ) -> BackendResult<PullRequest> {
        self.record(format!("decline {project}/{repo}#{id} version={version}"));
        self.pr()
    }

    async fn add_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment: &NewComment,
    ) -> BackendResult<Comment> {
        self.record(format!("add_comment {project}/{repo}#{id}"));
        let mut added = self.new_comments.lock().unwrap();
        added.push(comment.clone());
        Ok(Comment {
            id: added.len() as u64,
            text: comment.text.clone(),
            ..Comment::default()
        })
    }

    async fn comments(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        query: &CommentQuery,
    ) -> BackendResult<Paged<Comment>> {
        self.record(format!(
            "comments {project}/{repo}#{id} limit={} anchor={}",
            query.limit,
            query.anchor_state.as_str()
        ));
        stub(&self.comments, "comments")
    }

    async fn update_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        update: &CommentUpdate,
    ) -> BackendResult<Comment> {
        self.record(format!("update_comment {project}/{repo}#{id} {comment_id}"));
        Ok(Comment {
            id: comment_id,
            version: update.version + 1,
            text: update.text.clone(),
            ..Comment::default()
        })
    }

    async fn delete_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        version: i64,
    ) -> BackendResult<()> {
        self.record(format!(
            "delete_comment {project}/{repo}#{id} {comment_id} version={version}"
        ));
        Ok(())
    }

    async fn current_user(&self) -> CurrentUser {
        self.record("current_user".to_string());
        self.current_user.clone().unwrap_or_else(CurrentUser::unknown)
    }

    async fn inbox_pull_requests(
        &self,
        limit: u32,
        _start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        self.record(format!("inbox_pull_requests limit={limit}"));
        stub(&self.inbox, "inbox")
    }

    async fn dashboard_pull_requests(
        &self,
        role: DashboardRole,
        state: Option<StateFilter>,
        limit: u32,
        _start: u32,
    ) -> BackendResult<Paged<PullRequest>> {
        let state = state.map_or("none", StateFilter::as_str);
        self.record(format!(
            "dashboard_pull_requests role={} state={state} limit={limit}",
            role.as_str()
        ));
        stub(&self.dashboard, "dashboard")
    }
}

pub fn args(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn result_text(result: &CallToolResult) -> String {
    result.content[0]
        .as_text()
        .expect("text content")
        .text
        .clone()
}

pub fn result_json(result: &CallToolResult) -> Value {
    serde_json::from_str(&result_text(result)).expect("result is JSON")
}

pub fn prompt_text(result: &GetPromptResult) -> String {
    match &result.messages[0].content {
        PromptMessageContent::Text { text } => text.clone(),
        other => panic!("expected text prompt content, got {other:?}"),
    }
}
