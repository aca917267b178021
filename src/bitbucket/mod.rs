pub mod client;
pub mod model;

use async_trait::async_trait;

use crate::error::BitbucketError;

pub use client::BitbucketClient;
use model::{
    Activity, BrowseResult, Branch, Comment, CommentQuery, CommentUpdate, CurrentUser,
    DashboardRole, Direction, NewComment, NewPullRequest, Paged, Project, PullRequest,
    PullRequestUpdate, Repository, ReviewerStatus, SearchRequest, SearchResult, StateFilter,
};

pub type BackendResult<T> = Result<T, BitbucketError>;

/// One call per method against the Bitbucket Server REST API.
///
/// Implementations never retry and never cache; every failure is reported as a
/// [`BitbucketError`]. The single exception is [`Backend::current_user`], which
/// substitutes [`CurrentUser::unknown`] instead of failing.
#[async_trait]
pub trait Backend: Send + Sync {
    // --- Projects & repositories ---

    async fn list_projects(&self, limit: u32, start: u32) -> BackendResult<Paged<Project>>;

    async fn get_project(&self, project: &str) -> BackendResult<Project>;

    async fn list_repositories(
        &self,
        project: &str,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Repository>>;

    async fn get_repository(&self, project: &str, repo: &str) -> BackendResult<Repository>;

    async fn browse(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        at: Option<&str>,
        limit: u32,
    ) -> BackendResult<BrowseResult>;

    async fn file_content(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        at: Option<&str>,
    ) -> BackendResult<String>;

    async fn search_code(&self, request: &SearchRequest, limit: u32)
    -> BackendResult<SearchResult>;

    // --- Branches ---

    async fn list_branches(
        &self,
        project: &str,
        repo: &str,
        filter: Option<&str>,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Branch>>;

    async fn default_branch(&self, project: &str, repo: &str) -> BackendResult<Branch>;

    // --- Pull requests ---

    async fn list_pull_requests(
        &self,
        project: &str,
        repo: &str,
        state: StateFilter,
        direction: Direction,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<PullRequest>>;

    async fn get_pull_request(&self, project: &str, repo: &str, id: u64)
    -> BackendResult<PullRequest>;

    async fn create_pull_request(
        &self,
        project: &str,
        repo: &str,
        request: &NewPullRequest,
    ) -> BackendResult<PullRequest>;

    async fn update_pull_request(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        update: &PullRequestUpdate,
    ) -> BackendResult<PullRequest>;

    async fn pull_request_diff(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        context_lines: Option<u32>,
    ) -> BackendResult<String>;

    async fn pull_request_activities(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<Activity>>;

    async fn approve(&self, project: &str, repo: &str, id: u64) -> BackendResult<()>;

    async fn unapprove(&self, project: &str, repo: &str, id: u64) -> BackendResult<()>;

    async fn set_reviewer_status(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
        status: ReviewerStatus,
    ) -> BackendResult<()>;

    async fn remove_participant(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        username: &str,
    ) -> BackendResult<()>;

    async fn merge(&self, project: &str, repo: &str, id: u64, version: i64)
    -> BackendResult<PullRequest>;

    async fn decline(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        version: i64,
    ) -> BackendResult<PullRequest>;

    // --- Comments ---

    async fn add_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment: &NewComment,
    ) -> BackendResult<Comment>;

    async fn comments(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        query: &CommentQuery,
    ) -> BackendResult<Paged<Comment>>;

    async fn update_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        update: &CommentUpdate,
    ) -> BackendResult<Comment>;

    async fn delete_comment(
        &self,
        project: &str,
        repo: &str,
        id: u64,
        comment_id: u64,
        version: i64,
    ) -> BackendResult<()>;

    // --- Current user ---

    async fn current_user(&self) -> CurrentUser;

    async fn inbox_pull_requests(&self, limit: u32, start: u32)
    -> BackendResult<Paged<PullRequest>>;

    async fn dashboard_pull_requests(
        &self,
        role: DashboardRole,
        state: Option<StateFilter>,
        limit: u32,
        start: u32,
    ) -> BackendResult<Paged<PullRequest>>;
}
