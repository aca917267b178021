use std::sync::Arc;

use rmcp::model::CallToolResult;
use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Ack, DEFAULT_LIMIT, Pagination, bind};
use crate::bitbucket::Backend;
use crate::bitbucket::model::{
    AnchorState, BranchRef, CommentAnchor, CommentQuery, CommentUpdate, DashboardRole, Direction,
    FileType, LineType, NewComment, NewPullRequest, Participant, PullRequest, PullRequestState,
    PullRequestUpdate, ReviewerRef, ReviewerStatus, StateFilter,
};
use crate::error::OperationError;
use crate::mcp::format::{iso_timestamp, json_result, text_result};
use crate::mcp::registry::Operation;

const COMMENT_LIMIT: u32 = 100;

// --- Parameters ---

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListPullRequestsParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "PR state filter (default: OPEN)")]
    pub state: Option<StateFilter>,
    #[schemars(description = "INCOMING (targeting this repository) or OUTGOING (default: INCOMING)")]
    pub direction: Option<Direction>,
    #[schemars(description = "Maximum number of PRs to return (default: 25)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequestParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "PR title")]
    pub title: String,
    #[schemars(description = "Source branch name")]
    pub from_branch: String,
    #[schemars(description = "Target branch name")]
    pub to_branch: String,
    #[schemars(description = "PR description (optional)")]
    pub description: Option<String>,
    #[schemars(description = "List of reviewer usernames (optional)")]
    pub reviewers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiffParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Number of context lines around changes (default: 3)")]
    pub context_lines: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Maximum number of activities to return (default: 25)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Username of the participant")]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionedParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Current version of the PR (for optimistic locking)")]
    pub version: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePullRequestParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(
        description = "Current version of the PR (for optimistic locking). Get it from get_pull_request."
    )]
    pub version: i64,
    #[schemars(description = "New title for the PR (optional)")]
    pub title: Option<String>,
    #[schemars(description = "New description for the PR (optional)")]
    pub description: Option<String>,
    #[schemars(
        description = "New list of reviewer usernames. This will REPLACE all existing reviewers. (optional)"
    )]
    pub reviewers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewersParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(
        description = "Current version of the PR (for optimistic locking). Get it from get_pull_request."
    )]
    pub version: i64,
    #[schemars(description = "List of reviewer usernames to add")]
    pub reviewers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Comment text")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLineCommentParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Comment text")]
    pub text: String,
    #[schemars(description = "Path to the file being commented on, relative to the repository root")]
    pub file_path: String,
    #[schemars(
        description = "Line number to comment on. For ADDED lines this is the line in the destination file."
    )]
    pub line: u64,
    #[schemars(
        description = "ADDED (new line in destination), REMOVED (deleted line from source), CONTEXT (unchanged line). Default: CONTEXT"
    )]
    pub line_type: Option<LineType>,
    #[schemars(
        description = "FROM for the source file, TO for the destination file. Only honoured for CONTEXT lines. Default: TO"
    )]
    pub file_type: Option<FileType>,
    #[schemars(
        description = "Source commit hash (fromRef.latestCommit). Looked up from the pull request when omitted."
    )]
    pub from_hash: Option<String>,
    #[schemars(
        description = "Destination commit hash (toRef.latestCommit). Looked up from the pull request when omitted."
    )]
    pub to_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "ID of the comment to reply to")]
    pub parent_comment_id: u64,
    #[schemars(description = "Reply text")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetCommentsParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "Filter comments by file path (optional)")]
    pub path: Option<String>,
    #[schemars(
        description = "Filter by anchor state: ACTIVE (current), ORPHANED (outdated), ALL (default: ALL)"
    )]
    pub anchor_state: Option<AnchorState>,
    #[schemars(description = "Maximum number of comments to return (default: 100)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "ID of the comment to update")]
    pub comment_id: u64,
    #[schemars(description = "New comment text")]
    pub text: String,
    #[schemars(description = "Current version of the comment (for optimistic locking)")]
    pub version: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentParams {
    #[schemars(description = "Project key (e.g., \"PROJ\")")]
    pub project_key: String,
    #[schemars(description = "Repository slug (e.g., \"my-repo\")")]
    pub repo_slug: String,
    #[schemars(description = "Pull request ID")]
    pub pr_id: u64,
    #[schemars(description = "ID of the comment to delete")]
    pub comment_id: u64,
    #[schemars(description = "Current version of the comment (for optimistic locking)")]
    pub version: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InboxParams {
    #[schemars(description = "Maximum number of PRs to return (default: 25)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MyPullRequestsParams {
    #[schemars(
        description = "AUTHOR (created by me), REVIEWER (need my review), PARTICIPANT (participating). Default: AUTHOR"
    )]
    pub role: Option<DashboardRole>,
    #[schemars(description = "PR state filter (default: OPEN)")]
    pub state: Option<StateFilter>,
    #[schemars(description = "Maximum number of PRs to return (default: 25)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

// --- Projections ---

#[derive(Serialize)]
struct ReviewerView<'a> {
    name: &'a str,
    username: &'a str,
    status: ReviewerStatus,
}

impl<'a> ReviewerView<'a> {
    fn of(p: &'a Participant) -> Self {
        Self {
            name: &p.user.display_name,
            username: &p.user.name,
            status: p.status,
        }
    }
}

fn reviewers_of(pr: &PullRequest) -> Vec<ReviewerView<'_>> {
    pr.reviewers.iter().map(ReviewerView::of).collect()
}

#[derive(Serialize)]
struct ReviewerStatusView<'a> {
    name: &'a str,
    status: ReviewerStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRow<'a> {
    id: u64,
    title: &'a str,
    state: PullRequestState,
    author: &'a str,
    from_branch: &'a str,
    to_branch: &'a str,
    created_date: String,
    reviewers: Vec<ReviewerStatusView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestList<'a> {
    pull_requests: Vec<PullRequestRow<'a>>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct AuthorView<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestDetail<'a> {
    id: u64,
    version: i64,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    state: PullRequestState,
    author: AuthorView<'a>,
    from_branch: &'a str,
    to_branch: &'a str,
    created_date: String,
    updated_date: String,
    reviewers: Vec<ReviewerView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

#[derive(Serialize)]
struct Created<'a> {
    success: bool,
    id: u64,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

#[derive(Serialize)]
struct CommentSummary<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

#[derive(Serialize)]
struct ActivityView<'a> {
    id: u64,
    action: &'a str,
    user: &'a str,
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<CommentSummary<'a>>,
}

#[derive(Serialize)]
struct ActivityList<'a> {
    activities: Vec<ActivityView<'a>>,
}

#[derive(Serialize)]
struct StateChange {
    success: bool,
    message: &'static str,
    state: PullRequestState,
}

#[derive(Serialize)]
struct Updated<'a> {
    success: bool,
    message: &'static str,
    id: u64,
    version: i64,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    reviewers: Vec<ReviewerView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewersAdded<'a> {
    success: bool,
    message: &'static str,
    reviewers: Vec<ReviewerView<'a>>,
    new_version: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentCreated {
    success: bool,
    comment_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentView<'a> {
    id: u64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_date: Option<String>,
    version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

#[derive(Serialize)]
struct CommentList<'a> {
    comments: Vec<CommentView<'a>>,
    pagination: Pagination,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentEdited {
    success: bool,
    comment_id: u64,
    new_version: i64,
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardRow<'a> {
    id: u64,
    title: &'a str,
    state: PullRequestState,
    author: &'a str,
    repository: String,
    from_branch: &'a str,
    to_branch: &'a str,
    created_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

impl<'a> DashboardRow<'a> {
    fn of(pr: &'a PullRequest) -> Self {
        let target = &pr.to_ref.repository;
        Self {
            id: pr.id,
            title: &pr.title,
            state: pr.state,
            author: &pr.author.user.display_name,
            repository: format!("{}/{}", target.project.key, target.slug),
            from_branch: &pr.from_ref.display_id,
            to_branch: &pr.to_ref.display_id,
            created_date: iso_timestamp(pr.created_date),
            link: pr.links.self_href(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<DashboardRole>,
    pull_requests: Vec<DashboardRow<'a>>,
    pagination: Pagination,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WhoAmI<'a> {
    name: &'a str,
    display_name: &'a str,
}

// --- Handlers ---

pub async fn list_pull_requests(
    backend: Arc<dyn Backend>,
    p: ListPullRequestsParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .list_pull_requests(
            &p.project_key,
            &p.repo_slug,
            p.state.unwrap_or_default(),
            p.direction.unwrap_or_default(),
            p.limit.unwrap_or(DEFAULT_LIMIT),
            0,
        )
        .await?;

    json_result(&PullRequestList {
        pull_requests: page
            .values
            .iter()
            .map(|pr| PullRequestRow {
                id: pr.id,
                title: &pr.title,
                state: pr.state,
                author: &pr.author.user.display_name,
                from_branch: &pr.from_ref.display_id,
                to_branch: &pr.to_ref.display_id,
                created_date: iso_timestamp(pr.created_date),
                reviewers: pr
                    .reviewers
                    .iter()
                    .map(|r| ReviewerStatusView {
                        name: &r.user.display_name,
                        status: r.status,
                    })
                    .collect(),
            })
            .collect(),
        pagination: Pagination::of(&page),
    })
}

pub async fn get_pull_request(
    backend: Arc<dyn Backend>,
    p: PullRequestParams,
) -> Result<CallToolResult, OperationError> {
    let pr = backend
        .get_pull_request(&p.project_key, &p.repo_slug, p.pr_id)
        .await?;

    json_result(&PullRequestDetail {
        id: pr.id,
        version: pr.version,
        title: &pr.title,
        description: pr.description.as_deref(),
        state: pr.state,
        author: AuthorView {
            name: &pr.author.user.display_name,
            username: &pr.author.user.name,
        },
        from_branch: &pr.from_ref.display_id,
        to_branch: &pr.to_ref.display_id,
        created_date: iso_timestamp(pr.created_date),
        updated_date: iso_timestamp(pr.updated_date),
        reviewers: reviewers_of(&pr),
        link: pr.links.self_href(),
    })
}

pub async fn create_pull_request(
    backend: Arc<dyn Backend>,
    p: CreatePullRequestParams,
) -> Result<CallToolResult, OperationError> {
    let request = NewPullRequest {
        title: p.title,
        description: p.description,
        from_ref: BranchRef::head(&p.from_branch),
        to_ref: BranchRef::head(&p.to_branch),
        reviewers: p
            .reviewers
            .map(|names| names.into_iter().map(ReviewerRef::named).collect()),
    };
    let pr = backend
        .create_pull_request(&p.project_key, &p.repo_slug, &request)
        .await?;

    json_result(&Created {
        success: true,
        id: pr.id,
        title: &pr.title,
        link: pr.links.self_href(),
    })
}

pub async fn get_pull_request_diff(
    backend: Arc<dyn Backend>,
    p: DiffParams,
) -> Result<CallToolResult, OperationError> {
    let diff = backend
        .pull_request_diff(&p.project_key, &p.repo_slug, p.pr_id, p.context_lines)
        .await?;
    text_result(diff)
}

pub async fn list_pull_request_activities(
    backend: Arc<dyn Backend>,
    p: ActivitiesParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .pull_request_activities(
            &p.project_key,
            &p.repo_slug,
            p.pr_id,
            p.limit.unwrap_or(DEFAULT_LIMIT),
            0,
        )
        .await?;

    json_result(&ActivityList {
        activities: page
            .values
            .iter()
            .map(|a| ActivityView {
                id: a.id,
                action: &a.action,
                user: &a.user.display_name,
                date: iso_timestamp(a.created_date),
                comment: a.comment.as_ref().map(|c| CommentSummary {
                    text: &c.text,
                    severity: c.severity.as_deref(),
                    state: c.state.as_deref(),
                }),
            })
            .collect(),
    })
}

pub async fn approve_pull_request(
    backend: Arc<dyn Backend>,
    p: PullRequestParams,
) -> Result<CallToolResult, OperationError> {
    backend.approve(&p.project_key, &p.repo_slug, p.pr_id).await?;
    json_result(&Ack::ok("Pull request approved"))
}

pub async fn unapprove_pull_request(
    backend: Arc<dyn Backend>,
    p: PullRequestParams,
) -> Result<CallToolResult, OperationError> {
    backend
        .unapprove(&p.project_key, &p.repo_slug, p.pr_id)
        .await?;
    json_result(&Ack::ok("Approval removed"))
}

pub async fn needs_work_pull_request(
    backend: Arc<dyn Backend>,
    p: ParticipantParams,
) -> Result<CallToolResult, OperationError> {
    backend
        .set_reviewer_status(
            &p.project_key,
            &p.repo_slug,
            p.pr_id,
            &p.username,
            ReviewerStatus::NeedsWork,
        )
        .await?;
    json_result(&Ack::ok("Pull request marked as needs work"))
}

pub async fn merge_pull_request(
    backend: Arc<dyn Backend>,
    p: VersionedParams,
) -> Result<CallToolResult, OperationError> {
    let pr = backend
        .merge(&p.project_key, &p.repo_slug, p.pr_id, p.version)
        .await?;
    json_result(&StateChange {
        success: true,
        message: "Pull request merged",
        state: pr.state,
    })
}

pub async fn decline_pull_request(
    backend: Arc<dyn Backend>,
    p: VersionedParams,
) -> Result<CallToolResult, OperationError> {
    let pr = backend
        .decline(&p.project_key, &p.repo_slug, p.pr_id, p.version)
        .await?;
    json_result(&StateChange {
        success: true,
        message: "Pull request declined",
        state: pr.state,
    })
}

/// The update endpoint replaces the whole pull request, so fields the caller
/// left out are carried over from a fresh read.
pub async fn update_pull_request(
    backend: Arc<dyn Backend>,
    p: UpdatePullRequestParams,
) -> Result<CallToolResult, OperationError> {
    let current = backend
        .get_pull_request(&p.project_key, &p.repo_slug, p.pr_id)
        .await?;

    let update = PullRequestUpdate {
        version: p.version,
        title: p.title.unwrap_or(current.title),
        description: p.description.or(current.description),
        reviewers: p
            .reviewers
            .map(|names| names.into_iter().map(ReviewerRef::named).collect()),
    };
    let pr = backend
        .update_pull_request(&p.project_key, &p.repo_slug, p.pr_id, &update)
        .await?;

    json_result(&Updated {
        success: true,
        message: "Pull request updated",
        id: pr.id,
        version: pr.version,
        title: &pr.title,
        description: pr.description.as_deref(),
        reviewers: reviewers_of(&pr),
    })
}

/// Existing reviewers first, then requested names not already present.
fn merge_reviewers(current: &[Participant], requested: Vec<String>) -> Vec<ReviewerRef> {
    let mut names: Vec<String> = current.iter().map(|r| r.user.name.clone()).collect();
    for name in requested {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.into_iter().map(ReviewerRef::named).collect()
}

pub async fn add_pull_request_reviewers(
    backend: Arc<dyn Backend>,
    p: AddReviewersParams,
) -> Result<CallToolResult, OperationError> {
    let current = backend
        .get_pull_request(&p.project_key, &p.repo_slug, p.pr_id)
        .await?;

    let update = PullRequestUpdate {
        version: p.version,
        reviewers: Some(merge_reviewers(&current.reviewers, p.reviewers)),
        title: current.title,
        description: current.description,
    };
    let pr = backend
        .update_pull_request(&p.project_key, &p.repo_slug, p.pr_id, &update)
        .await?;

    json_result(&ReviewersAdded {
        success: true,
        message: "Reviewers added",
        reviewers: reviewers_of(&pr),
        new_version: pr.version,
    })
}

pub async fn remove_pull_request_reviewer(
    backend: Arc<dyn Backend>,
    p: ParticipantParams,
) -> Result<CallToolResult, OperationError> {
    backend
        .remove_participant(&p.project_key, &p.repo_slug, p.pr_id, &p.username)
        .await?;
    json_result(&Ack::ok(format!(
        "Reviewer '{}' removed from pull request",
        p.username
    )))
}

pub async fn add_pull_request_comment(
    backend: Arc<dyn Backend>,
    p: AddCommentParams,
) -> Result<CallToolResult, OperationError> {
    let comment = backend
        .add_comment(
            &p.project_key,
            &p.repo_slug,
            p.pr_id,
            &NewComment::general(p.text),
        )
        .await?;
    json_result(&CommentCreated {
        success: true,
        comment_id: comment.id,
        message: None,
    })
}

fn non_empty(hash: Option<String>) -> Option<String> {
    hash.filter(|h| !h.is_empty())
}

pub async fn add_pull_request_line_comment(
    backend: Arc<dyn Backend>,
    p: AddLineCommentParams,
) -> Result<CallToolResult, OperationError> {
    let mut from_hash = non_empty(p.from_hash);
    let mut to_hash = non_empty(p.to_hash);

    if from_hash.is_none() || to_hash.is_none() {
        match backend
            .get_pull_request(&p.project_key, &p.repo_slug, p.pr_id)
            .await
        {
            Ok(pr) => {
                from_hash = from_hash.or(pr.from_ref.latest_commit);
                to_hash = to_hash.or(pr.to_ref.latest_commit);
            }
            Err(err) => {
                warn!(
                    pr_id = p.pr_id,
                    error = %err,
                    "could not fetch commit hashes; anchoring to the effective diff"
                );
            }
        }
    }

    let anchor = CommentAnchor::for_line(
        p.file_path.clone(),
        p.line,
        p.line_type.unwrap_or_default(),
        p.file_type.unwrap_or_default(),
        from_hash,
        to_hash,
    );
    let message = format!(
        "Comment added to {}:{} (lineType: {}, fileType: {})",
        p.file_path,
        p.line,
        anchor.line_type.as_str(),
        anchor.file_type.as_str()
    );

    let comment = backend
        .add_comment(
            &p.project_key,
            &p.repo_slug,
            p.pr_id,
            &NewComment::on_line(p.text, anchor),
        )
        .await?;

    json_result(&CommentCreated {
        success: true,
        comment_id: comment.id,
        message: Some(message),
    })
}

pub async fn reply_to_pull_request_comment(
    backend: Arc<dyn Backend>,
    p: ReplyParams,
) -> Result<CallToolResult, OperationError> {
    let comment = backend
        .add_comment(
            &p.project_key,
            &p.repo_slug,
            p.pr_id,
            &NewComment::reply(p.text, p.parent_comment_id),
        )
        .await?;
    json_result(&CommentCreated {
        success: true,
        comment_id: comment.id,
        message: Some("Reply added successfully".to_string()),
    })
}

pub async fn get_pull_request_comments(
    backend: Arc<dyn Backend>,
    p: GetCommentsParams,
) -> Result<CallToolResult, OperationError> {
    let query = CommentQuery {
        path: p.path,
        limit: p.limit.unwrap_or(COMMENT_LIMIT),
        start: 0,
        anchor_state: p.anchor_state.unwrap_or_default(),
    };
    let page = backend
        .comments(&p.project_key, &p.repo_slug, p.pr_id, &query)
        .await?;

    json_result(&CommentList {
        comments: page
            .values
            .iter()
            .map(|c| CommentView {
                id: c.id,
                text: &c.text,
                author: c.author.as_ref().map(|u| u.display_name.as_str()),
                created_date: c.created_date.map(iso_timestamp),
                updated_date: c.updated_date.map(iso_timestamp),
                version: c.version,
                severity: c.severity.as_deref(),
                state: c.state.as_deref(),
            })
            .collect(),
        pagination: Pagination::of(&page),
    })
}

pub async fn update_pull_request_comment(
    backend: Arc<dyn Backend>,
    p: UpdateCommentParams,
) -> Result<CallToolResult, OperationError> {
    let update = CommentUpdate {
        text: p.text,
        version: p.version,
    };
    let comment = backend
        .update_comment(&p.project_key, &p.repo_slug, p.pr_id, p.comment_id, &update)
        .await?;
    json_result(&CommentEdited {
        success: true,
        comment_id: comment.id,
        new_version: comment.version,
        message: "Comment updated successfully",
    })
}

pub async fn delete_pull_request_comment(
    backend: Arc<dyn Backend>,
    p: DeleteCommentParams,
) -> Result<CallToolResult, OperationError> {
    backend
        .delete_comment(&p.project_key, &p.repo_slug, p.pr_id, p.comment_id, p.version)
        .await?;
    json_result(&Ack::ok("Comment deleted successfully"))
}

pub async fn list_my_pull_requests_to_review(
    backend: Arc<dyn Backend>,
    p: InboxParams,
) -> Result<CallToolResult, OperationError> {
    let page = backend
        .inbox_pull_requests(p.limit.unwrap_or(DEFAULT_LIMIT), 0)
        .await?;
    json_result(&Dashboard {
        role: None,
        pull_requests: page.values.iter().map(DashboardRow::of).collect(),
        pagination: Pagination::of(&page),
    })
}

pub async fn list_my_pull_requests(
    backend: Arc<dyn Backend>,
    p: MyPullRequestsParams,
) -> Result<CallToolResult, OperationError> {
    let role = p.role.unwrap_or_default();
    let page = backend
        .dashboard_pull_requests(
            role,
            Some(p.state.unwrap_or_default()),
            p.limit.unwrap_or(DEFAULT_LIMIT),
            0,
        )
        .await?;
    json_result(&Dashboard {
        role: Some(role),
        pull_requests: page.values.iter().map(DashboardRow::of).collect(),
        pagination: Pagination::of(&page),
    })
}

pub async fn get_current_user(
    backend: Arc<dyn Backend>,
    _: NoParams,
) -> Result<CallToolResult, OperationError> {
    let user = backend.current_user().await;
    json_result(&WhoAmI {
        name: &user.name,
        display_name: &user.display_name,
    })
}

pub fn operations(backend: Arc<dyn Backend>) -> Vec<Operation> {
    vec![
        bind(
            &backend,
            "list_pull_requests",
            "List pull requests in a repository",
            list_pull_requests,
        ),
        bind(
            &backend,
            "get_pull_request",
            "Get details of a specific pull request",
            get_pull_request,
        ),
        bind(
            &backend,
            "create_pull_request",
            "Create a new pull request",
            create_pull_request,
        ),
        bind(
            &backend,
            "get_pull_request_diff",
            "Get the diff of a pull request",
            get_pull_request_diff,
        ),
        bind(
            &backend,
            "list_pull_request_activities",
            "List activities (comments, approvals, etc.) on a pull request",
            list_pull_request_activities,
        ),
        bind(
            &backend,
            "approve_pull_request",
            "Approve a pull request",
            approve_pull_request,
        ),
        bind(
            &backend,
            "unapprove_pull_request",
            "Remove approval from a pull request",
            unapprove_pull_request,
        ),
        bind(
            &backend,
            "needs_work_pull_request",
            "Mark a pull request as needs work",
            needs_work_pull_request,
        ),
        bind(
            &backend,
            "merge_pull_request",
            "Merge a pull request",
            merge_pull_request,
        ),
        bind(
            &backend,
            "decline_pull_request",
            "Decline a pull request",
            decline_pull_request,
        ),
        bind(
            &backend,
            "update_pull_request",
            "Update a pull request (title, description, reviewers)",
            update_pull_request,
        ),
        bind(
            &backend,
            "add_pull_request_reviewers",
            "Add reviewers to a pull request (existing reviewers will be kept)",
            add_pull_request_reviewers,
        ),
        bind(
            &backend,
            "remove_pull_request_reviewer",
            "Remove a reviewer from a pull request",
            remove_pull_request_reviewer,
        ),
        bind(
            &backend,
            "add_pull_request_comment",
            "Add a general comment to a pull request",
            add_pull_request_comment,
        ),
        bind(
            &backend,
            "add_pull_request_line_comment",
            "Add a comment to a specific line of code in a pull request",
            add_pull_request_line_comment,
        ),
        bind(
            &backend,
            "reply_to_pull_request_comment",
            "Reply to an existing comment on a pull request",
            reply_to_pull_request_comment,
        ),
        bind(
            &backend,
            "get_pull_request_comments",
            "Get comments on a pull request",
            get_pull_request_comments,
        ),
        bind(
            &backend,
            "update_pull_request_comment",
            "Update an existing comment on a pull request",
            update_pull_request_comment,
        ),
        bind(
            &backend,
            "delete_pull_request_comment",
            "Delete a comment from a pull request",
            delete_pull_request_comment,
        ),
        bind(
            &backend,
            "list_my_pull_requests_to_review",
            "List pull requests assigned to me for review",
            list_my_pull_requests_to_review,
        ),
        bind(
            &backend,
            "list_my_pull_requests",
            "List pull requests related to me (created by me, need my review, or participating)",
            list_my_pull_requests,
        ),
        bind(
            &backend,
            "get_current_user",
            "Get the user the configured token authenticates as",
            get_current_user,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::model::{DiffType, Paged, PullRequestRef, User};
    use crate::error::BitbucketError;
    use crate::mcp::testing::{FakeBackend, result_json};
    use serde_json::json;

    fn participant(name: &str) -> Participant {
        Participant {
            user: User {
                name: name.into(),
                display_name: name.to_uppercase(),
                ..User::default()
            },
            ..Participant::default()
        }
    }

    fn existing_pr() -> PullRequest {
        PullRequest {
            id: 7,
            version: 4,
            title: "A".into(),
            description: Some("B".into()),
            reviewers: vec![participant("alice"), participant("bob")],
            from_ref: PullRequestRef {
                display_id: "feature".into(),
                latest_commit: Some("f00".into()),
                ..PullRequestRef::default()
            },
            to_ref: PullRequestRef {
                display_id: "main".into(),
                latest_commit: Some("ba7".into()),
                ..PullRequestRef::default()
            },
            ..PullRequest::default()
        }
    }

    fn line_params(line_type: Option<LineType>, file_type: Option<FileType>) -> AddLineCommentParams {
        AddLineCommentParams {
            project_key: "P".into(),
            repo_slug: "r".into(),
            pr_id: 7,
            text: "nit".into(),
            file_path: "src/lib.rs".into(),
            line: 12,
            line_type,
            file_type,
            from_hash: None,
            to_hash: None,
        }
    }

    #[tokio::test]
    async fn update_keeps_unspecified_fields_and_omits_reviewers() {
        let fake = Arc::new(FakeBackend {
            pull_request: Some(existing_pr()),
            ..FakeBackend::default()
        });

        update_pull_request(
            fake.clone(),
            UpdatePullRequestParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                pr_id: 7,
                version: 4,
                title: None,
                description: None,
                reviewers: None,
            },
        )
        .await
        .unwrap();

        let sent = fake.updates();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            json!({ "version": 4, "title": "A", "description": "B" })
        );
    }

    #[tokio::test]
    async fn update_replaces_only_given_fields() {
        let fake = Arc::new(FakeBackend {
            pull_request: Some(existing_pr()),
            ..FakeBackend::default()
        });

        update_pull_request(
            fake.clone(),
            UpdatePullRequestParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                pr_id: 7,
                version: 4,
                title: Some("New".into()),
                description: None,
                reviewers: Some(vec!["carol".into()]),
            },
        )
        .await
        .unwrap();

        let updates = fake.updates();
        let sent = &updates[0];
        assert_eq!(sent.title, "New");
        assert_eq!(sent.description.as_deref(), Some("B"));
        assert_eq!(sent.reviewers, Some(vec![ReviewerRef::named("carol")]));
    }

    #[tokio::test]
    async fn add_reviewers_is_an_ordered_union() {
        let fake = Arc::new(FakeBackend {
            pull_request: Some(existing_pr()),
            ..FakeBackend::default()
        });

        add_pull_request_reviewers(
            fake.clone(),
            AddReviewersParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                pr_id: 7,
                version: 4,
                reviewers: vec!["bob".into(), "carol".into()],
            },
        )
        .await
        .unwrap();

        let updates = fake.updates();
        let sent = &updates[0];
        let names: Vec<_> = sent
            .reviewers
            .as_ref()
            .unwrap()
            .iter()
            .map(|r| r.user.name.as_str())
            .collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert_eq!(sent.title, "A");
        assert_eq!(sent.description.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn added_line_comment_forces_destination_and_pins_commits() {
        let fake = Arc::new(FakeBackend {
            pull_request: Some(existing_pr()),
            ..FakeBackend::default()
        });

        let result = add_pull_request_line_comment(
            fake.clone(),
            line_params(Some(LineType::Added), Some(FileType::From)),
        )
        .await
        .unwrap();

        let anchor = fake.added_comments()[0].anchor.clone().unwrap();
        assert_eq!(anchor.file_type, FileType::To);
        assert_eq!(anchor.diff_type, DiffType::Commit);
        assert_eq!(anchor.from_hash.as_deref(), Some("f00"));
        assert_eq!(anchor.to_hash.as_deref(), Some("ba7"));
        assert_eq!(
            result_json(&result)["message"],
            "Comment added to src/lib.rs:12 (lineType: ADDED, fileType: TO)"
        );
    }

    #[tokio::test]
    async fn line_comment_falls_back_to_effective_diff_when_lookup_fails() {
        let fake = Arc::new(FakeBackend {
            pull_request_error: Some(BitbucketError::api("forbidden", Some(403))),
            ..FakeBackend::default()
        });

        add_pull_request_line_comment(fake.clone(), line_params(Some(LineType::Removed), None))
            .await
            .unwrap();

        let anchor = fake.added_comments()[0].anchor.clone().unwrap();
        assert_eq!(anchor.file_type, FileType::From);
        assert_eq!(anchor.diff_type, DiffType::Effective);
        assert!(anchor.from_hash.is_none());
    }

    #[tokio::test]
    async fn get_pull_request_projects_timestamps() {
        let mut pr = existing_pr();
        pr.created_date = 1_704_067_200_000;
        let fake = Arc::new(FakeBackend {
            pull_request: Some(pr),
            ..FakeBackend::default()
        });

        let result = get_pull_request(
            fake,
            PullRequestParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                pr_id: 7,
            },
        )
        .await
        .unwrap();

        let value = result_json(&result);
        assert_eq!(value["createdDate"], "2024-01-01T00:00:00.000Z");
        assert_eq!(value["fromBranch"], "feature");
        assert_eq!(
            value["reviewers"][0],
            json!({ "name": "ALICE", "username": "alice", "status": "UNAPPROVED" })
        );
    }

    #[tokio::test]
    async fn list_pull_requests_defaults_to_open_incoming() {
        let fake = Arc::new(FakeBackend {
            pull_requests: Some(Paged::default()),
            ..FakeBackend::default()
        });

        list_pull_requests(
            fake.clone(),
            ListPullRequestsParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                state: None,
                direction: None,
                limit: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            fake.calls(),
            ["list_pull_requests P/r state=OPEN direction=INCOMING limit=25"]
        );
    }

    #[tokio::test]
    async fn comments_default_to_all_anchors_and_wide_page() {
        let fake = Arc::new(FakeBackend {
            comments: Some(Paged::default()),
            ..FakeBackend::default()
        });

        get_pull_request_comments(
            fake.clone(),
            GetCommentsParams {
                project_key: "P".into(),
                repo_slug: "r".into(),
                pr_id: 1,
                path: None,
                anchor_state: None,
                limit: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(fake.calls(), ["comments P/r#1 limit=100 anchor=ALL"]);
    }

    #[tokio::test]
    async fn my_pull_requests_default_to_open_authored() {
        let fake = Arc::new(FakeBackend {
            dashboard: Some(Paged::default()),
            ..FakeBackend::default()
        });

        let result = list_my_pull_requests(
            fake.clone(),
            MyPullRequestsParams {
                role: None,
                state: None,
                limit: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            fake.calls(),
            ["dashboard_pull_requests role=AUTHOR state=OPEN limit=25"]
        );
        assert_eq!(result_json(&result)["role"], "AUTHOR");
    }

    #[tokio::test]
    async fn current_user_never_fails() {
        let fake = Arc::new(FakeBackend::default());
        let result = get_current_user(fake, NoParams {}).await.unwrap();
        assert_eq!(
            result_json(&result),
            json!({ "name": "unknown", "displayName": "Unknown" })
        );
    }
}
