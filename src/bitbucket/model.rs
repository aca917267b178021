//! Wire shapes for the Bitbucket Server REST API.
//!
//! Response types are deliberately lenient (`#[serde(default)]` everywhere) since
//! different server versions omit different fields. Request payloads only carry
//! what the endpoint needs, so optional fields are skipped rather than sent as null.

use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Responses ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paged<T> {
    pub size: u64,
    pub limit: u64,
    pub is_last_page: bool,
    pub values: Vec<T>,
    pub start: u64,
    pub next_page_start: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Link {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_: Vec<Link>,
    pub clone: Vec<Link>,
}

impl Links {
    pub fn self_href(&self) -> Option<&str> {
        self.self_.first().map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub name: String,
    pub display_name: String,
    pub email_address: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    pub key: String,
    pub id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub public: bool,
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub slug: String,
    pub id: Option<u64>,
    pub name: String,
    pub description: Option<String>,
    pub forkable: bool,
    pub public: bool,
    pub project: Project,
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Branch {
    pub id: String,
    pub display_id: String,
    pub latest_commit: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    #[default]
    Open,
    Merged,
    Declined,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerStatus {
    #[default]
    Unapproved,
    NeedsWork,
    Approved,
}

impl ReviewerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unapproved => "UNAPPROVED",
            Self::NeedsWork => "NEEDS_WORK",
            Self::Approved => "APPROVED",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub user: User,
    pub role: Option<String>,
    pub approved: bool,
    pub status: ReviewerStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullRequestRef {
    pub id: String,
    pub display_id: String,
    pub latest_commit: Option<String>,
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullRequest {
    pub id: u64,
    pub version: i64,
    pub title: String,
    pub description: Option<String>,
    pub state: PullRequestState,
    pub created_date: i64,
    pub updated_date: i64,
    pub from_ref: PullRequestRef,
    pub to_ref: PullRequestRef,
    pub author: Participant,
    pub reviewers: Vec<Participant>,
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: u64,
    pub version: i64,
    pub text: String,
    pub author: Option<User>,
    pub created_date: Option<i64>,
    pub updated_date: Option<i64>,
    pub severity: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    pub id: u64,
    pub created_date: i64,
    pub user: User,
    pub action: String,
    pub comment: Option<Comment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathInfo {
    pub components: Vec<String>,
    pub name: String,
    #[serde(rename = "toString")]
    pub display: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowseEntry {
    pub path: PathInfo,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowseResult {
    pub path: PathInfo,
    pub revision: Option<String>,
    pub children: Paged<BrowseEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchLine {
    pub text: String,
    pub line: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchContextLine {
    pub line: SearchLine,
    pub highlight: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HitContext {
    pub context: Vec<SearchContextLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchFile {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeHit {
    pub file: SearchFile,
    pub hit_contexts: Vec<HitContext>,
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeResults {
    pub count: u64,
    pub values: Vec<CodeHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub code: Option<CodeResults>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub name: String,
    pub display_name: String,
}

impl CurrentUser {
    /// Stand-in returned when the whoami endpoint cannot be reached.
    pub fn unknown() -> Self {
        Self {
            name: "unknown".to_string(),
            display_name: "Unknown".to_string(),
        }
    }
}

// --- Query filters ---

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateFilter {
    #[default]
    Open,
    Merged,
    Declined,
    All,
}

impl StateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
            Self::Declined => "DECLINED",
            Self::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "INCOMING",
            Self::Outgoing => "OUTGOING",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnchorState {
    Active,
    Orphaned,
    #[default]
    All,
}

impl AnchorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Orphaned => "ORPHANED",
            Self::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardRole {
    #[default]
    Author,
    Reviewer,
    Participant,
}

impl DashboardRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Author => "AUTHOR",
            Self::Reviewer => "REVIEWER",
            Self::Participant => "PARTICIPANT",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub path: Option<String>,
    pub limit: u32,
    pub start: u32,
    pub anchor_state: AnchorState,
}

impl CommentQuery {
    pub fn all() -> Self {
        Self {
            path: None,
            limit: 100,
            start: 0,
            anchor_state: AnchorState::All,
        }
    }
}

// --- Request payloads ---

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReviewerRef {
    pub user: UserRef,
}

impl ReviewerRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            user: UserRef { name: name.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BranchRef {
    pub id: String,
}

impl BranchRef {
    pub fn head(branch: &str) -> Self {
        Self {
            id: format!("refs/heads/{branch}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPullRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub from_ref: BranchRef,
    pub to_ref: BranchRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewers: Option<Vec<ReviewerRef>>,
}

/// Full-replace body for `PUT .../pull-requests/{id}`.
///
/// The endpoint resets anything that is missing, so callers must carry over
/// title and description from a fresh read. `reviewers` is omitted entirely
/// when the caller did not ask to change them.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestUpdate {
    pub version: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewers: Option<Vec<ReviewerRef>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParticipantStatus {
    pub user: UserRef,
    pub approved: bool,
    pub status: ReviewerStatus,
}

impl ParticipantStatus {
    pub fn new(username: &str, status: ReviewerStatus) -> Self {
        Self {
            user: UserRef {
                name: username.to_string(),
            },
            approved: status == ReviewerStatus::Approved,
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineType {
    Added,
    Removed,
    #[default]
    Context,
}

impl LineType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::Context => "CONTEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    From,
    #[default]
    To,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::To => "TO",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffType {
    Effective,
    Commit,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentAnchor {
    pub path: String,
    pub line: u64,
    pub line_type: LineType,
    pub file_type: FileType,
    pub diff_type: DiffType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_hash: Option<String>,
}

impl CommentAnchor {
    /// Build the anchor for a single diff line.
    ///
    /// Added lines only exist in the destination file and removed lines only in
    /// the source file, so `requested_file_type` is honoured for context lines
    /// only. With both hashes the anchor is pinned to those commits; otherwise it
    /// follows the pull request's effective diff.
    pub fn for_line(
        path: impl Into<String>,
        line: u64,
        line_type: LineType,
        requested_file_type: FileType,
        from_hash: Option<String>,
        to_hash: Option<String>,
    ) -> Self {
        let file_type = match line_type {
            LineType::Added => FileType::To,
            LineType::Removed => FileType::From,
            LineType::Context => requested_file_type,
        };

        let (diff_type, from_hash, to_hash) = match (from_hash, to_hash) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                (DiffType::Commit, Some(from), Some(to))
            }
            _ => (DiffType::Effective, None, None),
        };

        Self {
            path: path.into(),
            line,
            line_type,
            file_type,
            diff_type,
            from_hash,
            to_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParentRef {
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<CommentAnchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl NewComment {
    pub fn general(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: None,
            parent: None,
        }
    }

    pub fn on_line(text: impl Into<String>, anchor: CommentAnchor) -> Self {
        Self {
            text: text.into(),
            anchor: Some(anchor),
            parent: None,
        }
    }

    pub fn reply(text: impl Into<String>, parent_id: u64) -> Self {
        Self {
            text: text.into(),
            anchor: None,
            parent: Some(ParentRef { id: parent_id }),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommentUpdate {
    pub text: String,
    pub version: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchEntities {
    pub code: CodeScope,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub entities: SearchEntities,
}

impl SearchRequest {
    /// A repository slug only narrows the search when a project is also given.
    pub fn new(query: &str, project_key: Option<&str>, repo_slug: Option<&str>) -> Self {
        let scope = CodeScope {
            project_key: project_key.map(str::to_string),
            repository_slug: project_key.and(repo_slug).map(str::to_string),
        };
        Self {
            query: query.to_string(),
            entities: SearchEntities { code: scope },
        }
    }
}
