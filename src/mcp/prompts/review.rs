use std::fmt::Write as _;
use std::sync::Arc;

use rmcp::model::{GetPromptResult, JsonObject, PromptMessage, PromptMessageRole};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::bitbucket::Backend;
use crate::bitbucket::model::{Comment, CommentQuery, DashboardRole, PullRequest, StateFilter};
use crate::error::OperationError;
use crate::mcp::format::display_timestamp;
use crate::mcp::registry::{PromptArgumentSpec, PromptDescriptor};

const REVIEW_CONTEXT_LINES: u32 = 10;
const QUEUE_LIMIT: u32 = 50;

pub const NOTHING_TO_REVIEW: &str = "There are no pull requests waiting for your review.";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewArgs {
    #[serde(default, deserialize_with = "non_empty")]
    pub project_key: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub repo_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub pr_id: Option<u64>,
}

fn non_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
}

/// Prompt arguments travel as strings, but clients also send bare numbers.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("prId must be a number, got {s:?}"))),
    }
}

fn user_message(text: String) -> GetPromptResult {
    GetPromptResult {
        description: None,
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    }
}

pub async fn review_my_prs(
    backend: Arc<dyn Backend>,
    args: ReviewArgs,
) -> Result<GetPromptResult, OperationError> {
    if let ReviewArgs {
        project_key: Some(project),
        repo_slug: Some(repo),
        pr_id: Some(id),
    } = args
    {
        let pr = backend.get_pull_request(&project, &repo, id).await?;
        let diff = backend
            .pull_request_diff(&project, &repo, id, Some(REVIEW_CONTEXT_LINES))
            .await?;
        let comments = backend
            .comments(&project, &repo, id, &CommentQuery::all())
            .await?;
        return Ok(user_message(review_brief(
            &pr,
            &diff,
            &comments.values,
            &project,
            &repo,
        )));
    }

    let queue = backend
        .dashboard_pull_requests(
            DashboardRole::Reviewer,
            Some(StateFilter::Open),
            QUEUE_LIMIT,
            0,
        )
        .await?;

    if queue.values.is_empty() {
        return Ok(user_message(NOTHING_TO_REVIEW.to_string()));
    }
    Ok(user_message(review_queue(&queue.values)))
}

fn review_queue(prs: &[PullRequest]) -> String {
    let entries: Vec<String> = prs
        .iter()
        .enumerate()
        .map(|(i, pr)| {
            let repo = &pr.to_ref.repository;
            format!(
                "{}. [{}/{}] PR #{}: {}\n   Author: {}\n   Branch: {} → {}\n   Created: {}\n   Link: {}",
                i + 1,
                repo.project.key,
                repo.slug,
                pr.id,
                pr.title,
                pr.author.user.display_name,
                pr.from_ref.display_id,
                pr.to_ref.display_id,
                display_timestamp(pr.created_date),
                pr.links.self_href().unwrap_or("N/A"),
            )
        })
        .collect();

    format!(
        "## Pull requests waiting for your review\n\n\
         {}\n\n\
         ---\n\n\
         Pick one pull request to review. These tools are available:\n\n\
         1. **get_pull_request_diff** - fetch the code changes\n\
         2. **get_pull_request_comments** - fetch existing comments\n\
         3. **add_pull_request_comment** - add a general comment\n\
         4. **add_pull_request_line_comment** - comment on a specific line\n\
         5. **approve_pull_request** - approve the pull request\n\n\
         Tell me which pull request to review (list number or PR ID).",
        entries.join("\n\n")
    )
}

fn review_brief(
    pr: &PullRequest,
    diff: &str,
    comments: &[Comment],
    project: &str,
    repo: &str,
) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "## Pull request review\n");
    let _ = writeln!(out, "### Details");
    let _ = writeln!(out, "- **Project/Repository**: {project}/{repo}");
    let _ = writeln!(out, "- **PR ID**: {}", pr.id);
    let _ = writeln!(out, "- **Title**: {}", pr.title);
    let _ = writeln!(
        out,
        "- **Description**: {}",
        pr.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description")
    );
    let _ = writeln!(out, "- **Author**: {}", pr.author.user.display_name);
    let _ = writeln!(
        out,
        "- **Branch**: {} → {}",
        pr.from_ref.display_id, pr.to_ref.display_id
    );
    let _ = writeln!(out, "- **Created**: {}", display_timestamp(pr.created_date));
    let _ = writeln!(out, "- **Version**: {} (needed to approve)\n", pr.version);

    let _ = writeln!(out, "### Existing comments ({})", comments.len());
    if comments.is_empty() {
        let _ = writeln!(out, "No comments yet.");
    } else {
        for c in comments {
            let author = c
                .author
                .as_ref()
                .map(|u| u.display_name.as_str())
                .unwrap_or("Unknown");
            let _ = writeln!(out, "- {author}: {}", c.text);
        }
    }

    let _ = writeln!(out, "\n### Changes (diff)\n```diff\n{diff}\n```\n");
    out.push_str(CHECKLIST);

    let _ = write!(
        out,
        "## Next steps\n\n\
         When the review is done:\n\n\
         **If you found problems:**\n\
         Use `add_pull_request_line_comment` to comment on the specific lines:\n\
         - projectKey: \"{project}\"\n\
         - repoSlug: \"{repo}\"\n\
         - prId: {id}\n\
         - text: your comment\n\
         - filePath: path of the file\n\
         - line: line number\n\
         - lineType: \"ADDED\" (new line) / \"REMOVED\" (deleted line) / \"CONTEXT\" (unchanged line)\n\n\
         **If everything looks good:**\n\
         Use `approve_pull_request` to approve it:\n\
         - projectKey: \"{project}\"\n\
         - repoSlug: \"{repo}\"\n\
         - prId: {id}\n\
         - version: {version}\n\n\
         Start the review and give your professional assessment.",
        id = pr.id,
        version = pr.version,
    );
    out
}

const CHECKLIST: &str = "---\n\n\
## What to look for\n\n\
Review this pull request as a senior engineer, focusing on:\n\n\
### 1. Code quality\n\
- Is the code clear and readable?\n\
- Are names consistent and meaningful?\n\
- Is there duplicated code?\n\
- Are functions too long or too complex?\n\n\
### 2. Correctness and potential bugs\n\
- Boundary conditions\n\
- Null and empty value handling\n\
- Type safety\n\
- Concurrency and thread safety\n\n\
### 3. Security\n\
- Injection risks (SQL, XSS)\n\
- Leaked secrets or sensitive data\n\
- Missing permission checks\n\n\
### 4. Performance\n\
- Unnecessary loops or computation\n\
- N+1 queries\n\
- Memory leaks\n\
- Large data volumes\n\n\
### 5. Best practices\n\
- Error handling\n\
- Logging\n\
- Project conventions\n\
- Test coverage\n\n\
---\n\n";

pub fn prompts(backend: Arc<dyn Backend>) -> Vec<PromptDescriptor> {
    vec![PromptDescriptor::new(
        "review_my_prs",
        "List pull requests waiting for my review, review one as a senior engineer, \
         comment on problems or approve it when there are none",
        vec![
            PromptArgumentSpec {
                name: "projectKey",
                description: "Project key (optional; omit to list every pull request awaiting review)",
                required: false,
            },
            PromptArgumentSpec {
                name: "repoSlug",
                description: "Repository slug (optional)",
                required: false,
            },
            PromptArgumentSpec {
                name: "prId",
                description: "Pull request ID (optional; review only this pull request)",
                required: false,
            },
        ],
        move |args: JsonObject| {
            let backend = backend.clone();
            async move {
                let args: ReviewArgs = serde_json::from_value(serde_json::Value::Object(args))
                    .map_err(OperationError::InvalidArguments)?;
                review_my_prs(backend, args).await
            }
        },
    )]
}
