//! Pull request reconciliation: find the open PR for a branch or open one.

use super::changelog::{pr_body, pr_title};
use super::error::BoarddError;
use super::state::WorkflowState;
use crate::github::{ForgeError, PrHandle, PullRequestApi};

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub pull_request: PrHandle,
    /// `false` when an already-open pull request was reused.
    pub created: bool,
}

/// Create-or-find a pull request from `branch` into `base`.
///
/// An open pull request for the branch is returned unchanged; its title and
/// body are not rewritten.
pub async fn reconcile(
    pulls: &dyn PullRequestApi,
    branch: &str,
    base: &str,
    title: &str,
    body: &str,
    draft: bool,
) -> Result<Reconciled, ForgeError> {
    if let Some(existing) = pulls.find_open_pr(branch, base).await? {
        tracing::info!(branch, number = ?existing.number, "Reusing open pull request");
        return Ok(Reconciled {
            pull_request: existing,
            created: false,
        });
    }

    let created = pulls
        .create_pr(&PrHandle::new(branch, base, title, body, draft))
        .await?;
    tracing::info!(branch, number = ?created.number, "Opened pull request");
    Ok(Reconciled {
        pull_request: created,
        created: true,
    })
}

/// Final stage: make sure the working branch has an open pull request.
pub async fn open_pull_request(
    pulls: &dyn PullRequestApi,
    state: WorkflowState,
    draft: bool,
) -> Result<WorkflowState, BoarddError> {
    if state.profile_commit.is_none() {
        return Err(BoarddError::OutOfOrder(
            "pull request requires the profile commit",
        ));
    }

    let title = pr_title(state.display_name());
    let body = pr_body(&state.request);
    let reconciled = reconcile(pulls, &state.branch, &state.base, &title, &body, draft).await?;

    Ok(WorkflowState {
        pull_request: Some(reconciled.pull_request),
        pull_request_created: reconciled.created,
        ..state
    })
}
