//! Workflow state threaded by value through the update stages.

use super::asset::AssetOp;
use super::identity::branch_name;
use crate::github::{CommitRef, PrHandle};
use crate::models::{Record, UpdateRequest};

/// Everything one invocation has learned so far.
///
/// Stages take the state by value and return the next one; nothing is
/// mutated behind a shared reference.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub request: UpdateRequest,
    /// Normalized identity of the record being updated.
    pub target: String,
    /// Per-target working branch.
    pub branch: String,
    /// Branch the pull request merges into.
    pub base: String,
    /// Merged record, once the profile commit is built.
    pub record: Option<Record>,
    pub asset_op: AssetOp,
    pub branch_created: bool,
    pub profile_commit: Option<CommitRef>,
    pub picture_commit: Option<CommitRef>,
    pub pull_request: Option<PrHandle>,
    /// Whether this invocation opened `pull_request`.
    pub pull_request_created: bool,
}

impl WorkflowState {
    pub fn new(request: UpdateRequest, target: String, base: String) -> Self {
        Self {
            branch: branch_name(&target),
            request,
            target,
            base,
            record: None,
            asset_op: AssetOp::None,
            branch_created: false,
            profile_commit: None,
            picture_commit: None,
            pull_request: None,
            pull_request_created: false,
        }
    }

    /// Resolved full name, falling back to the raw target before the merge ran.
    pub fn display_name(&self) -> &str {
        self.record
            .as_ref()
            .map(|record| record.full_name.as_str())
            .unwrap_or(&self.target)
    }

    /// Latest commit pushed to the working branch by this invocation.
    pub fn head(&self) -> Option<&CommitRef> {
        self.picture_commit.as_ref().or(self.profile_commit.as_ref())
    }
}
