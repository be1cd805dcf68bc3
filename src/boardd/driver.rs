//! Git mutation driver: the profile commit and the conditional picture commit.
//!
//! Step one always runs and rewrites the record collection on the working
//! branch. Step two runs only when the asset plan asks for a change and is
//! parented on step one's commit. Neither step is rolled back when a later
//! one fails; the next invocation for the same target continues from
//! whatever the branch tip is.

use super::asset::plan;
use super::changelog::pr_title;
use super::error::BoarddError;
use super::merge::merge;
use super::state::WorkflowState;
use crate::github::{AssetFetcher, CommitRef, ForgeError, GitDataApi, TreeEdit};
use crate::models::{CollectionError, RecordCollection};

/// Where the workflow reads and writes inside the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLayout {
    /// JSON file holding the record collection.
    pub data_path: String,
    /// Directory holding picture assets.
    pub asset_dir: String,
}

impl Default for RepositoryLayout {
    fn default() -> Self {
        Self {
            data_path: "src/lib/public/board/data/officers.json".to_string(),
            asset_dir: "static/assets/authors".to_string(),
        }
    }
}

pub fn picture_commit_message(full_name: &str) -> String {
    format!("Upload {}'s board member profile picture", full_name)
}

/// Resolve the commit the working branch continues from.
///
/// Returns the parent and whether the branch still has to be created.
async fn starting_point(
    git: &dyn GitDataApi,
    state: &WorkflowState,
) -> Result<(CommitRef, bool), BoarddError> {
    if let Some(tip) = git.branch_tip(&state.branch).await? {
        tracing::info!(branch = %state.branch, tip = %tip, "Continuing existing branch");
        return Ok((tip, false));
    }

    let tip = git
        .branch_tip(&state.base)
        .await?
        .ok_or_else(|| ForgeError::Api {
            operation: "get branch",
            status: 404,
            body: format!("base branch {} does not exist", state.base),
        })?;
    tracing::info!(branch = %state.branch, base = %state.base, "Starting new branch");
    Ok((tip, true))
}

/// Step one: merge the request into the stored collection and commit it.
///
/// An existing branch is continued from its tip, so the stored picture seen
/// here is the branch's. A retry after a failed picture step plans against the
/// already-updated record; a file the failed step meant to delete stays on the
/// branch until the pull request is reviewed.
pub async fn commit_profile(
    git: &dyn GitDataApi,
    layout: &RepositoryLayout,
    state: WorkflowState,
) -> Result<WorkflowState, BoarddError> {
    let (parent, create_branch) = starting_point(git, &state).await?;

    let content = git.read_file(&parent, &layout.data_path).await?;
    let parse_error = |source: CollectionError| BoarddError::Parse {
        path: layout.data_path.clone(),
        source,
    };
    let collection = RecordCollection::parse(&content).map_err(parse_error)?;

    let merged = merge(
        &collection,
        &state.target,
        &state.request.actor,
        &state.request.fields,
    )?;
    let asset_op = plan(
        merged.intent,
        merged.old_picture.as_deref(),
        merged.new_picture.as_deref(),
    );
    let updated = merged
        .collection
        .to_json()
        .map_err(|e| parse_error(CollectionError::Malformed(e)))?;

    let tree = git
        .build_tree(
            &parent,
            vec![TreeEdit::WriteText {
                path: layout.data_path.clone(),
                content: updated,
            }],
        )
        .await?;
    let message = pr_title(&merged.record.full_name);
    let commit = git.create_commit(&tree, &[parent], &message).await?;
    git.update_branch(&state.branch, &commit, create_branch)
        .await?;

    tracing::info!(
        branch = %state.branch,
        commit = %commit,
        records = merged.collection.len(),
        "Committed board member profile"
    );

    Ok(WorkflowState {
        record: Some(merged.record),
        asset_op,
        branch_created: create_branch,
        profile_commit: Some(commit),
        ..state
    })
}

/// Step two: apply the planned picture change on top of the profile commit.
///
/// Makes no remote calls when the plan is [`super::AssetOp::None`].
pub async fn commit_picture(
    git: &dyn GitDataApi,
    assets: &dyn AssetFetcher,
    layout: &RepositoryLayout,
    state: WorkflowState,
) -> Result<WorkflowState, BoarddError> {
    if state.asset_op.is_none() {
        tracing::debug!(branch = %state.branch, "No picture change requested");
        return Ok(state);
    }
    let parent = state
        .profile_commit
        .clone()
        .ok_or(BoarddError::OutOfOrder(
            "picture commit requires the profile commit",
        ))?;

    let content = match state.request.fields.picture_source_url.as_deref() {
        Some(url) if state.asset_op.needs_content() => Some(assets.fetch(url).await?),
        _ => None,
    };

    let edits = state.asset_op.tree_edits(&layout.asset_dir, content);
    let tree = git.build_tree(&parent, edits).await?;
    let message = picture_commit_message(state.display_name());
    let commit = git.create_commit(&tree, &[parent], &message).await?;
    git.update_branch(&state.branch, &commit, false).await?;

    tracing::info!(
        branch = %state.branch,
        commit = %commit,
        op = ?state.asset_op,
        "Committed board member picture"
    );

    Ok(WorkflowState {
        picture_commit: Some(commit),
        ..state
    })
}
