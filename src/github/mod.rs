//! Version-control and pull-request capabilities consumed by the workflow.
//!
//! The traits are the seams between the orchestrator and GitHub; the REST
//! implementation lives in [`client`], the picture downloader in [`fetch`].

mod client;
mod fetch;
#[cfg(test)]
pub mod memory;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use fetch::HttpAssetFetcher;

use async_trait::async_trait;
use serde::Serialize;

/// Repository coordinates and credential handed to the GitHub client.
#[derive(Clone)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    pub credential: String,
}

impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl RepositoryConfig {
    /// Browser URL of the repository.
    pub fn web_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

/// Commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitRef(pub String);

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tree SHA.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeRef(pub String);

/// One change applied on top of a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEdit {
    WriteText { path: String, content: String },
    AddBlob { path: String, bytes: Vec<u8> },
    Delete { path: String },
    Rename { from: String, to: String },
}

/// A pull request, before or after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrHandle {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub draft: bool,
    /// Assigned by the forge; absent until created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PrHandle {
    pub fn new(
        head: impl Into<String>,
        base: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        draft: bool,
    ) -> Self {
        Self {
            head: head.into(),
            base: base.into(),
            title: title.into(),
            body: body.into(),
            draft,
            number: None,
            url: None,
        }
    }
}

/// Errors from version-control and pull-request calls.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// The forge answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("{operation} request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{operation} returned an unexpected payload: {message}")]
    Payload {
        operation: &'static str,
        message: String,
    },
}

impl ForgeError {
    pub fn operation(&self) -> &'static str {
        match self {
            ForgeError::Api { operation, .. }
            | ForgeError::Transport { operation, .. }
            | ForgeError::Payload { operation, .. } => operation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ForgeError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to download a source picture.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {url}: {message}")]
pub struct TransferError {
    pub url: String,
    pub status: Option<u16>,
    pub message: String,
}

/// Git data primitives: refs, trees, commits and file reads.
#[async_trait]
pub trait GitDataApi: Send + Sync {
    /// Name of the repository's default branch.
    async fn default_branch(&self) -> Result<String, ForgeError>;

    /// Current tip of `branch`, or `None` when the branch does not exist.
    async fn branch_tip(&self, branch: &str) -> Result<Option<CommitRef>, ForgeError>;

    /// Text content of `path` as of `commit`.
    async fn read_file(&self, commit: &CommitRef, path: &str) -> Result<String, ForgeError>;

    /// Build a new tree from `base`'s tree with `edits` applied.
    async fn build_tree(&self, base: &CommitRef, edits: Vec<TreeEdit>)
        -> Result<TreeRef, ForgeError>;

    async fn create_commit(
        &self,
        tree: &TreeRef,
        parents: &[CommitRef],
        message: &str,
    ) -> Result<CommitRef, ForgeError>;

    /// Point `branch` at `commit`, creating the ref when `create_if_absent`.
    async fn update_branch(
        &self,
        branch: &str,
        commit: &CommitRef,
        create_if_absent: bool,
    ) -> Result<(), ForgeError>;
}

/// Pull request lookup and creation.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Open pull request from `head` into `base`, if any.
    async fn find_open_pr(&self, head: &str, base: &str) -> Result<Option<PrHandle>, ForgeError>;

    /// Open `pr` and return it with its number assigned.
    async fn create_pr(&self, pr: &PrHandle) -> Result<PrHandle, ForgeError>;
}

/// Downloads source pictures.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError>;
}
