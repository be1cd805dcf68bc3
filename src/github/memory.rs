//! In-memory forge backing the workflow tests.
//!
//! Commits are full file snapshots; every trait call is logged by name so
//! tests can assert which remote operations ran and in what order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    AssetFetcher, CommitRef, ForgeError, GitDataApi, PrHandle, PullRequestApi, TransferError,
    TreeEdit, TreeRef,
};

type Files = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Clone)]
pub struct StoredCommit {
    pub files: Files,
    pub parents: Vec<CommitRef>,
    pub message: String,
}

#[derive(Default)]
struct State {
    default_branch: String,
    branches: HashMap<String, CommitRef>,
    commits: HashMap<CommitRef, StoredCommit>,
    trees: HashMap<TreeRef, Files>,
    pulls: Vec<(PrHandle, bool)>,
    assets: HashMap<String, Vec<u8>>,
    calls: Vec<&'static str>,
    fail_on: Option<&'static str>,
    next_id: u64,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:04}", prefix, self.next_id)
    }
}

pub struct InMemoryForge {
    state: Mutex<State>,
}

fn api_error(operation: &'static str, status: u16, body: &str) -> ForgeError {
    ForgeError::Api {
        operation,
        status,
        body: body.to_string(),
    }
}

impl InMemoryForge {
    /// A repository whose `default_branch` holds `files` in a single commit.
    pub fn new(default_branch: &str, files: &[(&str, &str)]) -> Self {
        let root = CommitRef("root".to_string());
        let files = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
            .collect();

        let mut state = State {
            default_branch: default_branch.to_string(),
            ..State::default()
        };
        state.commits.insert(
            root.clone(),
            StoredCommit {
                files,
                parents: Vec::new(),
                message: "Initial commit".to_string(),
            },
        );
        state.branches.insert(default_branch.to_string(), root);

        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_asset(self, url: &str, bytes: &[u8]) -> Self {
        self.lock().assets.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Make every later call to `operation` fail with a 500.
    pub fn fail_on(&self, operation: &'static str) {
        self.lock().fail_on = Some(operation);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// Stop failing calls after [`Self::fail_on`].
    pub fn recover(&self) {
        self.lock().fail_on = None;
    }

    pub fn tip(&self, branch: &str) -> Option<CommitRef> {
        self.lock().branches.get(branch).cloned()
    }

    pub fn commit(&self, commit: &CommitRef) -> Option<StoredCommit> {
        self.lock().commits.get(commit).cloned()
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        let tip = state.branches.get(branch)?;
        state.commits.get(tip)?.files.get(path).cloned()
    }

    pub fn text(&self, branch: &str, path: &str) -> Option<String> {
        self.file(branch, path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn pulls(&self) -> Vec<PrHandle> {
        self.lock().pulls.iter().map(|(pr, _)| pr.clone()).collect()
    }

    pub fn close_pr(&self, number: u64) {
        let mut state = self.lock();
        for (pr, open) in state.pulls.iter_mut() {
            if pr.number == Some(number) {
                *open = false;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, ForgeError> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.fail_on == Some(operation) {
            return Err(api_error(operation, 500, "injected failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl GitDataApi for InMemoryForge {
    async fn default_branch(&self) -> Result<String, ForgeError> {
        let state = self.enter("default_branch")?;
        Ok(state.default_branch.clone())
    }

    async fn branch_tip(&self, branch: &str) -> Result<Option<CommitRef>, ForgeError> {
        let state = self.enter("branch_tip")?;
        Ok(state.branches.get(branch).cloned())
    }

    async fn read_file(&self, commit: &CommitRef, path: &str) -> Result<String, ForgeError> {
        let state = self.enter("read_file")?;
        let bytes = state
            .commits
            .get(commit)
            .and_then(|c| c.files.get(path))
            .ok_or_else(|| api_error("read_file", 404, "Not Found"))?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    async fn build_tree(
        &self,
        base: &CommitRef,
        edits: Vec<TreeEdit>,
    ) -> Result<TreeRef, ForgeError> {
        let mut state = self.enter("build_tree")?;
        let mut files = state
            .commits
            .get(base)
            .map(|c| c.files.clone())
            .ok_or_else(|| api_error("build_tree", 422, "base commit not found"))?;

        for edit in edits {
            match edit {
                TreeEdit::WriteText { path, content } => {
                    files.insert(path, content.into_bytes());
                }
                TreeEdit::AddBlob { path, bytes } => {
                    files.insert(path, bytes);
                }
                TreeEdit::Delete { path } => {
                    files.remove(&path);
                }
                TreeEdit::Rename { from, to } => {
                    let bytes = files
                        .remove(&from)
                        .ok_or_else(|| api_error("build_tree", 404, "rename source not found"))?;
                    files.insert(to, bytes);
                }
            }
        }

        let tree = TreeRef(state.next("tree"));
        state.trees.insert(tree.clone(), files);
        Ok(tree)
    }

    async fn create_commit(
        &self,
        tree: &TreeRef,
        parents: &[CommitRef],
        message: &str,
    ) -> Result<CommitRef, ForgeError> {
        let mut state = self.enter("create_commit")?;
        let files = state
            .trees
            .get(tree)
            .cloned()
            .ok_or_else(|| api_error("create_commit", 422, "tree not found"))?;

        let commit = CommitRef(state.next("commit"));
        state.commits.insert(
            commit.clone(),
            StoredCommit {
                files,
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(commit)
    }

    async fn update_branch(
        &self,
        branch: &str,
        commit: &CommitRef,
        create_if_absent: bool,
    ) -> Result<(), ForgeError> {
        let mut state = self.enter("update_branch")?;
        if !state.branches.contains_key(branch) && !create_if_absent {
            return Err(api_error("update_branch", 422, "Reference does not exist"));
        }
        state.branches.insert(branch.to_string(), commit.clone());
        Ok(())
    }
}

#[async_trait]
impl PullRequestApi for InMemoryForge {
    async fn find_open_pr(&self, head: &str, base: &str) -> Result<Option<PrHandle>, ForgeError> {
        let state = self.enter("find_open_pr")?;
        Ok(state
            .pulls
            .iter()
            .find(|(pr, open)| *open && pr.head == head && pr.base == base)
            .map(|(pr, _)| pr.clone()))
    }

    async fn create_pr(&self, pr: &PrHandle) -> Result<PrHandle, ForgeError> {
        let mut state = self.enter("create_pr")?;
        let number = state.pulls.len() as u64 + 1;
        let created = PrHandle {
            number: Some(number),
            url: Some(format!("https://github.com/acm/site/pull/{}", number)),
            ..pr.clone()
        };
        state.pulls.push((created.clone(), true));
        Ok(created)
    }
}

#[async_trait]
impl AssetFetcher for InMemoryForge {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let mut state = self.lock();
        state.calls.push("fetch");
        if state.fail_on == Some("fetch") {
            return Err(TransferError {
                url: url.to_string(),
                status: Some(500),
                message: "injected failure".to_string(),
            });
        }
        state.assets.get(url).cloned().ok_or_else(|| TransferError {
            url: url.to_string(),
            status: Some(404),
            message: "server answered 404 Not Found".to_string(),
        })
    }
}
