//! GitHub REST client for the git data and pull request endpoints.
//!
//! Wraps `repos/{owner}/{repo}/git/*`, `contents` and `pulls` using
//! [`reqwest`]. Every non-2xx response becomes a [`ForgeError::Api`] carrying
//! the operation name, status and raw body.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{
    CommitRef, ForgeError, GitDataApi, PrHandle, PullRequestApi, RepositoryConfig, TreeEdit,
    TreeRef,
};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const FILE_MODE: &str = "100644";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to a single repository.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    repo: RepositoryConfig,
}

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    tree: GitObject,
}

#[derive(Debug, Deserialize)]
struct BranchLabel {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    draft: bool,
    head: BranchLabel,
    base: BranchLabel,
}

impl PullResponse {
    fn into_handle(self) -> PrHandle {
        PrHandle {
            head: self.head.name,
            base: self.base.name,
            title: self.title,
            body: self.body.unwrap_or_default(),
            draft: self.draft,
            number: Some(self.number),
            url: Some(self.html_url),
        }
    }
}

impl GitHubClient {
    /// Create a client against `api_url`, normally [`DEFAULT_API_URL`].
    pub fn new(repo: RepositoryConfig, api_url: impl Into<String>) -> Result<Self, ForgeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("boardd/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ForgeError::Transport {
                operation: "build client",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url, self.repo.owner, self.repo.repo, path
        )
    }

    fn request_as(&self, method: Method, path: &str, accept: &'static str) -> RequestBuilder {
        self.client
            .request(method, self.repo_url(path))
            .bearer_auth(&self.repo.credential)
            .header(header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_as(method, path, JSON_MEDIA_TYPE)
    }

    // ---- response helpers ----

    async fn dispatch(
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, ForgeError> {
        tracing::debug!(operation, "Calling GitHub");
        builder.send().await.map_err(|e| ForgeError::Transport {
            operation,
            message: e.to_string(),
        })
    }

    async fn ensure_success(
        operation: &'static str,
        response: Response,
    ) -> Result<Response, ForgeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::error!(operation, status = status.as_u16(), %body, "GitHub call failed");
            return Err(ForgeError::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, ForgeError> {
        let response = Self::ensure_success(operation, response).await?;
        response.json::<T>().await.map_err(|e| ForgeError::Payload {
            operation,
            message: e.to_string(),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, ForgeError> {
        let response = Self::dispatch(operation, builder).await?;
        Self::parse(operation, response).await
    }

    // ---- tree helpers ----

    async fn base_tree(&self, commit: &CommitRef) -> Result<String, ForgeError> {
        let path = format!("/git/commits/{}", commit);
        let response: CommitResponse =
            Self::send_json("get commit", self.request(Method::GET, &path)).await?;
        Ok(response.tree.sha)
    }

    async fn create_blob(&self, bytes: &[u8]) -> Result<String, ForgeError> {
        let body = json!({
            "content": STANDARD.encode(bytes),
            "encoding": "base64",
        });
        let blob: GitObject = Self::send_json(
            "create blob",
            self.request(Method::POST, "/git/blobs").json(&body),
        )
        .await?;
        Ok(blob.sha)
    }

    async fn blob_sha(&self, commit: &CommitRef, path: &str) -> Result<String, ForgeError> {
        let builder = self
            .request(Method::GET, &format!("/contents/{}", path))
            .query(&[("ref", commit.0.as_str())]);
        let entry: GitObject = Self::send_json("get content", builder).await?;
        Ok(entry.sha)
    }

    async fn tree_entries(
        &self,
        base: &CommitRef,
        edits: Vec<TreeEdit>,
    ) -> Result<Vec<Value>, ForgeError> {
        let mut entries = Vec::with_capacity(edits.len());
        for edit in edits {
            match edit {
                TreeEdit::WriteText { path, content } => entries.push(json!({
                    "path": path,
                    "mode": FILE_MODE,
                    "type": "blob",
                    "content": content,
                })),
                TreeEdit::AddBlob { path, bytes } => {
                    let sha = self.create_blob(&bytes).await?;
                    entries.push(json!({
                        "path": path,
                        "mode": FILE_MODE,
                        "type": "blob",
                        "sha": sha,
                    }));
                }
                TreeEdit::Delete { path } => entries.push(json!({
                    "path": path,
                    "mode": FILE_MODE,
                    "type": "blob",
                    "sha": null,
                })),
                TreeEdit::Rename { from, to } => {
                    let sha = self.blob_sha(base, &from).await?;
                    entries.push(json!({
                        "path": to,
                        "mode": FILE_MODE,
                        "type": "blob",
                        "sha": sha,
                    }));
                    entries.push(json!({
                        "path": from,
                        "mode": FILE_MODE,
                        "type": "blob",
                        "sha": null,
                    }));
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl GitDataApi for GitHubClient {
    async fn default_branch(&self) -> Result<String, ForgeError> {
        let info: RepositoryInfo =
            Self::send_json("get repository", self.request(Method::GET, "")).await?;
        Ok(info.default_branch)
    }

    async fn branch_tip(&self, branch: &str) -> Result<Option<CommitRef>, ForgeError> {
        let operation = "get branch";
        let path = format!("/git/ref/heads/{}", branch);
        let response = Self::dispatch(operation, self.request(Method::GET, &path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let reference: RefResponse = Self::parse(operation, response).await?;
        Ok(Some(CommitRef(reference.object.sha)))
    }

    async fn read_file(&self, commit: &CommitRef, path: &str) -> Result<String, ForgeError> {
        let operation = "read file";
        let builder = self
            .request_as(Method::GET, &format!("/contents/{}", path), RAW_MEDIA_TYPE)
            .query(&[("ref", commit.0.as_str())]);
        let response = Self::dispatch(operation, builder).await?;
        let response = Self::ensure_success(operation, response).await?;
        response.text().await.map_err(|e| ForgeError::Payload {
            operation,
            message: e.to_string(),
        })
    }

    async fn build_tree(
        &self,
        base: &CommitRef,
        edits: Vec<TreeEdit>,
    ) -> Result<TreeRef, ForgeError> {
        let base_tree = self.base_tree(base).await?;
        let entries = self.tree_entries(base, edits).await?;

        let body = json!({
            "base_tree": base_tree,
            "tree": entries,
        });
        let tree: GitObject = Self::send_json(
            "create tree",
            self.request(Method::POST, "/git/trees").json(&body),
        )
        .await?;
        Ok(TreeRef(tree.sha))
    }

    async fn create_commit(
        &self,
        tree: &TreeRef,
        parents: &[CommitRef],
        message: &str,
    ) -> Result<CommitRef, ForgeError> {
        let body = json!({
            "message": message,
            "tree": tree.0,
            "parents": parents.iter().map(|p| p.0.as_str()).collect::<Vec<_>>(),
        });
        let commit: GitObject = Self::send_json(
            "create commit",
            self.request(Method::POST, "/git/commits").json(&body),
        )
        .await?;
        Ok(CommitRef(commit.sha))
    }

    async fn update_branch(
        &self,
        branch: &str,
        commit: &CommitRef,
        create_if_absent: bool,
    ) -> Result<(), ForgeError> {
        if create_if_absent {
            let operation = "create branch";
            let body = json!({
                "ref": format!("refs/heads/{}", branch),
                "sha": commit.0,
            });
            let response =
                Self::dispatch(operation, self.request(Method::POST, "/git/refs").json(&body))
                    .await?;
            // 422 means the ref already exists; fall through to a plain update.
            if response.status() != StatusCode::UNPROCESSABLE_ENTITY {
                Self::ensure_success(operation, response).await?;
                return Ok(());
            }
            tracing::debug!(branch, "Branch already exists, updating instead");
        }

        // Forced: the last ref update wins when two invocations race.
        let body = json!({ "sha": commit.0, "force": true });
        let path = format!("/git/refs/heads/{}", branch);
        let response = Self::dispatch(
            "update branch",
            self.request(Method::PATCH, &path).json(&body),
        )
        .await?;
        Self::ensure_success("update branch", response).await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn find_open_pr(&self, head: &str, base: &str) -> Result<Option<PrHandle>, ForgeError> {
        let head = format!("{}:{}", self.repo.owner, head);
        let builder = self
            .request(Method::GET, "/pulls")
            .query(&[("state", "open"), ("head", head.as_str()), ("base", base)]);
        let pulls: Vec<PullResponse> = Self::send_json("list pull requests", builder).await?;
        Ok(pulls.into_iter().next().map(PullResponse::into_handle))
    }

    async fn create_pr(&self, pr: &PrHandle) -> Result<PrHandle, ForgeError> {
        let body = json!({
            "title": pr.title,
            "head": pr.head,
            "base": pr.base,
            "body": pr.body,
            "draft": pr.draft,
        });
        let created: PullResponse = Self::send_json(
            "create pull request",
            self.request(Method::POST, "/pulls").json(&body),
        )
        .await?;
        Ok(created.into_handle())
    }
}
