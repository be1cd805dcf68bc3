//! Configuration module for the boardd service.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Only the GitHub token is required.

use std::env;
use std::net::SocketAddr;

use crate::boardd::{BoarddSettings, RepositoryLayout};
use crate::github::{RepositoryConfig, DEFAULT_API_URL};

/// Configuration that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid {name} value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Personal access token used for every GitHub call
    pub github_token: String,
    /// GitHub API base URL
    pub github_api_url: String,
    /// Owner of the site repository
    pub repo_owner: String,
    /// Name of the site repository
    pub repo_name: String,
    /// Pull request base branch; repository default when unset
    pub base_branch: Option<String>,
    /// Path of the officers JSON file inside the repository
    pub data_path: String,
    /// Directory of profile pictures inside the repository
    pub asset_dir: String,
    /// Open pull requests as drafts
    pub pr_draft: bool,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw_bind_addr = var_or("BOARDD_BIND_ADDR", "127.0.0.1:8080");
        let bind_addr = raw_bind_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "BOARDD_BIND_ADDR",
            value: raw_bind_addr.clone(),
        })?;

        let github_token = env::var("GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;

        let layout = RepositoryLayout::default();
        let base_branch = env::var("BOARDD_BASE_BRANCH")
            .ok()
            .filter(|branch| !branch.trim().is_empty());

        Ok(Self {
            bind_addr,
            log_level: var_or("BOARDD_LOG_LEVEL", "info"),
            github_token,
            github_api_url: var_or("GITHUB_API_URL", DEFAULT_API_URL),
            repo_owner: var_or("BOARDD_REPO_OWNER", "EthanThatOneKid"),
            repo_name: var_or("BOARDD_REPO_NAME", "acmcsuf.com"),
            base_branch,
            data_path: var_or("BOARDD_DATA_PATH", &layout.data_path),
            asset_dir: var_or("BOARDD_ASSET_DIR", &layout.asset_dir),
            pr_draft: parse_bool("BOARDD_PR_DRAFT", &var_or("BOARDD_PR_DRAFT", "false"))?,
        })
    }

    /// Repository coordinates and credential for the GitHub client.
    pub fn repository(&self) -> RepositoryConfig {
        RepositoryConfig {
            owner: self.repo_owner.clone(),
            repo: self.repo_name.clone(),
            credential: self.github_token.clone(),
        }
    }

    /// Orchestrator settings derived from this configuration.
    pub fn boardd_settings(&self) -> BoarddSettings {
        BoarddSettings {
            base_branch: self.base_branch.clone(),
            layout: RepositoryLayout {
                data_path: self.data_path.clone(),
                asset_dir: self.asset_dir.clone(),
            },
            draft: self.pr_draft,
            repository_url: self.repository().web_url(),
        }
    }
}
