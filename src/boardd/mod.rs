//! Board member update orchestrator.
//!
//! One invocation runs strictly in sequence:
//! access gate, profile commit (which merges the record and plans the picture
//! change), optional picture commit, then pull request reconciliation. Each
//! stage returns a new [`WorkflowState`] for the next.
//!
//! Concurrent invocations for the same target are not serialized. Both read
//! the branch tip, and the last branch update wins; a writer that read a stale
//! tip overwrites the other's profile commit. Collisions need the same person
//! to run two updates at once, so no locking is done.

mod access;
mod asset;
mod changelog;
mod driver;
mod error;
pub mod identity;
mod merge;
mod pr;
mod state;

pub use access::{authorize, precheck};
pub use asset::AssetOp;
pub use driver::RepositoryLayout;
pub use error::BoarddError;
pub use state::WorkflowState;

use std::sync::Arc;

use serde::Serialize;

use crate::github::{AssetFetcher, CommitRef, GitDataApi, PullRequestApi};
use crate::models::UpdateRequest;

/// Static settings of an orchestrator instance.
#[derive(Debug, Clone)]
pub struct BoarddSettings {
    /// Pull request base. The repository default branch when `None`.
    pub base_branch: Option<String>,
    pub layout: RepositoryLayout,
    /// Open pull requests as drafts.
    pub draft: bool,
    /// Browser URL of the repository, used in result messages.
    pub repository_url: String,
}

/// What the caller shows the user after a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoarddResult {
    pub branch_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    /// Whether this invocation opened the pull request.
    pub created: bool,
    pub asset_op: AssetOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<CommitRef>,
    pub message: String,
}

impl BoarddResult {
    fn from_state(state: WorkflowState, repository_url: &str) -> Self {
        let pull_request = state.pull_request.as_ref();
        let pr_number = pull_request.and_then(|pr| pr.number);
        let pr_url = pull_request.and_then(|pr| pr.url.clone());
        let tree_url = format!("{}/tree/{}", repository_url, state.branch);

        let message = match (&pr_url, state.pull_request_created) {
            (Some(url), true) => format!("Successfully created <{}>!", url),
            (Some(url), false) => format!(
                "Successfully updated [`{}`]({}) (<{}>)!",
                state.branch, tree_url, url
            ),
            (None, _) => format!("Successfully updated [`{}`]({})!", state.branch, tree_url),
        };

        Self {
            head: state.head().cloned(),
            branch_ref: state.branch,
            pr_number,
            pr_url,
            created: state.pull_request_created,
            asset_op: state.asset_op,
            message,
        }
    }
}

/// Runs update requests against one repository.
pub struct Boardd {
    git: Arc<dyn GitDataApi>,
    pulls: Arc<dyn PullRequestApi>,
    assets: Arc<dyn AssetFetcher>,
    settings: BoarddSettings,
}

impl Boardd {
    pub fn new(
        git: Arc<dyn GitDataApi>,
        pulls: Arc<dyn PullRequestApi>,
        assets: Arc<dyn AssetFetcher>,
        settings: BoarddSettings,
    ) -> Self {
        Self {
            git,
            pulls,
            assets,
            settings,
        }
    }

    /// Apply `request` and publish it as a pull request.
    ///
    /// Permission and validation failures return before any remote write.
    /// A remote failure stops the workflow; earlier commits stay on the branch.
    pub async fn run(&self, request: UpdateRequest) -> Result<BoarddResult, BoarddError> {
        precheck(&request)?;
        let target = request.target_identity();
        authorize(&request.actor, &target)?;

        let base = match &self.settings.base_branch {
            Some(base) => base.clone(),
            None => self.git.default_branch().await?,
        };

        let state = WorkflowState::new(request, target, base);
        tracing::info!(
            actor = %state.request.actor.identity,
            target = %state.target,
            branch = %state.branch,
            base = %state.base,
            "Updating board member profile"
        );

        let state = driver::commit_profile(self.git.as_ref(), &self.settings.layout, state).await?;
        let state = driver::commit_picture(
            self.git.as_ref(),
            self.assets.as_ref(),
            &self.settings.layout,
            state,
        )
        .await?;
        let state = pr::open_pull_request(self.pulls.as_ref(), state, self.settings.draft).await?;

        Ok(BoarddResult::from_state(state, &self.settings.repository_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::memory::InMemoryForge;
    use crate::github::ForgeError;
    use crate::models::{Actor, RecordCollection, UpdateFields};

    const DATA_PATH: &str = "src/lib/public/board/data/officers.json";
    const JANE_PICTURE_URL: &str = "https://cdn.example/jane.png";

    const JANE_COLLECTION: &str = r#"[
  {
    "fullName": "Jane Doe",
    "socials": {
      "discord": "jane"
    },
    "positions": {
      "president": "F23"
    },
    "picture": "jane-doe.webp"
  }
]
"#;

    fn boardd(forge: &Arc<InMemoryForge>) -> Boardd {
        Boardd::new(
            forge.clone(),
            forge.clone(),
            forge.clone(),
            BoarddSettings {
                base_branch: None,
                layout: RepositoryLayout::default(),
                draft: false,
                repository_url: "https://github.com/acm/site".to_string(),
            },
        )
    }

    fn jane_forge() -> Arc<InMemoryForge> {
        Arc::new(
            InMemoryForge::new(
                "main",
                &[
                    (DATA_PATH, JANE_COLLECTION),
                    ("static/assets/authors/jane-doe.webp", "old picture"),
                ],
            )
            .with_asset(JANE_PICTURE_URL, b"new picture"),
        )
    }

    fn request(
        identity: &str,
        is_admin: bool,
        target: Option<&str>,
        fields: UpdateFields,
    ) -> UpdateRequest {
        UpdateRequest {
            actor: Actor {
                identity: identity.to_string(),
                display_name: None,
                is_admin,
            },
            target: target.map(str::to_string),
            fields,
        }
    }

    fn stored(forge: &InMemoryForge, branch: &str) -> RecordCollection {
        RecordCollection::parse(&forge.text(branch, DATA_PATH).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_admin_creates_new_record() {
        let forge = Arc::new(InMemoryForge::new("main", &[(DATA_PATH, "[]\n")]));

        let result = boardd(&forge)
            .run(request(
                "admin",
                true,
                Some("NewPerson#4242"),
                UpdateFields {
                    full_name: Some("New Person".to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        assert_eq!(result.branch_ref, "boardd-newperson");
        assert_eq!(result.pr_number, Some(1));
        assert!(result.created);
        assert_eq!(result.asset_op, AssetOp::None);
        assert_eq!(
            result.message,
            "Successfully created <https://github.com/acm/site/pull/1>!"
        );

        let collection = stored(&forge, "boardd-newperson");
        assert_eq!(collection.len(), 1);
        let record = &collection.records()[0];
        assert_eq!(record.full_name, "New Person");
        assert_eq!(record.socials.discord.as_deref(), Some("newperson"));
        assert!(record.positions.is_empty());
        assert!(record.picture.is_none());
        assert!(!forge
            .text("boardd-newperson", DATA_PATH)
            .unwrap()
            .contains("picture"));

        // The base branch is untouched.
        assert_eq!(forge.text("main", DATA_PATH).unwrap(), "[]\n");

        let pulls = forge.pulls();
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].head, "boardd-newperson");
        assert_eq!(pulls[0].base, "main");
        assert_eq!(pulls[0].title, "Update New Person's board member profile");
        assert!(pulls[0].body.contains("- **Full Name**: New Person"));

        let head = forge.tip("boardd-newperson").unwrap();
        let commit = forge.commit(&head).unwrap();
        assert_eq!(commit.message, "Update New Person's board member profile");
        assert_eq!(commit.parents, vec![CommitRef("root".to_string())]);
    }

    #[tokio::test]
    async fn test_same_slug_picture_overwrites_without_delete() {
        let forge = jane_forge();

        let result = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    picture_source_url: Some(JANE_PICTURE_URL.to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        assert_eq!(
            result.asset_op,
            AssetOp::Upload {
                name: "jane-doe.webp".to_string()
            }
        );

        let record = stored(&forge, "boardd-jane").records()[0].clone();
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.socials.discord.as_deref(), Some("jane"));
        assert_eq!(record.picture.as_deref(), Some("jane-doe.webp"));
        assert_eq!(
            forge.file("boardd-jane", "static/assets/authors/jane-doe.webp"),
            Some(b"new picture".to_vec())
        );

        // Picture commit sits on top of the profile commit.
        let head = forge.tip("boardd-jane").unwrap();
        let picture_commit = forge.commit(&head).unwrap();
        assert_eq!(
            picture_commit.message,
            "Upload Jane Doe's board member profile picture"
        );
        let profile_commit = forge.commit(&picture_commit.parents[0]).unwrap();
        assert_eq!(profile_commit.message, "Update Jane Doe's board member profile");
        assert_eq!(result.head, Some(head));
    }

    #[tokio::test]
    async fn test_renamed_member_picture_replaces_old_file() {
        let forge = jane_forge();

        let result = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    full_name: Some("Jane Smith".to_string()),
                    picture_source_url: Some(JANE_PICTURE_URL.to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        assert_eq!(
            result.asset_op,
            AssetOp::UploadAndDelete {
                new_name: "jane-smith.webp".to_string(),
                old_name: "jane-doe.webp".to_string(),
            }
        );
        assert!(forge
            .file("boardd-jane", "static/assets/authors/jane-doe.webp")
            .is_none());
        assert_eq!(
            forge.file("boardd-jane", "static/assets/authors/jane-smith.webp"),
            Some(b"new picture".to_vec())
        );
        assert_eq!(
            stored(&forge, "boardd-jane").records()[0].picture.as_deref(),
            Some("jane-smith.webp")
        );
    }

    #[tokio::test]
    async fn test_rename_moves_existing_picture() {
        let forge = jane_forge();

        let result = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    full_name: Some("Jane Smith".to_string()),
                    rename_picture: true,
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        assert_eq!(
            result.asset_op,
            AssetOp::Rename {
                old_name: "jane-doe.webp".to_string(),
                new_name: "jane-smith.webp".to_string(),
            }
        );
        assert!(!forge.calls().contains(&"fetch"));
        assert_eq!(
            forge.file("boardd-jane", "static/assets/authors/jane-smith.webp"),
            Some(b"old picture".to_vec())
        );
        assert!(forge
            .file("boardd-jane", "static/assets/authors/jane-doe.webp")
            .is_none());
    }

    #[tokio::test]
    async fn test_reinvocation_reuses_branch_and_pull_request() {
        let forge = jane_forge();
        let orchestrator = boardd(&forge);
        let update = request(
            "jane",
            false,
            None,
            UpdateFields {
                github_tag: Some("janegh".to_string()),
                ..UpdateFields::default()
            },
        );

        let first = orchestrator.run(update.clone()).await.unwrap();
        let first_tip = forge.tip("boardd-jane").unwrap();
        let second = orchestrator.run(update).await.unwrap();

        assert_eq!(first.pr_number, second.pr_number);
        assert!(first.created);
        assert!(!second.created);
        assert!(second.message.starts_with("Successfully updated [`boardd-jane`]"));
        assert_eq!(forge.pulls().len(), 1);

        // The second run continued from the first run's tip.
        let second_tip = forge.tip("boardd-jane").unwrap();
        assert_eq!(forge.commit(&second_tip).unwrap().parents, vec![first_tip]);
    }

    #[tokio::test]
    async fn test_closed_pull_request_is_not_reused() {
        let forge = jane_forge();
        let orchestrator = boardd(&forge);
        let update = request("jane", false, None, UpdateFields::default());

        let first = orchestrator.run(update.clone()).await.unwrap();
        forge.close_pr(first.pr_number.unwrap());
        let second = orchestrator.run(update).await.unwrap();

        assert_ne!(first.pr_number, second.pr_number);
        assert!(second.created);
    }

    #[tokio::test]
    async fn test_denied_request_makes_no_remote_calls() {
        let forge = jane_forge();

        let err = boardd(&forge)
            .run(request(
                "alice",
                false,
                Some("jane"),
                UpdateFields {
                    full_name: Some("Not Jane".to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BoarddError::Permission(_)));
        assert!(err.is_side_effect_free());
        assert!(forge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_makes_no_remote_calls() {
        let forge = jane_forge();

        let err = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    full_name: Some(String::new()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BoarddError::Validation(_)));
        assert!(forge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_record() {
        let forge = jane_forge();

        let err = boardd(&forge)
            .run(request(
                "stranger",
                false,
                None,
                UpdateFields {
                    full_name: Some("Stranger".to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BoarddError::Permission(_)));
        assert!(!forge.calls().contains(&"build_tree"));
        assert!(!forge.calls().contains(&"update_branch"));
        assert!(forge.tip("boardd-stranger").is_none());
    }

    #[tokio::test]
    async fn test_malformed_collection_is_a_parse_error() {
        let forge = Arc::new(InMemoryForge::new("main", &[(DATA_PATH, "{ not json")]));

        let err = boardd(&forge)
            .run(request("jane", false, None, UpdateFields::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, BoarddError::Parse { .. }));
        assert!(!forge.calls().contains(&"create_commit"));
    }

    #[tokio::test]
    async fn test_profile_failure_skips_picture_step() {
        let forge = jane_forge();
        forge.fail_on("create_commit");

        let err = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    picture_source_url: Some(JANE_PICTURE_URL.to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap_err();

        match err {
            BoarddError::Remote(ForgeError::Api { operation, status, .. }) => {
                assert_eq!(operation, "create_commit");
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let calls = forge.calls();
        assert!(!calls.contains(&"fetch"));
        assert!(!calls.contains(&"update_branch"));
        assert!(!calls.contains(&"create_pr"));
        assert!(forge.tip("boardd-jane").is_none());
    }

    #[tokio::test]
    async fn test_picture_failure_keeps_profile_commit() {
        let forge = jane_forge();
        forge.fail_on("fetch");

        let err = boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    github_tag: Some("janegh".to_string()),
                    picture_source_url: Some(JANE_PICTURE_URL.to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BoarddError::Transfer(_)));
        assert!(!err.is_side_effect_free());

        // Step one stays committed; no pull request was opened.
        let record = stored(&forge, "boardd-jane").records()[0].clone();
        assert_eq!(record.socials.github.as_deref(), Some("janegh"));
        assert!(forge.pulls().is_empty());
    }

    #[tokio::test]
    async fn test_configured_base_branch_skips_default_lookup() {
        let forge = Arc::new(InMemoryForge::new("develop", &[(DATA_PATH, JANE_COLLECTION)]));
        let orchestrator = Boardd::new(
            forge.clone(),
            forge.clone(),
            forge.clone(),
            BoarddSettings {
                base_branch: Some("develop".to_string()),
                layout: RepositoryLayout::default(),
                draft: true,
                repository_url: "https://github.com/acm/site".to_string(),
            },
        );

        orchestrator
            .run(request("jane", false, None, UpdateFields::default()))
            .await
            .unwrap();

        assert!(!forge.calls().contains(&"default_branch"));
        let pulls = forge.pulls();
        assert_eq!(pulls[0].base, "develop");
        assert!(pulls[0].draft);
    }

    #[tokio::test]
    async fn test_no_picture_change_skips_step_two() {
        let forge = jane_forge();

        boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    linkedin_tag: Some("jane-li".to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        let calls = forge.calls();
        assert_eq!(
            calls,
            vec![
                "default_branch",
                "branch_tip",
                "branch_tip",
                "read_file",
                "build_tree",
                "create_commit",
                "update_branch",
                "find_open_pr",
                "create_pr",
            ]
        );
    }

    #[tokio::test]
    async fn test_untouched_records_are_written_back_verbatim() {
        let mixed = r#"[
  {
    "picture": "john-roe.webp",
    "fullName": "John Roe",
    "socials": {
      "discord": "john",
      "instagram": "john.pics"
    },
    "positions": {
      "treasurer": "S24"
    },
    "pronouns": "he/him"
  },
  {
    "fullName": "Jane Doe",
    "socials": {
      "discord": "jane"
    },
    "positions": {
      "president": "F23"
    },
    "picture": "jane-doe.webp"
  }
]
"#;
        let forge = Arc::new(InMemoryForge::new("main", &[(DATA_PATH, mixed)]));

        boardd(&forge)
            .run(request(
                "jane",
                false,
                None,
                UpdateFields {
                    linkedin_tag: Some("jane-li".to_string()),
                    ..UpdateFields::default()
                },
            ))
            .await
            .unwrap();

        let expected = mixed.replace(
            "\"discord\": \"jane\"\n",
            "\"discord\": \"jane\",\n      \"linkedin\": \"jane-li\"\n",
        );
        assert_eq!(forge.text("boardd-jane", DATA_PATH).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_retry_after_picture_failure_plans_from_branch_tip() {
        let forge = jane_forge();
        let orchestrator = boardd(&forge);
        let update = request(
            "jane",
            false,
            None,
            UpdateFields {
                full_name: Some("Jane Smith".to_string()),
                picture_source_url: Some(JANE_PICTURE_URL.to_string()),
                ..UpdateFields::default()
            },
        );

        forge.fail_on("fetch");
        let err = orchestrator.run(update.clone()).await.unwrap_err();
        assert!(matches!(err, BoarddError::Transfer(_)));
        assert_eq!(
            stored(&forge, "boardd-jane").records()[0].picture.as_deref(),
            Some("jane-smith.webp")
        );

        forge.recover();
        let result = orchestrator.run(update).await.unwrap();

        // The branch already names the new file, so only the upload remains.
        assert_eq!(
            result.asset_op,
            AssetOp::Upload {
                name: "jane-smith.webp".to_string()
            }
        );
        assert_eq!(
            forge.file("boardd-jane", "static/assets/authors/jane-smith.webp"),
            Some(b"new picture".to_vec())
        );
        assert!(forge
            .file("boardd-jane", "static/assets/authors/jane-doe.webp")
            .is_some());
        assert_eq!(forge.pulls().len(), 1);
    }
}
