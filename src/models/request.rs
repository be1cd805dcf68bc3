//! Inbound update request, delivered by an already-verified command invocation.

use serde::{Deserialize, Serialize};

use crate::boardd::identity::normalize;

/// The user who invoked the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Discord handle of the invoking user.
    pub identity: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Fields to apply to the target's record. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFields {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, rename = "pictureSourceURL", alias = "pictureURL")]
    pub picture_source_url: Option<String>,
    #[serde(default)]
    pub github_tag: Option<String>,
    #[serde(default)]
    pub discord_tag: Option<String>,
    #[serde(default)]
    pub linkedin_tag: Option<String>,
    /// Move the stored picture to the filename derived from the resolved name.
    #[serde(default)]
    pub rename_picture: bool,
}

/// Request body for `POST /api/boardd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub actor: Actor,
    /// Discord handle of the board member to update. Defaults to the actor.
    #[serde(default, alias = "boardMemberTag")]
    pub target: Option<String>,
    #[serde(default)]
    pub fields: UpdateFields,
}

impl UpdateRequest {
    /// Normalized identity of the record this request mutates.
    pub fn target_identity(&self) -> String {
        normalize(self.target.as_deref().unwrap_or(&self.actor.identity))
    }
}
