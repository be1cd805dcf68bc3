//! Picture asset lifecycle planning.

use serde::Serialize;

use crate::github::TreeEdit;
use crate::models::PLACEHOLDER_PICTURE;

/// What the request asks of the picture asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetIntent {
    /// Leave the stored asset alone.
    Keep,
    /// Upload new content under the derived filename.
    Replace,
    /// Move the stored asset to the derived filename without new content.
    Rename,
}

/// Planned mutation of the picture asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssetOp {
    #[default]
    None,
    Upload {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    UploadAndDelete {
        new_name: String,
        old_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Rename {
        old_name: String,
        new_name: String,
    },
}

impl AssetOp {
    pub fn is_none(&self) -> bool {
        matches!(self, AssetOp::None)
    }

    /// Whether the operation needs downloaded picture bytes.
    pub fn needs_content(&self) -> bool {
        matches!(self, AssetOp::Upload { .. } | AssetOp::UploadAndDelete { .. })
    }

    /// Tree edits realizing this operation under `asset_dir`.
    ///
    /// `content` is the downloaded picture and is only read by upload variants.
    pub fn tree_edits(&self, asset_dir: &str, content: Option<Vec<u8>>) -> Vec<TreeEdit> {
        let path = |name: &str| format!("{}/{}", asset_dir.trim_end_matches('/'), name);
        let bytes = content.unwrap_or_default();

        match self {
            AssetOp::None => Vec::new(),
            AssetOp::Upload { name } => vec![TreeEdit::AddBlob {
                path: path(name),
                bytes,
            }],
            AssetOp::UploadAndDelete { new_name, old_name } => vec![
                TreeEdit::AddBlob {
                    path: path(new_name),
                    bytes,
                },
                TreeEdit::Delete {
                    path: path(old_name),
                },
            ],
            AssetOp::Rename { old_name, new_name } => vec![TreeEdit::Rename {
                from: path(old_name),
                to: path(new_name),
            }],
        }
    }
}

fn usable(name: Option<&str>) -> Option<&str> {
    name.filter(|name| !name.is_empty() && *name != PLACEHOLDER_PICTURE)
}

/// Classify the asset operation for an update.
///
/// Replacing a picture whose filename does not change overwrites the content
/// in place and deletes nothing. Recomputing with the same inputs yields the
/// same plan.
pub fn plan(intent: AssetIntent, old_picture: Option<&str>, new_picture: Option<&str>) -> AssetOp {
    let old = usable(old_picture);
    let Some(new) = usable(new_picture) else {
        return AssetOp::None;
    };

    match (intent, old) {
        (AssetIntent::Keep, _) => AssetOp::None,
        (AssetIntent::Replace, Some(old)) if old != new => AssetOp::UploadAndDelete {
            new_name: new.to_string(),
            old_name: old.to_string(),
        },
        (AssetIntent::Replace, _) => AssetOp::Upload {
            name: new.to_string(),
        },
        (AssetIntent::Rename, Some(old)) if old != new => AssetOp::Rename {
            old_name: old.to_string(),
            new_name: new.to_string(),
        },
        (AssetIntent::Rename, _) => AssetOp::None,
    }
}
