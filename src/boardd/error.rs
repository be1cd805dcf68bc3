//! Failure taxonomy of the update workflow.

use crate::github::{ForgeError, TransferError};
use crate::models::CollectionError;

/// Errors returned by [`super::Boardd::run`].
///
/// Permission and validation failures are raised before any remote write.
/// Remote failures abort the remaining steps; commits already pushed stay.
#[derive(Debug, thiserror::Error)]
pub enum BoarddError {
    /// The actor may not mutate the target, or may not create a new record.
    #[error("{0}")]
    Permission(String),

    /// The resolved full name is empty or missing.
    #[error("{0}")]
    Validation(String),

    /// The stored record collection does not match the expected schema.
    #[error("could not read {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: CollectionError,
    },

    /// A version-control or pull-request call failed.
    #[error(transparent)]
    Remote(#[from] ForgeError),

    /// Downloading the source picture failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A stage ran before the stage it depends on.
    #[error("workflow step out of order: {0}")]
    OutOfOrder(&'static str),
}

impl BoarddError {
    pub(crate) fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the failure happened before anything was written remotely.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self,
            Self::Permission(_) | Self::Validation(_) | Self::Parse { .. }
        )
    }
}
