//! Record merge engine.
//!
//! Produces the next record state from the stored record and the requested
//! fields. Pure over the fetched collection snapshot.

use super::asset::AssetIntent;
use super::error::BoarddError;
use super::identity::picture_name;
use crate::models::{Actor, Record, RecordCollection, Socials, UpdateFields, PLACEHOLDER_PICTURE};

/// Result of merging a request into a collection snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The collection with `record` replaced in place or appended.
    pub collection: RecordCollection,
    pub record: Record,
    pub intent: AssetIntent,
    /// Stored picture before this update, sentinel excluded.
    pub old_picture: Option<String>,
    /// Picture filename the asset step should produce, if any.
    pub new_picture: Option<String>,
}

fn real_picture(name: Option<&String>) -> Option<String> {
    name.filter(|name| name.as_str() != PLACEHOLDER_PICTURE)
        .cloned()
}

/// Merge `fields` into the record identified by `target`.
pub fn merge(
    collection: &RecordCollection,
    target: &str,
    actor: &Actor,
    fields: &UpdateFields,
) -> Result<MergeOutcome, BoarddError> {
    let base = collection.find(target);
    if base.is_none() && !actor.is_admin {
        return Err(BoarddError::permission(
            "Only admins can create a new board member profile.",
        ));
    }

    let full_name = match (&fields.full_name, base) {
        (Some(name), _) => name.clone(),
        (None, Some(base)) => base.full_name.clone(),
        (None, None) => {
            return Err(BoarddError::validation(
                "A full name is required to create a new board member profile.",
            ))
        }
    };
    if full_name.is_empty() {
        return Err(BoarddError::validation("Full name cannot be empty."));
    }

    let socials = Socials {
        github: fields
            .github_tag
            .clone()
            .or_else(|| base.and_then(|b| b.socials.github.clone())),
        linkedin: fields
            .linkedin_tag
            .clone()
            .or_else(|| base.and_then(|b| b.socials.linkedin.clone())),
        discord: Some(target.to_string()),
        extra: base.map(|b| b.socials.extra.clone()).unwrap_or_default(),
    };
    let positions = base.map(|b| b.positions.clone()).unwrap_or_default();

    let old_picture = real_picture(base.and_then(|b| b.picture.as_ref()));
    // A name slugging to nothing or to the sentinel cannot address an asset.
    let derived = picture_name(&full_name).filter(|name| name != PLACEHOLDER_PICTURE);
    if derived.is_none() && (fields.picture_source_url.is_some() || fields.rename_picture) {
        tracing::warn!(
            target = %target,
            full_name = %full_name,
            "Full name yields no usable picture filename, keeping the stored picture"
        );
    }

    let (intent, picture, legacy_picture) = match derived {
        Some(derived) if fields.picture_source_url.is_some() => {
            (AssetIntent::Replace, Some(derived), None)
        }
        Some(derived) if fields.rename_picture && old_picture.is_some() => {
            (AssetIntent::Rename, Some(derived), None)
        }
        _ => {
            let legacy = match old_picture {
                Some(_) => None,
                None => real_picture(base.and_then(|b| b.legacy_picture.as_ref())),
            };
            (AssetIntent::Keep, old_picture.clone(), legacy)
        }
    };
    let new_picture = match intent {
        AssetIntent::Keep => None,
        AssetIntent::Replace | AssetIntent::Rename => picture.clone(),
    };

    let record = Record {
        full_name,
        socials,
        positions,
        picture,
        legacy_picture,
        extra: base.map(|b| b.extra.clone()).unwrap_or_default(),
    };

    Ok(MergeOutcome {
        collection: collection.clone().upsert(record.clone()),
        record,
        intent,
        old_picture,
        new_picture,
    })
}
