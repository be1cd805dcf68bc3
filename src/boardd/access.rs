//! Access control gate, evaluated before any remote call.

use super::error::BoarddError;
use super::identity::normalize;
use crate::models::{Actor, UpdateRequest};

/// Allow the mutation when the actor targets themself or is an admin.
pub fn authorize(actor: &Actor, target: &str) -> Result<(), BoarddError> {
    if actor.is_admin || normalize(&actor.identity) == target {
        return Ok(());
    }

    tracing::warn!(
        actor = %actor.identity,
        target = %target,
        "Rejected update of another member's profile"
    );
    Err(BoarddError::permission(
        "You can only update your own board member profile unless you are an admin.",
    ))
}

/// Request-shape checks that need no remote state.
pub fn precheck(request: &UpdateRequest) -> Result<(), BoarddError> {
    if let Some(full_name) = &request.fields.full_name {
        if full_name.is_empty() {
            return Err(BoarddError::validation("Full name cannot be empty."));
        }
    }
    Ok(())
}
