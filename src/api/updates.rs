//! Board member update endpoint.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::{success, ApiResult};
use crate::boardd::BoarddResult;
use crate::models::UpdateRequest;
use crate::AppState;

/// POST /api/boardd - Apply an update request and open or reuse its pull request.
///
/// The request arrives already verified by the inbound command layer.
pub async fn update_board_member(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<BoarddResult> {
    let Json(request) = payload?;

    match state.boardd.run(request).await {
        Ok(result) => {
            tracing::info!("{}", result.message);
            success(result)
        }
        Err(e) => {
            tracing::warn!(
                side_effect_free = e.is_side_effect_free(),
                "Board member update failed: {}",
                e
            );
            Err(e.into())
        }
    }
}
