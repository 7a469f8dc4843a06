use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::client_ip;
use crate::deletion::DeletionOutcome;
use crate::error::AppError;
use crate::models::MessageBody;
use crate::state::AppState;

// Erase whatever is stored for the caller's address
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageBody>, AppError> {
    match state.deletion.delete(&client_ip(&headers)).await {
        Ok(DeletionOutcome::Deleted) => Ok(Json(MessageBody {
            message: "Your data has been deleted.".to_string(),
        })),
        Ok(DeletionOutcome::NotFound) => Err(AppError::NothingToDelete),
        Err(_) => Err(AppError::DeletionFailed),
    }
}
