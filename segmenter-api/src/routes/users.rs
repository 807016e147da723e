/// User and membership endpoints
///
/// # Endpoints
///
/// - `POST /v1/users` - Create user (idempotent)
/// - `GET /v1/users` - List all users with their segments
/// - `DELETE /v1/users/:id` - Delete user and its memberships
/// - `GET /v1/users/:id/segments` - Segments of a user
/// - `POST /v1/users/add_segment` - Add user to segment (idempotent)
/// - `POST /v1/users/remove_segment` - Remove user from segment (idempotent)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use segmenter_shared::models::user::UserWithSegments;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Externally supplied user id
    pub id: i64,
}

/// Create user response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserResponse {
    /// Human-readable outcome
    pub message: String,

    /// User id
    pub id: i64,

    /// False if the user already existed
    pub created: bool,
}

/// Membership change request
#[derive(Debug, Deserialize, Validate)]
pub struct UserSegmentRequest {
    /// User id
    pub user_id: i64,

    /// Segment name
    #[validate(length(min = 1, max = 255, message = "Segment name must be 1-255 characters"))]
    pub segment_name: String,
}

/// Membership change response
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSegmentResponse {
    /// Human-readable outcome
    pub message: String,

    /// Whether the membership set actually changed
    pub changed: bool,
}

/// Generic acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

/// Create user
///
/// ```text
/// POST /v1/users
/// {"id": 15230}
/// ```
///
/// Always succeeds for a well-formed id; `created` is false when the user
/// already existed.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<Json<CreateUserResponse>> {
    let outcome = state.store.create_user(req.id).await?;

    let message = if outcome.created {
        format!("User {} created successfully", req.id)
    } else {
        format!("User {} already exists", req.id)
    };

    Ok(Json(CreateUserResponse {
        message,
        id: outcome.record.id,
        created: outcome.created,
    }))
}

/// List every user with its segments
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserWithSegments>>> {
    Ok(Json(state.store.all_users().await?))
}

/// Delete user
///
/// # Errors
///
/// - `404 Not Found`: User doesn't exist
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.store.delete_user(id).await?;

    Ok(Json(MessageResponse {
        message: format!("User {} deleted", id),
    }))
}

/// Segments of a user
///
/// # Errors
///
/// - `404 Not Found`: User doesn't exist
pub async fn get_user_segments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.segments_of(id).await?))
}

/// Add user to segment
///
/// ```text
/// POST /v1/users/add_segment
/// {"user_id": 15230, "segment_name": "MAIL_GPT"}
/// ```
///
/// # Errors
///
/// - `404 Not Found`: User or segment doesn't exist
/// - `422 Unprocessable Entity`: Empty segment name
pub async fn add_segment(
    State(state): State<AppState>,
    Json(req): Json<UserSegmentRequest>,
) -> ApiResult<Json<UserSegmentResponse>> {
    req.validate()?;

    let changed = state
        .store
        .add_membership(req.user_id, &req.segment_name)
        .await?;

    Ok(Json(UserSegmentResponse {
        message: format!("User {} added to segment {}", req.user_id, req.segment_name),
        changed,
    }))
}

/// Remove user from segment
///
/// # Errors
///
/// - `404 Not Found`: User or segment doesn't exist
/// - `422 Unprocessable Entity`: Empty segment name
pub async fn remove_segment(
    State(state): State<AppState>,
    Json(req): Json<UserSegmentRequest>,
) -> ApiResult<Json<UserSegmentResponse>> {
    req.validate()?;

    let changed = state
        .store
        .remove_membership(req.user_id, &req.segment_name)
        .await?;

    Ok(Json(UserSegmentResponse {
        message: format!(
            "User {} removed from segment {}",
            req.user_id, req.segment_name
        ),
        changed,
    }))
}
