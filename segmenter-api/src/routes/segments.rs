/// Segment endpoints
///
/// # Endpoints
///
/// - `POST /v1/segments` - Create segment (idempotent)
/// - `GET /v1/segments` - List all segments with their members
/// - `PATCH /v1/segments/:name` - Rename segment
/// - `DELETE /v1/segments/:name` - Delete segment and its memberships
/// - `GET /v1/segments/:name/users` - Members of a segment
/// - `POST /v1/segments/distribute` - Add a random share of all users

use crate::{app::AppState, error::ApiResult, routes::users::MessageResponse};
use axum::{
    extract::{Path, State},
    Json,
};
use rand::{rngs::StdRng, SeedableRng};
use segmenter_shared::{distribution::distribute, models::segment::SegmentWithUsers};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create segment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSegmentRequest {
    /// Segment name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Create segment response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSegmentResponse {
    /// Human-readable outcome
    pub message: String,

    /// Segment id
    pub id: i64,

    /// False if the segment already existed
    pub created: bool,
}

/// Rename segment request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameSegmentRequest {
    /// New segment name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub new_name: String,
}

/// Distribute segment request
#[derive(Debug, Deserialize, Validate)]
pub struct DistributeRequest {
    /// Segment name
    #[validate(length(min = 1, max = 255, message = "Segment name must be 1-255 characters"))]
    pub segment_name: String,

    /// Share of the user population, in (0, 100]
    pub percent: f64,
}

/// Distribute segment response
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributeResponse {
    /// Human-readable outcome
    pub message: String,

    /// Users in the population
    pub population: usize,

    /// Users selected and processed
    pub processed: usize,

    /// Memberships that did not exist before
    pub newly_added: usize,
}

/// Create segment
///
/// ```text
/// POST /v1/segments
/// {"name": "MAIL_GPT"}
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Empty or overlong name
pub async fn create_segment(
    State(state): State<AppState>,
    Json(req): Json<CreateSegmentRequest>,
) -> ApiResult<Json<CreateSegmentResponse>> {
    req.validate()?;

    let outcome = state.store.create_segment(&req.name).await?;

    let message = if outcome.created {
        format!("Segment '{}' created successfully", req.name)
    } else {
        format!("Segment '{}' already exists", req.name)
    };

    Ok(Json(CreateSegmentResponse {
        message,
        id: outcome.record.id,
        created: outcome.created,
    }))
}

/// List every segment with its members
pub async fn list_segments(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SegmentWithUsers>>> {
    Ok(Json(state.store.all_segments().await?))
}

/// Rename segment
///
/// ```text
/// PATCH /v1/segments/MAIL_GPT
/// {"new_name": "MAIL_GPT_V2"}
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Segment doesn't exist
/// - `409 Conflict`: New name belongs to another segment
pub async fn rename_segment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RenameSegmentRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let segment = state.store.rename_segment(&name, &req.new_name).await?;

    Ok(Json(MessageResponse {
        message: format!("Segment renamed to {}", segment.name),
    }))
}

/// Delete segment
///
/// # Errors
///
/// - `404 Not Found`: Segment doesn't exist
pub async fn delete_segment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.store.delete_segment(&name).await?;

    Ok(Json(MessageResponse {
        message: format!("Segment {} deleted", name),
    }))
}

/// Members of a segment
///
/// # Errors
///
/// - `404 Not Found`: Segment doesn't exist
pub async fn get_segment_users(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<i64>>> {
    Ok(Json(state.store.users_of(&name).await?))
}

/// Distribute segment to a percentage of all users
///
/// ```text
/// POST /v1/segments/distribute
/// {"segment_name": "MAIL_GPT", "percent": 30.0}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Percent outside (0, 100]
/// - `404 Not Found`: Segment doesn't exist
pub async fn distribute_segment(
    State(state): State<AppState>,
    Json(req): Json<DistributeRequest>,
) -> ApiResult<Json<DistributeResponse>> {
    req.validate()?;

    let mut rng = StdRng::from_entropy();
    let report = distribute(&state.store, &req.segment_name, req.percent, &mut rng).await?;

    Ok(Json(DistributeResponse {
        message: format!(
            "Segment {} distributed to {} users",
            report.segment, report.processed
        ),
        population: report.population,
        processed: report.processed,
        newly_added: report.newly_added,
    }))
}
