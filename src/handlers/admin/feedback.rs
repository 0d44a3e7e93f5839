//! # Admin Feedback Moderation

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path as AxumPath, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::super::feedback::{feedback_sort_column, push_feedback_filters};
use super::super::response::{DataResponse, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    AppState, Feedback, FeedbackStatus, Page, PaginatedResponse, Pagination, SortOrder,
};
use crate::utils::constant::RECENT_WINDOW;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<FeedbackStatus>,
    pub rating: Option<i16>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub admin_response: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RatingBucket {
    pub rating: i16,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub pending_feedback: i64,
    pub approved_feedback: i64,
    pub rejected_feedback: i64,
    pub average_rating: f64,
    pub recent_feedback: i64,
    #[sqlx(skip)]
    pub rating_distribution: Vec<RatingBucket>,
}

/// All feedback, filterable by status and rating.
///
/// GET /api/feedback ?page=1&limit=10&status=pending&rating=4
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_all_feedback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedbackListQuery>,
) -> AppResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM feedback");
    push_feedback_filters(&mut count, query.status, query.rating);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db_pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM feedback");
    push_feedback_filters(&mut select, query.status, query.rating);
    select
        .push(" ORDER BY ")
        .push(feedback_sort_column(query.sort_by.as_deref()))
        .push(" ")
        .push(query.sort_order.as_sql())
        .push(", id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let feedback: Vec<Feedback> = select.build_query_as().fetch_all(&state.db_pool).await?;

    debug!(total, returned = feedback.len(), "Feedback listed");
    Ok(Json(PaginatedResponse {
        success: true,
        data: feedback,
        pagination: Pagination::new(page, total),
    }))
}

/// GET /api/feedback/stats
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_feedback_stats(
    State(state): State<Arc<AppState>>,
) -> AppResult<impl IntoResponse> {
    let since = OffsetDateTime::now_utc() - RECENT_WINDOW;

    let mut stats = sqlx::query_as::<_, FeedbackStats>(
        r#"
        SELECT
            COUNT(*) AS total_feedback,
            COUNT(*) FILTER (WHERE status = 'pending') AS pending_feedback,
            COUNT(*) FILTER (WHERE status = 'approved') AS approved_feedback,
            COUNT(*) FILTER (WHERE status = 'rejected') AS rejected_feedback,
            COALESCE(AVG(rating), 0)::float8 AS average_rating,
            COUNT(*) FILTER (WHERE created_at >= $1) AS recent_feedback
        FROM feedback
        "#,
    )
    .bind(since)
    .fetch_one(&state.db_pool)
    .await?;

    stats.rating_distribution = sqlx::query_as::<_, RatingBucket>(
        "SELECT rating, COUNT(*) AS count FROM feedback GROUP BY rating ORDER BY rating",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(DataResponse::new(stats)))
}

/// Moderates feedback. A non-empty `adminResponse` is stored along with the
/// responding admin and the time.
///
/// PATCH /api/feedback/{id}/status
///
/// # Returns
///
/// - `200 OK` with the updated feedback
/// - `400 Bad Request` - Status is not pending, approved or rejected
/// - `404 Not Found` - No such feedback
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %feedback_id))]
pub async fn update_feedback_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AxumPath(feedback_id): AxumPath<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(status) = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<FeedbackStatus>().ok())
    else {
        warn!(status = ?payload.status, "Invalid feedback status");
        return Err(AppError::BadRequest(
            "Invalid status. Must be \"pending\", \"approved\", or \"rejected\"",
        ));
    };

    let response = payload
        .admin_response
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        UPDATE feedback SET
            status = $2,
            admin_response = COALESCE($3, admin_response),
            responded_by = CASE WHEN $3::text IS NULL THEN responded_by ELSE $4 END,
            responded_at = CASE WHEN $3::text IS NULL THEN responded_at ELSE now() END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(feedback_id)
    .bind(status)
    .bind(response)
    .bind(admin.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound("Feedback not found"))?;

    info!(admin_id = %admin.user_id, status = ?feedback.status, "Feedback moderated");
    Ok(Json(DataResponse::with_message(
        "Feedback status updated successfully",
        feedback,
    )))
}

/// DELETE /api/feedback/{id}
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %feedback_id))]
pub async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    AxumPath(feedback_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let deleted = sqlx::query("DELETE FROM feedback WHERE id = $1")
        .bind(feedback_id)
        .execute(&state.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Feedback not found"));
    }
    info!("Feedback deleted");
    Ok(Json(MessageResponse::new("Feedback deleted successfully")))
}
