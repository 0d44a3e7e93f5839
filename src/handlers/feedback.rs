//! # Feedback Handlers
//!
//! Anyone can submit feedback; it becomes publicly visible only after an admin
//! approves it. Submissions carry the author's user id when a valid token is
//! sent along.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info, instrument, warn};

use super::response::DataResponse;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    AppState, Feedback, FeedbackStatus, Page, PaginatedResponse, Pagination, PublicFeedback, SortOrder,
};
use crate::utils::constant::FEEDBACK_TEXT_MAX_LEN;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedFeedbackQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub rating: Option<i16>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub name: Option<String>,
    pub rating: Option<i64>,
    pub text: Option<String>,
}

/// Maps a `sortBy` value to its column. Unknown keys sort by creation time.
pub(super) fn feedback_sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("rating") => "rating",
        Some("name") => "name",
        Some("updatedAt") => "updated_at",
        _ => "created_at",
    }
}

pub(super) fn push_feedback_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    status: Option<FeedbackStatus>,
    rating: Option<i16>,
) {
    builder.push(" WHERE TRUE");
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(rating) = rating {
        builder.push(" AND rating = ").push_bind(rating);
    }
}

/// Approved feedback, paginated.
///
/// GET /api/feedback/approved ?page=1&limit=10&rating=5&sortBy=rating&sortOrder=desc
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_approved_feedback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApprovedFeedbackQuery>,
) -> AppResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit);

    let status = Some(FeedbackStatus::Approved);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM feedback");
    push_feedback_filters(&mut count, status, query.rating);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db_pool).await?;

    let mut select =
        QueryBuilder::<Postgres>::new("SELECT id, name, rating, text, created_at FROM feedback");
    push_feedback_filters(&mut select, status, query.rating);
    select
        .push(" ORDER BY ")
        .push(feedback_sort_column(query.sort_by.as_deref()))
        .push(" ")
        .push(query.sort_order.as_sql())
        .push(", id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let feedback: Vec<PublicFeedback> = select.build_query_as().fetch_all(&state.db_pool).await?;

    debug!(total, returned = feedback.len(), "Approved feedback listed");
    Ok(Json(PaginatedResponse {
        success: true,
        data: feedback,
        pagination: Pagination::new(page, total),
    }))
}

/// Submits feedback for moderation.
///
/// POST /api/feedback/create
///
/// # Returns
///
/// - `201 Created` with the pending feedback
/// - `400 Bad Request` - Missing fields, rating outside 1-5, or text too long
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Json(payload): Json<CreateFeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    let text = payload.text.as_deref().map(str::trim).unwrap_or_default();
    let (false, false, Some(rating)) = (name.is_empty(), text.is_empty(), payload.rating) else {
        warn!("Feedback submitted with missing fields");
        return Err(AppError::BadRequest(
            "Missing required fields: name, rating, text",
        ));
    };

    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5"));
    }
    if text.chars().count() as u64 > FEEDBACK_TEXT_MAX_LEN {
        return Err(AppError::BadRequest(
            "Feedback text cannot exceed 1000 characters",
        ));
    }

    let user_id = user.map(|Extension(user)| user.user_id);

    let feedback = sqlx::query_as::<_, Feedback>(
        "INSERT INTO feedback (user_id, name, rating, text) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user_id)
    .bind(name)
    .bind(rating as i16)
    .bind(text)
    .fetch_one(&state.db_pool)
    .await?;

    info!(feedback_id = %feedback.id, authenticated = user_id.is_some(), "Feedback submitted");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "Feedback submitted successfully",
            feedback,
        )),
    ))
}
