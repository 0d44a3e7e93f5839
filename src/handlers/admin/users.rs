//! # Admin User Management
//!
//! Paginated search over accounts, account statistics and per-user actions.
//! Admins cannot delete their own account or change their own role.

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

use super::super::response::{DataResponse, MessageResponse};
use super::super::user::{UpdateUserRequest, update_user_record};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AppState, Page, PaginatedResponse, Pagination, Role, SortOrder, User, UserProfile};
use crate::utils::constant::RECENT_WINDOW;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub admin_users: i64,
    pub regular_users: i64,
    pub google_users: i64,
    pub local_users: i64,
    pub recent_users: i64,
}

/// Maps a `sortBy` value to its column. Unknown keys sort by creation time.
fn user_sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("name") => "name",
        Some("email") => "email",
        Some("updatedAt") => "updated_at",
        Some("lastLogin") => "last_login",
        Some("role") => "role",
        _ => "created_at",
    }
}

/// Turns free text into an `ILIKE` pattern matching it anywhere, with the
/// wildcard characters escaped.
pub(super) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
    builder.push(" WHERE TRUE");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role);
    }
}

/// Lists accounts with search, role filter and sorting.
///
/// GET /api/users/all ?page=1&limit=10&search=ann&role=user&sortBy=name&sortOrder=asc
///
/// # Returns
///
/// - `200 OK` with [`PaginatedResponse<User>`]
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_all_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> AppResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_user_filters(&mut count, &query);
    let total: i64 = count.build_query_scalar().fetch_one(&state.db_pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM users");
    push_user_filters(&mut select, &query);
    select
        .push(" ORDER BY ")
        .push(user_sort_column(query.sort_by.as_deref()))
        .push(" ")
        .push(query.sort_order.as_sql())
        .push(" NULLS LAST, id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let users: Vec<User> = select.build_query_as().fetch_all(&state.db_pool).await?;

    debug!(total, returned = users.len(), "Users listed");
    Ok(Json(PaginatedResponse {
        success: true,
        data: users,
        pagination: Pagination::new(page, total),
    }))
}

/// GET /api/users/stats
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_user_stats(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let since = OffsetDateTime::now_utc() - RECENT_WINDOW;
    let stats = sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            COUNT(*) AS total_users,
            COUNT(*) FILTER (WHERE role = 'admin') AS admin_users,
            COUNT(*) FILTER (WHERE role = 'user') AS regular_users,
            COUNT(*) FILTER (WHERE provider = 'google') AS google_users,
            COUNT(*) FILTER (WHERE provider = 'local') AS local_users,
            COUNT(*) FILTER (WHERE created_at >= $1) AS recent_users
        FROM users
        "#,
    )
    .bind(since)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(Json(DataResponse::new(stats)))
}

/// GET /api/users/{id}
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %user_id))]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    AxumPath(user_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let profile = UserProfile::load(&state.db_pool, user_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/users/{id}
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %user_id))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AxumPath(user_id): AxumPath<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = update_user_record(&state.db_pool, user_id, &payload).await?;
    info!("User updated by admin");
    Ok(Json(DataResponse::with_message(
        "User updated successfully",
        profile,
    )))
}

/// Deletes an account together with its addresses, cart and favorites.
///
/// DELETE /api/users/{id}
///
/// # Returns
///
/// - `200 OK` - Account deleted
/// - `400 Bad Request` - Admin tried to delete their own account
/// - `404 Not Found` - No such user
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %user_id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AxumPath(user_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    if admin.user_id == user_id {
        warn!("Admin attempted to delete their own account");
        return Err(AppError::BadRequest("Cannot delete your own account"));
    }

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found"));
    }

    info!(admin_id = %admin.user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// PATCH /api/users/{id}/role
///
/// # Returns
///
/// - `200 OK` with the updated user
/// - `400 Bad Request` - Role is not `user` or `admin`, or targets the caller
/// - `404 Not Found` - No such user
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %user_id))]
pub async fn change_user_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    AxumPath(user_id): AxumPath<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let role = payload
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or(AppError::BadRequest(
            "Invalid role. Must be \"user\" or \"admin\"",
        ))?;

    if admin.user_id == user_id {
        warn!("Admin attempted to change their own role");
        return Err(AppError::BadRequest("Cannot change your own role"));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(role)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound("User not found"))?;

    info!(admin_id = %admin.user_id, %role, "User role changed");
    Ok(Json(DataResponse::with_message(
        "User role updated successfully",
        user,
    )))
}
