//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use tracing::{debug, info};

use roster_core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use roster_core::error::RosterError;
use roster_core::types::{RegisterUser, UserFilter};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// Header carrying the logged-in user's key.
pub const LOGIN_ID_HEADER: &str = "x-login-id";

fn login_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(LOGIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthenticated(format!("missing {} header", LOGIN_ID_HEADER)))
}

/// POST /api/v1/users
///
/// Registers the caller identified by `x-login-id`. A registration already in
/// flight for the same key is reported as success.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let user_key = login_id(&headers)?;
    let request = RegisterUser::new(user_key.as_str(), req.invitor_no);

    let user_key = state.service.register(request, &user_key).await?;

    info!(%user_key, "Registration accepted");
    Ok(Json(RegisterResponse { user_key }))
}

/// GET /api/v1/users/:user_key
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_key): Path<String>,
) -> Result<Json<UserDto>> {
    let record = state
        .service
        .query_by_key(&user_key)
        .await?
        .ok_or_else(|| ApiError::from(RosterError::NotFound(user_key)))?;

    Ok(Json(record.into()))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>> {
    let page_number = params.page.unwrap_or(1);
    if page_number < 1 {
        return Err(ApiError::validation("page must be at least 1"));
    }
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ApiError::validation(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let filter = UserFilter {
        display_name: params.display_name,
        invitor_no: params.invitor_no,
        ..UserFilter::active()
    };

    let page = state.service.list_page(&filter, page_number, page_size).await?;
    debug!(total = page.total, "Listed users");

    let page_count = page.page_count();
    Ok(Json(ListUsersResponse {
        page: page.page_num,
        page_size: page.page_size,
        total: page.total,
        page_count,
        items: page.items.into_iter().map(UserDto::from).collect(),
    }))
}

/// DELETE /api/v1/users/:user_key
///
/// Callers may delete their own record; deleting anyone else requires a
/// login id listed in `ADMIN_LOGIN_IDS`.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_key): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    let actor = login_id(&headers)?;
    if !state.config.may_remove(&actor, &user_key) {
        debug!(%user_key, %actor, "Delete refused");
        return Err(ApiError::forbidden(format!("{} may not delete {}", actor, user_key)));
    }

    if !state.service.remove(&user_key, &actor).await? {
        return Err(RosterError::NotFound(user_key).into());
    }

    info!(%user_key, %actor, "User deleted");
    Ok(Json(DeleteUserResponse {
        user_key,
        deleted: true,
    }))
}

/// GET /api/v1/users/stats
pub async fn get_user_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let users = state.service.statistics().await?;

    Ok(Json(StatsResponse {
        users,
        cache: state.cache.as_ref().map(|c| c.stats()),
    }))
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let users_count = state
        .service
        .statistics()
        .await
        .map(|s| s.active)
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        users_count,
        cache_enabled: state.service.is_cached(),
    })
}
