use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::users::{UpdatePasswordRequest, UpdateRoleRequest, UpdateUsernameRequest, UserList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::{
        extract::{ApiJson, ApiPath, ApiQuery},
        params::Pagination,
    },
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me).delete(delete_me))
        .route("/me/username", patch(update_username))
        .route("/me/password", patch(update_password))
        .route("/{id}", get(get_user).delete(delete_user))
        .route("/{id}/role", patch(update_role))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Account of the caller", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid credential")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let me = user_service::get_me(&state, &user).await?;
    Ok(Json(ApiResponse::success("User", me, None)))
}

#[utoipa::path(
    patch,
    path = "/api/users/me/username",
    request_body = UpdateUsernameRequest,
    responses(
        (status = 200, description = "Username changed", body = ApiResponse<User>),
        (status = 409, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_username(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdateUsernameRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let updated = user_service::update_username(&state, &user, &payload.username).await?;
    Ok(Json(ApiResponse::success("Username updated", updated, None)))
}

#[utoipa::path(
    patch,
    path = "/api/users/me/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 403, description = "Old password does not match")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    user_service::update_password(&state, &user, payload).await?;
    Ok(Json(ApiResponse::success(
        "Password updated",
        user.user_id,
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Account, orders and line items deleted"),
        (status = 403, description = "Admins cannot delete themselves")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    user_service::delete_self(&state, &user).await?;
    Ok(Json(ApiResponse::success(
        "Account deleted",
        user.user_id,
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(Pagination),
    responses(
        (status = 200, description = "All accounts (admin)", body = ApiResponse<UserList>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let page = user_service::list_users(&state, &user, pagination).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success(
        "Users",
        UserList { items: page.items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<User>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let found = user_service::get_user(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("User", found, None)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account, orders and line items deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Target is not a plain user")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    user_service::admin_delete_user(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("User deleted", id, None)))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<User>),
        (status = 400, description = "Unknown role"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let updated = user_service::update_user_role(&state, &user, id, payload.role).await?;
    Ok(Json(ApiResponse::success("Role updated", updated, None)))
}
