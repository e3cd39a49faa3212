use axum::{Json, Router, extract::State, routing::get};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, OrderWithItems},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::{
        extract::{ApiPath, ApiQuery},
        params::AdminOrderQuery,
    },
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route(
            "/orders/{id}",
            get(get_order_admin).delete(delete_order_admin),
        )
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(AdminOrderQuery),
    responses(
        (status = 200, description = "All orders with line items (admin)", body = ApiResponse<OrderList>),
        (status = 400, description = "Unsupported sort field"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<AdminOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let page = admin_service::list_all_orders(&state, &user, query).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success(
        "Orders",
        OrderList { items: page.items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let order = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(ApiResponse::success(
        "Order found",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    admin_service::delete_order_admin(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Order deleted", id, None)))
}
