use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderItemRequest, OrderList, OrderWithItems, UpdateQuantityRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderLineItem,
    response::{ApiResponse, Meta},
    routes::extract::{ApiJson, ApiPath},
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).delete(delete_order))
        .route("/{id}/products", post(add_product))
        .route(
            "/{id}/products/{product_id}",
            patch(update_quantity).delete(remove_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Orders of the caller with their line items", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let items = order_service::list_user_orders(&state, &user).await?;
    let total = items.len() as u64;
    Ok(Json(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Non-positive quantity"),
        (status = 422, description = "Unknown product")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithItems>>)> {
    let order = order_service::create_order(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Order created",
            order,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let order = order_service::get_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order and its line items deleted"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    order_service::delete_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Order deleted", id, None)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/products",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderItemRequest,
    responses(
        (status = 200, description = "Resulting line item", body = ApiResponse<OrderLineItem>),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Unknown product")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<OrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderLineItem>>> {
    let item = order_service::add_product_to_order(&state, &user, id, payload).await?;
    Ok(Json(ApiResponse::success("Product added", item, None)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated line item", body = ApiResponse<OrderLineItem>),
        (status = 404, description = "Order or line item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((id, product_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<OrderLineItem>>> {
    let item =
        order_service::update_line_item_quantity(&state, &user, id, product_id, payload.quantity)
            .await?;
    Ok(Json(ApiResponse::success("Quantity updated", item, None)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Line item removed (or was never there)"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn remove_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((id, product_id)): ApiPath<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    order_service::remove_line_item(&state, &user, id, product_id).await?;
    Ok(Json(ApiResponse::success("Product removed", product_id, None)))
}
