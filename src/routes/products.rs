use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        products::{
            CreateProductRequest, ManufacturerCountList, ManufacturerUpdated, ProductList,
            UpdateManufacturerRequest, UpdateProductRequest,
        },
        reviews::{CreateReviewRequest, ReviewList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Product, Review},
    response::{ApiResponse, Meta},
    routes::{
        extract::{ApiJson, ApiPath, ApiQuery},
        params::{PriceRangeQuery, ProductQuery},
    },
    services::{product_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/price-range", get(products_by_price_range))
        .route("/count-by-manufacturer", get(count_by_manufacturer))
        .route("/manufacturer", put(update_all_manufacturers))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/reviews", get(list_reviews).post(create_review))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>),
        (status = 400, description = "Unsupported sort field"),
        (status = 504, description = "Listing exceeded the read deadline")
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let page = product_service::list_products(&state, query).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success(
        "Products",
        ProductList { items: page.items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(ApiResponse::success("Product", product, None)))
}

#[utoipa::path(
    get,
    path = "/api/products/price-range",
    params(PriceRangeQuery),
    responses(
        (status = 200, description = "Products priced within the range", body = ApiResponse<ProductList>),
        (status = 400, description = "Invalid bounds")
    ),
    tag = "Products"
)]
pub async fn products_by_price_range(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PriceRangeQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let items = product_service::products_by_price_range(&state, query.min, query.max).await?;
    Ok(Json(ApiResponse::success(
        "Products",
        ProductList { items },
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/count-by-manufacturer",
    responses(
        (status = 200, description = "Product count per manufacturer", body = ApiResponse<ManufacturerCountList>)
    ),
    tag = "Products"
)]
pub async fn count_by_manufacturer(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ManufacturerCountList>>> {
    let items = product_service::count_by_manufacturer(&state).await?;
    Ok(Json(ApiResponse::success(
        "Manufacturer counts",
        ManufacturerCountList { items },
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Product>),
        (status = 403, description = "Admin role required"),
        (status = 422, description = "Category does not exist")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = product_service::create_product(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Product created",
            product,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 400, description = "Invalid price or name"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(ApiResponse::success("Product updated", product, None)))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product is still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    product_service::delete_product(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Product deleted", id, None)))
}

#[utoipa::path(
    put,
    path = "/api/products/manufacturer",
    request_body = UpdateManufacturerRequest,
    responses(
        (status = 200, description = "Manufacturer set on every product", body = ApiResponse<ManufacturerUpdated>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_all_manufacturers(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdateManufacturerRequest>,
) -> AppResult<Json<ApiResponse<ManufacturerUpdated>>> {
    let updated =
        product_service::update_all_manufacturers(&state, &user, &payload.manufacturer).await?;
    Ok(Json(ApiResponse::success(
        "Manufacturer updated",
        ManufacturerUpdated { updated },
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Reviews of the product", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let items = review_service::list_product_reviews(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review stored and rating recomputed", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range"),
        (status = 409, description = "Product already reviewed by the caller"),
        (status = 422, description = "Product does not exist")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = review_service::create_review(&state, &user, id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review created", review, None)),
    ))
}
