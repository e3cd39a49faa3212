use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, RegisterRequest, TokenResponse},
        categories::{
            CategoryList, CategoryWithProducts, CreateCategoryRequest, UpdateCategoryRequest,
        },
        orders::{
            CreateOrderRequest, OrderItemRequest, OrderList, OrderWithItems,
            UpdateQuantityRequest,
        },
        products::{
            CreateProductRequest, ManufacturerCount, ManufacturerCountList, ManufacturerUpdated,
            ProductList, UpdateManufacturerRequest, UpdateProductRequest,
        },
        reviews::{CreateReviewRequest, ReviewList},
        users::{UpdatePasswordRequest, UpdateRoleRequest, UpdateUsernameRequest, UserList},
    },
    models::{Category, Order, OrderLineItem, Product, Review, Role, User},
    response::Meta,
    routes::{admin, auth, categories, health, orders, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        products::list_products,
        products::get_product,
        products::products_by_price_range,
        products::count_by_manufacturer,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::update_all_manufacturers,
        products::list_reviews,
        products::create_review,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::delete_order,
        orders::add_product,
        orders::update_quantity,
        orders::remove_product,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::delete_order_admin,
        users::get_me,
        users::update_username,
        users::update_password,
        users::delete_me,
        users::list_users,
        users::get_user,
        users::delete_user,
        users::update_role
    ),
    components(
        schemas(
            Role,
            User,
            Category,
            Product,
            Review,
            Order,
            OrderLineItem,
            RegisterRequest,
            LoginRequest,
            TokenResponse,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateManufacturerRequest,
            ManufacturerUpdated,
            ManufacturerCount,
            ManufacturerCountList,
            ProductList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryWithProducts,
            CategoryList,
            CreateReviewRequest,
            ReviewList,
            CreateOrderRequest,
            OrderItemRequest,
            UpdateQuantityRequest,
            OrderWithItems,
            OrderList,
           
            UpdateUsernameRequest,
            UpdatePasswordRequest,
            UpdateRoleRequest,
            UserList,
            Meta
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and credential refresh"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin order endpoints"),
        (name = "Users", description = "Account endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
