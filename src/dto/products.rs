use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub price: i64,
    #[serde(default)]
    pub manufacturer: String,
}

/// Partial update. Rating is derived from reviews and cannot be written.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<i64>,
    pub manufacturer: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateManufacturerRequest {
    pub manufacturer: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManufacturerUpdated {
    pub updated: u64,
}

#[derive(Debug, Serialize, ToSchema, FromQueryResult)]
pub struct ManufacturerCount {
    pub manufacturer: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManufacturerCountList {
    pub items: Vec<ManufacturerCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}
