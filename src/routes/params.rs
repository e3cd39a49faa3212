use sea_orm::Order;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    entity::{orders, products},
    error::{AppError, AppResult},
};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl Pagination {
    /// Returns `(page, limit, offset)` with page ≥ 1 and limit in 1..=100.
    /// The offset must fit a signed 64-bit SQL integer.
    pub fn normalize(&self) -> AppResult<(u64, u64, u64)> {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| AppError::InvalidArgument(format!("page {page} is out of range")))?;
        Ok((page, limit, offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` sorts ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortBy {
    Id,
    Name,
    Price,
    Rating,
    CreatedAt,
}

impl ProductSortBy {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("created_at") => Ok(Self::CreatedAt),
            Some("id") => Ok(Self::Id),
            Some("name") => Ok(Self::Name),
            Some("price") => Ok(Self::Price),
            Some("rating") => Ok(Self::Rating),
            Some(other) => Err(AppError::InvalidArgument(format!(
                "unsupported sort field: {other}"
            ))),
        }
    }

    pub fn column(self) -> products::Column {
        match self {
            Self::Id => products::Column::Id,
            Self::Name => products::Column::Name,
            Self::Price => products::Column::Price,
            Self::Rating => products::Column::Rating,
            Self::CreatedAt => products::Column::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortBy {
    Id,
    UserId,
    CreatedAt,
}

impl OrderSortBy {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("created_at") => Ok(Self::CreatedAt),
            Some("id") => Ok(Self::Id),
            Some("user_id") => Ok(Self::UserId),
            Some(other) => Err(AppError::InvalidArgument(format!(
                "unsupported sort field: {other}"
            ))),
        }
    }

    pub fn column(self) -> orders::Column {
        match self {
            Self::Id => orders::Column::Id,
            Self::UserId => orders::Column::UserId,
            Self::CreatedAt => orders::Column::CreatedAt,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive substring match on the product name.
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    /// One of `id`, `name`, `price`, `rating`, `created_at`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminOrderQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    /// One of `id`, `user_id`, `created_at`.
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl AdminOrderQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceRangeQuery {
    pub min: i64,
    pub max: i64,
}
