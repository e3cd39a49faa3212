use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Func, LikeExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    db,
    dto::products::{CreateProductRequest, ManufacturerCount, UpdateProductRequest},
    entity::{
        Categories, OrderProducts, Products, Reviews, order_products,
        products::{ActiveModel, Column},
        reviews,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::Page,
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

fn validate_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::InvalidArgument(
            "price must be greater than zero".into(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidArgument("name must not be empty".into()));
    }
    Ok(name.to_owned())
}

pub(crate) async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> AppResult<()> {
    match Categories::find_by_id(category_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::InvalidReference(format!(
            "category {category_id} does not exist"
        ))),
    }
}

const LIKE_ESCAPE: char = '!';

/// `%term%` with the LIKE wildcards in `term` matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<Page<Product>> {
    let (page, limit, offset) = query.pagination().normalize()?;
    let sort_by = ProductSortBy::parse(query.sort.as_deref())?;
    let sort_order = SortOrder::parse(query.order.as_deref());

    let mut condition = Condition::all();
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = LikeExpr::new(contains_pattern(&name.to_lowercase())).escape(LIKE_ESCAPE);
        condition = condition.add(Expr::expr(Func::lower(Expr::col(Column::Name))).like(pattern));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    let mut finder = Products::find()
        .filter(condition)
        .order_by(sort_by.column(), sort_order.as_order());
    if sort_by != ProductSortBy::Id {
        finder = finder.order_by_asc(Column::Id);
    }

    db::with_deadline(state.read_timeout, async {
        let total = finder.clone().count(&state.orm).await?;
        let items = finder
            .limit(limit)
            .offset(offset)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();
        Ok::<_, AppError>(Page {
            items,
            page,
            limit,
            total,
        })
    })
    .await
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or(AppError::NotFound)
}

/// Products priced within `[min, max]`, cheapest first.
pub async fn products_by_price_range(state: &AppState, min: i64, max: i64) -> AppResult<Vec<Product>> {
    if min < 0 || max < 0 {
        return Err(AppError::InvalidArgument(
            "price bounds must not be negative".into(),
        ));
    }
    if min > max {
        return Err(AppError::InvalidArgument(
            "min price must not exceed max price".into(),
        ));
    }

    let products = Products::find()
        .filter(Column::Price.between(min, max))
        .order_by_asc(Column::Price)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(products)
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;
    let name = validate_name(&payload.name)?;
    validate_price(payload.price)?;
    ensure_category_exists(&state.orm, payload.category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        category_id: Set(payload.category_id),
        price: Set(payload.price),
        manufacturer: Set(payload.manufacturer.trim().to_owned()),
        rating: Set(0.0),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(Product::from(product))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;
    // Validate everything before touching the row so a rejected update changes nothing.
    let name = payload.name.as_deref().map(validate_name).transpose()?;
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(category_id) = payload.category_id {
        if category_id != existing.category_id {
            ensure_category_exists(&state.orm, category_id).await?;
        }
    }

    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(manufacturer) = payload.manufacturer {
        active.manufacturer = Set(manufacturer.trim().to_owned());
    }

    if !active.is_changed() {
        return Ok(Product::from(existing));
    }
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(Product::from(product))
}

async fn delete_unreferenced_product(txn: &DatabaseTransaction, id: Uuid) -> AppResult<()> {
    Products::find_by_id(id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let line_items = OrderProducts::find()
        .filter(order_products::Column::ProductId.eq(id))
        .count(txn)
        .await?;
    if line_items > 0 {
        return Err(AppError::InvalidState(format!(
            "product is referenced by {line_items} order line item(s)"
        )));
    }

    let reviews = Reviews::find()
        .filter(reviews::Column::ProductId.eq(id))
        .count(txn)
        .await?;
    if reviews > 0 {
        return Err(AppError::InvalidState(format!(
            "product has {reviews} review(s)"
        )));
    }

    Products::delete_by_id(id).exec(txn).await?;
    Ok(())
}

/// Delete a product that no order line item or review points at.
pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let result = delete_unreferenced_product(&txn, id).await;
    db::finish(txn, result).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(())
}

/// Overwrite the manufacturer of every product. Returns the number of rows changed.
pub async fn update_all_manufacturers(
    state: &AppState,
    user: &AuthUser,
    manufacturer: &str,
) -> AppResult<u64> {
    ensure_admin(user)?;
    let manufacturer = manufacturer.trim();
    if manufacturer.is_empty() {
        return Err(AppError::InvalidArgument(
            "manufacturer must not be empty".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let result = Products::update_many()
        .col_expr(Column::Manufacturer, Expr::value(manufacturer))
        .exec(&txn)
        .await
        .map(|res| res.rows_affected)
        .map_err(AppError::from);
    let updated = db::finish(txn, result).await?;

    tracing::info!(manufacturer, updated, "manufacturer rewritten for all products");
    audit::record(
        &state.orm,
        user.user_id,
        "product_manufacturer_bulk_update",
        "products",
        serde_json::json!({ "manufacturer": manufacturer, "updated": updated }),
    )
    .await;

    Ok(updated)
}

pub async fn count_by_manufacturer(state: &AppState) -> AppResult<Vec<ManufacturerCount>> {
    let counts = Products::find()
        .select_only()
        .column(Column::Manufacturer)
        .column_as(Expr::col(Column::Id).count(), "count")
        .group_by(Column::Manufacturer)
        .order_by_asc(Column::Manufacturer)
        .into_model::<ManufacturerCount>()
        .all(&state.orm)
        .await?;
    Ok(counts)
}
