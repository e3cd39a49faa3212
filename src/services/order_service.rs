use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Alias, Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit,
    db,
    dto::orders::{CreateOrderRequest, OrderItemRequest, OrderWithItems},
    entity::{
        OrderProducts, Orders, Products,
        order_products::{self, Column as ItemCol},
        orders::{self as order_entity, Column as OrderCol},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Requirement, authorize},
    models::{Order, OrderLineItem},
    state::AppState,
};

/// Row predicate for an order under `requirement`. An ownership requirement
/// becomes part of the query, so a foreign order is indistinguishable from a
/// missing one.
pub(crate) fn order_condition(order_id: Uuid, requirement: Requirement) -> Condition {
    let condition = Condition::all().add(OrderCol::Id.eq(order_id));
    match requirement {
        Requirement::Owner(owner) => condition.add(OrderCol::UserId.eq(owner)),
        Requirement::Role(_) => condition,
    }
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    requirement: Requirement,
) -> AppResult<order_entity::Model> {
    Orders::find()
        .filter(order_condition(order_id, requirement))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn ensure_product_exists<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<()> {
    match Products::find_by_id(product_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::InvalidReference(format!(
            "product {product_id} does not exist"
        ))),
    }
}

fn ensure_positive_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::InvalidArgument(
            "quantity must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Insert the line item or add `quantity` to the existing one in a single
/// statement.
async fn upsert_line_item<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let item = order_products::ActiveModel {
        order_id: Set(order_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
    };

    OrderProducts::insert(item)
        .on_conflict(
            OnConflict::columns([ItemCol::OrderId, ItemCol::ProductId])
                .value(
                    ItemCol::Quantity,
                    Expr::col((OrderProducts, ItemCol::Quantity))
                        .add(Expr::col((Alias::new("excluded"), ItemCol::Quantity))),
                )
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

async fn find_line_item<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    product_id: Uuid,
) -> AppResult<OrderLineItem> {
    OrderProducts::find_by_id((order_id, product_id))
        .find_also_related(Products)
        .one(conn)
        .await?
        .map(OrderLineItem::from)
        .ok_or(AppError::NotFound)
}

pub(crate) async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderLineItem>> {
    let rows = OrderProducts::find()
        .filter(ItemCol::OrderId.eq(order_id))
        .find_also_related(Products)
        .order_by_asc(ItemCol::ProductId)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(OrderLineItem::from).collect())
}

pub(crate) async fn fetch_order_with_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    requirement: Requirement,
) -> AppResult<OrderWithItems> {
    let order = find_order(conn, order_id, requirement).await?;
    let items = load_items(conn, order.id).await?;
    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

async fn insert_order(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    items: &[OrderItemRequest],
) -> AppResult<OrderWithItems> {
    let order = order_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await?;

    for item in items {
        ensure_product_exists(txn, item.product_id).await?;
        upsert_line_item(txn, order.id, item.product_id, item.quantity).await?;
    }

    let items = load_items(txn, order.id).await?;
    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<OrderWithItems> {
    authorize(user, Requirement::Owner(user.user_id))?;
    for item in &payload.items {
        ensure_positive_quantity(item.quantity)?;
    }

    let txn = state.orm.begin().await?;
    let result = insert_order(&txn, user.user_id, &payload.items).await;
    let created = db::finish(txn, result).await?;

    tracing::info!(
        order_id = %created.order.id,
        user_id = %user.user_id,
        items = created.items.len(),
        "order created"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": created.order.id }),
    )
    .await;

    Ok(created)
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderWithItems> {
    let requirement = Requirement::Owner(user.user_id);
    authorize(user, requirement)?;
    fetch_order_with_items(&state.orm, order_id, requirement).await
}

/// Every order of the caller, oldest first, each with its line items.
pub async fn list_user_orders(state: &AppState, user: &AuthUser) -> AppResult<Vec<OrderWithItems>> {
    authorize(user, Requirement::Owner(user.user_id))?;

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_asc(OrderCol::CreatedAt)
        .order_by_asc(OrderCol::Id)
        .all(&state.orm)
        .await?;
    attach_items(&state.orm, orders).await
}

/// Loads the line items of `orders` in one query and pairs them up, keeping
/// the order of `orders`.
pub(crate) async fn attach_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order_entity::Model>,
) -> AppResult<Vec<OrderWithItems>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
    for row in OrderProducts::find()
        .filter(ItemCol::OrderId.is_in(order_ids))
        .find_also_related(Products)
        .order_by_asc(ItemCol::ProductId)
        .all(conn)
        .await?
    {
        let item = OrderLineItem::from(row);
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems {
                order: Order::from(order),
                items,
            }
        })
        .collect())
}

async fn add_line_item(
    txn: &DatabaseTransaction,
    owner: Uuid,
    order_id: Uuid,
    item: &OrderItemRequest,
) -> AppResult<OrderLineItem> {
    find_order(txn, order_id, Requirement::Owner(owner)).await?;
    ensure_product_exists(txn, item.product_id).await?;
    upsert_line_item(txn, order_id, item.product_id, item.quantity).await?;
    find_line_item(txn, order_id, item.product_id).await
}

/// Add `quantity` of a product to an order, merging with an existing line item.
pub async fn add_product_to_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: OrderItemRequest,
) -> AppResult<OrderLineItem> {
    authorize(user, Requirement::Owner(user.user_id))?;
    ensure_positive_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let result = add_line_item(&txn, user.user_id, order_id, &payload).await;
    let item = db::finish(txn, result).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_item_add",
        "orders",
        serde_json::json!({
            "order_id": order_id,
            "product_id": payload.product_id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    Ok(item)
}

async fn set_line_item_quantity(
    txn: &DatabaseTransaction,
    owner: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<OrderLineItem> {
    find_order(txn, order_id, Requirement::Owner(owner)).await?;

    let updated = OrderProducts::update_many()
        .col_expr(ItemCol::Quantity, Expr::value(quantity))
        .filter(ItemCol::OrderId.eq(order_id))
        .filter(ItemCol::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    find_line_item(txn, order_id, product_id).await
}

pub async fn update_line_item_quantity(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<OrderLineItem> {
    authorize(user, Requirement::Owner(user.user_id))?;
    ensure_positive_quantity(quantity)?;

    let txn = state.orm.begin().await?;
    let result = set_line_item_quantity(&txn, user.user_id, order_id, product_id, quantity).await;
    let item = db::finish(txn, result).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_item_update",
        "orders",
        serde_json::json!({
            "order_id": order_id,
            "product_id": product_id,
            "quantity": quantity,
        }),
    )
    .await;

    Ok(item)
}

/// Removing a product the order does not contain is a no-op.
pub async fn remove_line_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    product_id: Uuid,
) -> AppResult<()> {
    let requirement = Requirement::Owner(user.user_id);
    authorize(user, requirement)?;
    find_order(&state.orm, order_id, requirement).await?;

    let deleted = OrderProducts::delete_many()
        .filter(ItemCol::OrderId.eq(order_id))
        .filter(ItemCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if deleted.rows_affected > 0 {
        audit::record(
            &state.orm,
            user.user_id,
            "order_item_remove",
            "orders",
            serde_json::json!({ "order_id": order_id, "product_id": product_id }),
        )
        .await;
    }

    Ok(())
}

async fn delete_order_rows(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    requirement: Requirement,
) -> AppResult<u64> {
    find_order(txn, order_id, requirement).await?;

    let items = OrderProducts::delete_many()
        .filter(ItemCol::OrderId.eq(order_id))
        .exec(txn)
        .await?;
    Orders::delete_by_id(order_id).exec(txn).await?;

    Ok(items.rows_affected)
}

/// Delete an order and its line items as one unit of work.
pub(crate) async fn delete_order_scoped(
    state: &AppState,
    actor: &AuthUser,
    order_id: Uuid,
    requirement: Requirement,
) -> AppResult<()> {
    authorize(actor, requirement)?;

    let txn = state.orm.begin().await?;
    let result = delete_order_rows(&txn, order_id, requirement).await;
    let removed_items = db::finish(txn, result).await?;

    tracing::info!(
        order_id = %order_id,
        actor = %actor.user_id,
        removed_items,
        "order deleted"
    );
    audit::record(
        &state.orm,
        actor.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": order_id }),
    )
    .await;

    Ok(())
}

pub async fn delete_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<()> {
    delete_order_scoped(state, user, order_id, Requirement::Owner(user.user_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn owner_condition_scopes_by_user() {
        let owner = Uuid::new_v4();
        let sql = Orders::find()
            .filter(order_condition(Uuid::new_v4(), Requirement::Owner(owner)))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""orders"."user_id" = "#));
        assert!(sql.contains(&owner.to_string()));
    }

    #[test]
    fn role_condition_matches_any_owner() {
        let sql = Orders::find()
            .filter(order_condition(Uuid::new_v4(), Requirement::Role(Role::Admin)))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("user_id\" ="));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert!(ensure_positive_quantity(1).is_ok());
        assert!(matches!(
            ensure_positive_quantity(0),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(ensure_positive_quantity(-3).is_err());
    }
}
