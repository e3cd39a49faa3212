use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    entity::{Orders, orders::Column as OrderCol},
    error::AppResult,
    middleware::auth::{AuthUser, Requirement, ensure_admin},
    models::Role,
    response::Page,
    routes::params::{AdminOrderQuery, OrderSortBy, SortOrder},
    services::order_service,
    state::AppState,
};

const ADMIN: Requirement = Requirement::Role(Role::Admin);

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<Page<OrderWithItems>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize()?;
    let sort_by = OrderSortBy::parse(query.sort.as_deref())?;
    let sort_order = SortOrder::parse(query.order.as_deref());

    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(order_id) = query.order_id {
        condition = condition.add(OrderCol::Id.eq(order_id));
    }

    let mut finder = Orders::find()
        .filter(condition)
        .order_by(sort_by.column(), sort_order.as_order());
    if sort_by != OrderSortBy::Id {
        finder = finder.order_by_asc(OrderCol::Id);
    }

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?;
    let items = order_service::attach_items(&state.orm, orders).await?;

    Ok(Page {
        items,
        page,
        limit,
        total,
    })
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderWithItems> {
    ensure_admin(user)?;
    order_service::fetch_order_with_items(&state.orm, order_id, ADMIN).await
}

pub async fn delete_order_admin(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<()> {
    order_service::delete_order_scoped(state, user, order_id, ADMIN).await
}
