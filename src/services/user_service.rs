use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    db,
    dto::users::UpdatePasswordRequest,
    entity::{
        OrderProducts, Orders, Users, order_products, orders,
        users::{self, Column},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Requirement, authorize, ensure_admin},
    models::{Role, User},
    response::Page,
    routes::params::Pagination,
    services::auth_service::{hash_password, validate_password, validate_username, verify_password},
    state::AppState,
};

async fn find_user<C: sea_orm::ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Remove a user together with every order and line item it owns. Reviews
/// are kept.
async fn delete_user_cascade(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<u64> {
    let owned_orders = Orders::find()
        .select_only()
        .column(orders::Column::Id)
        .filter(orders::Column::UserId.eq(user_id))
        .into_query();

    OrderProducts::delete_many()
        .filter(order_products::Column::OrderId.in_subquery(owned_orders))
        .exec(txn)
        .await?;
    let removed_orders = Orders::delete_many()
        .filter(orders::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;
    Users::delete_by_id(user_id).exec(txn).await?;

    Ok(removed_orders.rows_affected)
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<User> {
    authorize(user, Requirement::Owner(user.user_id))?;
    find_user(&state.orm, user.user_id).await.map(User::from)
}

pub async fn update_username(state: &AppState, user: &AuthUser, username: &str) -> AppResult<User> {
    authorize(user, Requirement::Owner(user.user_id))?;
    let username = validate_username(username)?;

    let taken = Users::find()
        .filter(Column::Username.eq(username.as_str()))
        .filter(Column::Id.ne(user.user_id))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("username is already taken".into()));
    }

    let mut active: users::ActiveModel = find_user(&state.orm, user.user_id).await?.into();
    active.username = Set(username);
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "user_username_update",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(User::from(updated))
}

pub async fn update_password(
    state: &AppState,
    user: &AuthUser,
    payload: UpdatePasswordRequest,
) -> AppResult<()> {
    authorize(user, Requirement::Owner(user.user_id))?;
    validate_password(&payload.new_password)?;

    let existing = find_user(&state.orm, user.user_id).await?;
    if !verify_password(&payload.old_password, &existing.password_hash)? {
        return Err(AppError::Forbidden);
    }

    let mut active: users::ActiveModel = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "user_password_update",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(())
}

async fn delete_self_rows(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<u64> {
    let stored = find_user(txn, user_id).await?;
    // The stored role decides, not the one carried by the credential.
    if stored.role == Role::Admin {
        return Err(AppError::Forbidden);
    }
    delete_user_cascade(txn, user_id).await
}

pub async fn delete_self(state: &AppState, user: &AuthUser) -> AppResult<()> {
    authorize(user, Requirement::Owner(user.user_id))?;

    let txn = state.orm.begin().await?;
    let result = delete_self_rows(&txn, user.user_id).await;
    let removed_orders = db::finish(txn, result).await?;

    tracing::info!(user_id = %user.user_id, removed_orders, "account deleted by owner");
    audit::record(
        &state.orm,
        user.user_id,
        "user_delete_self",
        "users",
        serde_json::json!({ "user_id": user.user_id, "orders": removed_orders }),
    )
    .await;

    Ok(())
}

async fn delete_plain_user(txn: &DatabaseTransaction, target: Uuid) -> AppResult<u64> {
    let stored = find_user(txn, target).await?;
    if stored.role != Role::User {
        return Err(AppError::InvalidState(format!(
            "cannot delete an account with role {}",
            stored.role.as_str()
        )));
    }
    delete_user_cascade(txn, target).await
}

pub async fn admin_delete_user(state: &AppState, admin: &AuthUser, target: Uuid) -> AppResult<()> {
    ensure_admin(admin)?;

    let txn = state.orm.begin().await?;
    let result = delete_plain_user(&txn, target).await;
    let removed_orders = db::finish(txn, result).await?;

    tracing::info!(
        user_id = %target,
        admin_id = %admin.user_id,
        removed_orders,
        "account deleted by admin"
    );
    audit::record(
        &state.orm,
        admin.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": target, "orders": removed_orders }),
    )
    .await;

    Ok(())
}

/// Apply a role change allowed by [`Role::can_transition_to`].
pub async fn update_user_role(
    state: &AppState,
    admin: &AuthUser,
    target: Uuid,
    new_role: Role,
) -> AppResult<User> {
    ensure_admin(admin)?;

    let current = find_user(&state.orm, target).await?;
    if !current.role.can_transition_to(new_role) {
        return Err(AppError::InvalidState(format!(
            "role change from {} to {} is not allowed",
            current.role.as_str(),
            new_role.as_str()
        )));
    }

    // Only applies if nobody changed the role since it was read.
    let updated = Users::update_many()
        .col_expr(Column::Role, Expr::value(new_role))
        .filter(Column::Id.eq(target))
        .filter(Column::Role.eq(current.role))
        .exec(&state.orm)
        .await?;
    if updated.rows_affected == 0 {
        return Err(AppError::InvalidState(
            "role was changed concurrently".into(),
        ));
    }

    tracing::info!(user_id = %target, role = new_role.as_str(), "role updated");
    audit::record(
        &state.orm,
        admin.user_id,
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": target, "role": new_role }),
    )
    .await;

    find_user(&state.orm, target).await.map(User::from)
}

pub async fn list_users(
    state: &AppState,
    admin: &AuthUser,
    pagination: Pagination,
) -> AppResult<Page<User>> {
    ensure_admin(admin)?;
    let (page, limit, offset) = pagination.normalize()?;

    let finder = Users::find()
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(Page {
        items,
        page,
        limit,
        total,
    })
}

pub async fn get_user(state: &AppState, admin: &AuthUser, id: Uuid) -> AppResult<User> {
    ensure_admin(admin)?;
    find_user(&state.orm, id).await.map(User::from)
}
