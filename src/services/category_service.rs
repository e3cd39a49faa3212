use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db,
    dto::categories::{CategoryWithProducts, CreateCategoryRequest, UpdateCategoryRequest},
    entity::{
        Categories, Products,
        categories::{ActiveModel, Column},
        products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    state::AppState,
};

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidArgument(
            "category name must not be empty".into(),
        ));
    }
    Ok(name.to_owned())
}

pub async fn list_categories(state: &AppState) -> AppResult<Vec<Category>> {
    db::with_deadline(state.read_timeout, async {
        let categories = Categories::find()
            .order_by_asc(Column::Name)
            .order_by_asc(Column::Id)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(Category::from)
            .collect();
        Ok::<_, AppError>(categories)
    })
    .await
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<CategoryWithProducts> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let products = Products::find()
        .filter(products::Column::CategoryId.eq(id))
        .order_by_asc(products::Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(CategoryWithProducts {
        category: Category::from(category),
        products,
    })
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<Category> {
    ensure_admin(user)?;
    let name = validate_name(&payload.name)?;

    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(Category::from(category))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<Category> {
    ensure_admin(user)?;
    let name = payload.name.as_deref().map(validate_name).transpose()?;

    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if !active.is_changed() {
        return Ok(Category::from(existing));
    }
    let category = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(Category::from(category))
}

async fn delete_empty_category(txn: &DatabaseTransaction, id: Uuid) -> AppResult<()> {
    Categories::find_by_id(id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let products = Products::find()
        .filter(products::Column::CategoryId.eq(id))
        .count(txn)
        .await?;
    if products > 0 {
        return Err(AppError::InvalidState(format!(
            "category still holds {products} product(s)"
        )));
    }

    Categories::delete_by_id(id).exec(txn).await?;
    Ok(())
}

pub async fn delete_category(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let result = delete_empty_category(&txn, id).await;
    db::finish(txn, result).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(())
}
