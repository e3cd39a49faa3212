use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    db,
    dto::reviews::CreateReviewRequest,
    entity::{
        Products, Reviews, products,
        reviews::{ActiveModel, Column},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Requirement, authorize},
    models::Review,
    state::AppState,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidArgument(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

fn mean_rating(sum: Option<i64>, count: i64) -> f64 {
    match (sum, count) {
        (Some(sum), count) if count > 0 => sum as f64 / count as f64,
        _ => 0.0,
    }
}

/// Product row locked for the rest of the transaction, so concurrent reviews
/// of one product recompute its rating one after another.
fn lock_product(product_id: Uuid) -> Select<Products> {
    Products::find_by_id(product_id).lock_exclusive()
}

/// Recompute the product rating from all of its reviews.
async fn refresh_product_rating(txn: &DatabaseTransaction, product_id: Uuid) -> AppResult<f64> {
    let (sum, count) = Reviews::find()
        .select_only()
        .column_as(Expr::col(Column::Rating).sum(), "rating_sum")
        .column_as(Expr::col(Column::Id).count(), "rating_count")
        .filter(Column::ProductId.eq(product_id))
        .into_tuple::<(Option<i64>, i64)>()
        .one(txn)
        .await?
        .unwrap_or((None, 0));
    let rating = mean_rating(sum, count);

    Products::update_many()
        .col_expr(products::Column::Rating, Expr::value(rating))
        .filter(products::Column::Id.eq(product_id))
        .exec(txn)
        .await?;

    Ok(rating)
}

async fn insert_review(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<(Review, f64)> {
    if lock_product(product_id).one(txn).await?.is_none() {
        return Err(AppError::InvalidReference(format!(
            "product {product_id} does not exist"
        )));
    }

    let existing = Reviews::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .one(txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "product already reviewed by this user".into(),
        ));
    }

    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        review_text: Set(payload.review_text),
        rating: Set(payload.rating),
        user_id: Set(user_id),
        product_id: Set(product_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await?;

    let rating = refresh_product_rating(txn, product_id).await?;
    Ok((Review::from(review), rating))
}

/// Store a review and fold it into the product rating atomically.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<Review> {
    authorize(user, Requirement::Owner(user.user_id))?;
    validate_rating(payload.rating)?;

    let txn = state.orm.begin().await?;
    let result = insert_review(&txn, user.user_id, product_id, payload).await;
    let (review, rating) = db::finish(txn, result).await?;

    tracing::debug!(product_id = %product_id, rating, "product rating recomputed");
    audit::record(
        &state.orm,
        user.user_id,
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id }),
    )
    .await;

    Ok(review)
}

pub async fn list_product_reviews(state: &AppState, product_id: Uuid) -> AppResult<Vec<Review>> {
    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let reviews = Reviews::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();
    Ok(reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn mean_of_no_reviews_is_zero() {
        assert_eq!(mean_rating(None, 0), 0.0);
        assert_eq!(mean_rating(Some(9), 2), 4.5);
    }

    #[test]
    fn product_row_is_locked_before_recompute() {
        let sql = lock_product(Uuid::new_v4())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("FOR UPDATE"));
    }
}
