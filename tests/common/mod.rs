#![allow(dead_code)]

use std::time::Duration;

use axum_storefront_api::{
    db::run_migrations,
    entity::{categories, products, users},
    middleware::auth::AuthUser,
    models::Role,
    services::token_service::TokenKeys,
    state::AppState,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, Set};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Fresh in-memory SQLite store with every migration applied. A single
/// connection keeps the whole test on one database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    setup_state_with_timeout(Duration::from_secs(2)).await
}

pub async fn setup_state_with_timeout(read_timeout: Duration) -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;

    Ok(AppState::new(
        orm,
        TokenKeys::new(TEST_SECRET, chrono::Duration::minutes(10)),
        read_timeout,
    ))
}

/// Insert an account directly. The stored hash is not a valid argon2 string,
/// so these accounts cannot log in.
pub async fn create_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<AuthUser> {
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_owned()),
        password_hash: Set("not-a-hash".into()),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub async fn create_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        description: Set(String::new()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub async fn create_product(
    state: &AppState,
    category_id: Uuid,
    name: &str,
    price: i64,
    manufacturer: &str,
) -> anyhow::Result<Uuid> {
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        description: Set(format!("{name} description")),
        category_id: Set(category_id),
        price: Set(price),
        manufacturer: Set(manufacturer.to_owned()),
        rating: Set(0.0),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

/// Make every `event` statement on `table` abort, to force one step of a
/// transaction to fail.
pub async fn fail_on(state: &AppState, event: &str, table: &str) -> anyhow::Result<()> {
    let sql = format!(
        "CREATE TRIGGER fail_{event}_{table} BEFORE {event} ON {table} \
         BEGIN SELECT RAISE(ABORT, 'injected {event} failure'); END;"
    );
    state.orm.execute_unprepared(&sql).await?;
    Ok(())
}
