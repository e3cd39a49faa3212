use axum_storefront_api::{
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{Categories, Products, Users, categories, products, users},
    models::Role,
    services::auth_service::hash_password,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let orm = create_orm_conn(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&orm, "shopper", "user123", Role::User).await?;
    let category_id = ensure_category(&orm, "Merchandise", "Things for Rustaceans").await?;
    seed_products(&orm, category_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(orm)
        .await?
    {
        println!("User {username} already present (role={})", existing.role.as_str());
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_owned()),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {username} (role={})", role.as_str());
    Ok(user.id)
}

async fn ensure_category(orm: &OrmConn, name: &str, description: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(categories::Column::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        description: Set(description.to_owned()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn seed_products(orm: &OrmConn, category_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550000, "Tokio Textiles"),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120000, "Crab Ceramics"),
        ("Rust Sticker Pack", "Decorate your laptop", 50000, "Crab Ceramics"),
        ("E-book: Async Rust", "Learn async Rust patterns", 250000, "Borrowed Books"),
    ];

    for (name, desc, price, manufacturer) in products {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
            description: Set(desc.to_owned()),
            category_id: Set(category_id),
            price: Set(price),
            manufacturer: Set(manufacturer.to_owned()),
            rating: Set(0.0),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
