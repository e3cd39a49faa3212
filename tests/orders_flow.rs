mod common;

use axum_storefront_api::{
    dto::orders::{CreateOrderRequest, OrderItemRequest},
    entity::{OrderProducts, Orders, order_products},
    error::AppError,
    models::Role,
    routes::params::AdminOrderQuery,
    services::{admin_service, order_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{create_category, create_product, create_user, fail_on, setup_state};

fn item(product_id: Uuid, quantity: i32) -> OrderItemRequest {
    OrderItemRequest {
        product_id,
        quantity,
    }
}

// Empty order -> add 2 -> add 3 -> set 1 -> delete, with nothing left behind.
#[tokio::test]
async fn order_lifecycle() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let product = create_product(&state, category, "Ferris Mug", 1200, "Crab").await?;

    let created =
        order_service::create_order(&state, &user, CreateOrderRequest { items: vec![] }).await?;
    assert!(created.items.is_empty());
    assert_eq!(created.order.user_id, user.user_id);
    let order_id = created.order.id;

    let line = order_service::add_product_to_order(&state, &user, order_id, item(product, 2)).await?;
    assert_eq!(line.quantity, 2);
    let line = order_service::add_product_to_order(&state, &user, order_id, item(product, 3)).await?;
    assert_eq!(line.quantity, 5);

    let fetched = order_service::get_order(&state, &user, order_id).await?;
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].quantity, 5);
    assert_eq!(
        fetched.items[0].product.as_ref().map(|p| p.name.as_str()),
        Some("Ferris Mug")
    );

    let line = order_service::update_line_item_quantity(&state, &user, order_id, product, 1).await?;
    assert_eq!(line.quantity, 1);

    order_service::delete_order(&state, &user, order_id).await?;
    assert!(matches!(
        order_service::get_order(&state, &user, order_id).await,
        Err(AppError::NotFound)
    ));
    let leftover = OrderProducts::find()
        .filter(order_products::Column::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(leftover, 0);
    Ok(())
}

#[tokio::test]
async fn create_order_merges_duplicate_products() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let cup = create_product(&state, category, "Cup", 800, "Crab").await?;

    let created = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 1), item(cup, 4), item(mug, 2)],
        },
    )
    .await?;

    assert_eq!(created.items.len(), 2);
    let mug_line = created.items.iter().find(|i| i.product_id == mug).unwrap();
    assert_eq!(mug_line.quantity, 3);
    Ok(())
}

#[tokio::test]
async fn create_order_with_unknown_product_leaves_nothing() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;

    let err = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 1), item(Uuid::new_v4(), 1)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));

    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderProducts::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;

    let err = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 0)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    let order = order_service::create_order(&state, &user, CreateOrderRequest::default()).await?;
    let order_id = order.order.id;
    assert!(matches!(
        order_service::add_product_to_order(&state, &user, order_id, item(mug, -1)).await,
        Err(AppError::InvalidArgument(_))
    ));

    order_service::add_product_to_order(&state, &user, order_id, item(mug, 2)).await?;
    assert!(matches!(
        order_service::update_line_item_quantity(&state, &user, order_id, mug, 0).await,
        Err(AppError::InvalidArgument(_))
    ));
    let fetched = order_service::get_order(&state, &user, order_id).await?;
    assert_eq!(fetched.items[0].quantity, 2);
    Ok(())
}

#[tokio::test]
async fn add_unknown_product_is_invalid_reference() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let order = order_service::create_order(&state, &user, CreateOrderRequest::default()).await?;

    let err = order_service::add_product_to_order(
        &state,
        &user,
        order.order.id,
        item(Uuid::new_v4(), 1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));
    Ok(())
}

#[tokio::test]
async fn foreign_orders_read_as_missing() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = create_user(&state, "ann", Role::User).await?;
    let other = create_user(&state, "bob", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;

    let order = order_service::create_order(
        &state,
        &owner,
        CreateOrderRequest {
            items: vec![item(mug, 1)],
        },
    )
    .await?;
    let order_id = order.order.id;

    assert!(matches!(
        order_service::get_order(&state, &other, order_id).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        order_service::add_product_to_order(&state, &other, order_id, item(mug, 1)).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        order_service::update_line_item_quantity(&state, &other, order_id, mug, 9).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        order_service::remove_line_item(&state, &other, order_id, mug).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        order_service::delete_order(&state, &other, order_id).await,
        Err(AppError::NotFound)
    ));

    // Absent and foreign look the same.
    assert!(matches!(
        order_service::get_order(&state, &other, Uuid::new_v4()).await,
        Err(AppError::NotFound)
    ));

    let untouched = order_service::get_order(&state, &owner, order_id).await?;
    assert_eq!(untouched.items[0].quantity, 1);
    assert!(order_service::list_user_orders(&state, &other).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_of_missing_line_item_is_not_found() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let order = order_service::create_order(&state, &user, CreateOrderRequest::default()).await?;

    assert!(matches!(
        order_service::update_line_item_quantity(&state, &user, order.order.id, mug, 3).await,
        Err(AppError::NotFound)
    ));
    // Removing something that was never there is fine.
    order_service::remove_line_item(&state, &user, order.order.id, mug).await?;
    Ok(())
}

#[tokio::test]
async fn remove_line_item_keeps_the_rest() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let cup = create_product(&state, category, "Cup", 800, "Crab").await?;
    let order = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 1), item(cup, 1)],
        },
    )
    .await?;

    order_service::remove_line_item(&state, &user, order.order.id, mug).await?;

    let fetched = order_service::get_order(&state, &user, order.order.id).await?;
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].product_id, cup);
    Ok(())
}

#[tokio::test]
async fn failed_line_item_delete_keeps_order_intact() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let order = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 4)],
        },
    )
    .await?;

    fail_on(&state, "DELETE", "order_products").await?;

    assert!(order_service::delete_order(&state, &user, order.order.id).await.is_err());

    let fetched = order_service::get_order(&state, &user, order.order.id).await?;
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].quantity, 4);
    Ok(())
}

#[tokio::test]
async fn user_order_listing_includes_items() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;

    let first = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            items: vec![item(mug, 2)],
        },
    )
    .await?;
    let second = order_service::create_order(&state, &user, CreateOrderRequest::default()).await?;

    let orders = order_service::list_user_orders(&state, &user).await?;
    assert_eq!(orders.len(), 2);
    let listed_first = orders.iter().find(|o| o.order.id == first.order.id).unwrap();
    assert_eq!(listed_first.items.len(), 1);
    let listed_second = orders.iter().find(|o| o.order.id == second.order.id).unwrap();
    assert!(listed_second.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_listing_filters_sorts_and_pages() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "root", Role::Admin).await?;
    let ann = create_user(&state, "ann", Role::User).await?;
    let bob = create_user(&state, "bob", Role::User).await?;

    for _ in 0..3 {
        order_service::create_order(&state, &ann, CreateOrderRequest::default()).await?;
    }
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let bob_order = order_service::create_order(
        &state,
        &bob,
        CreateOrderRequest {
            items: vec![item(mug, 2)],
        },
    )
    .await?;

    let all = admin_service::list_all_orders(&state, &admin, AdminOrderQuery::default()).await?;
    assert_eq!(all.total, 4);
    assert_eq!(all.items.len(), 4);
    assert_eq!((all.page, all.limit), (1, 10));
    let with_items: Vec<_> = all.items.iter().filter(|o| !o.items.is_empty()).collect();
    assert_eq!(with_items.len(), 1);
    assert_eq!(with_items[0].order.id, bob_order.order.id);
    assert_eq!(with_items[0].items[0].quantity, 2);
    assert_eq!(
        with_items[0].items[0].product.as_ref().map(|p| p.id),
        Some(mug)
    );

    let anns = admin_service::list_all_orders(
        &state,
        &admin,
        AdminOrderQuery {
            user_id: Some(ann.user_id),
            limit: Some(2),
            page: Some(2),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(anns.total, 3);
    assert_eq!(anns.items.len(), 1);
    assert!(anns.items.iter().all(|o| o.order.user_id == ann.user_id));

    let by_id = admin_service::list_all_orders(
        &state,
        &admin,
        AdminOrderQuery {
            order_id: Some(bob_order.order.id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_id.total, 1);
    assert_eq!(by_id.items[0].order.id, bob_order.order.id);
    assert_eq!(by_id.items[0].items.len(), 1);

    let desc = admin_service::list_all_orders(
        &state,
        &admin,
        AdminOrderQuery {
            sort: Some("id".into()),
            order: Some("desc".into()),
            ..Default::default()
        },
    )
    .await?;
    let ids: Vec<Uuid> = desc.items.iter().map(|o| o.order.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.reverse();
    assert_eq!(ids, sorted);

    let bad_sort = admin_service::list_all_orders(
        &state,
        &admin,
        AdminOrderQuery {
            sort: Some("total".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_sort, Err(AppError::InvalidArgument(_))));

    assert!(matches!(
        admin_service::list_all_orders(&state, &ann, AdminOrderQuery::default()).await,
        Err(AppError::Forbidden)
    ));
    Ok(())
}

#[tokio::test]
async fn admin_reads_and_deletes_any_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "root", Role::Admin).await?;
    let ann = create_user(&state, "ann", Role::User).await?;
    let category = create_category(&state, "Mugs").await?;
    let mug = create_product(&state, category, "Mug", 1200, "Crab").await?;
    let order = order_service::create_order(
        &state,
        &ann,
        CreateOrderRequest {
            items: vec![item(mug, 1)],
        },
    )
    .await?;

    assert!(matches!(
        admin_service::get_order_admin(&state, &ann, order.order.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        admin_service::delete_order_admin(&state, &ann, order.order.id).await,
        Err(AppError::Forbidden)
    ));

    let fetched = admin_service::get_order_admin(&state, &admin, order.order.id).await?;
    assert_eq!(fetched.order.user_id, ann.user_id);
    assert_eq!(fetched.items.len(), 1);

    admin_service::delete_order_admin(&state, &admin, order.order.id).await?;
    assert!(matches!(
        admin_service::get_order_admin(&state, &admin, order.order.id).await,
        Err(AppError::NotFound)
    ));
    assert_eq!(OrderProducts::find().count(&state.orm).await?, 0);
    Ok(())
}
