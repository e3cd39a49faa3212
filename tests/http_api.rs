mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use axum_storefront_api::{models::Role, routes::create_api_router, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{create_user, setup_state};

fn app(state: AppState) -> Router {
    Router::new().nest("/api", create_api_router()).with_state(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> anyhow::Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

#[tokio::test]
async fn protected_routes_need_a_credential() -> anyhow::Result<()> {
    let app = app(setup_state().await?);

    let (status, json) = send(&app, Method::GET, "/api/orders", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["data"]["kind"], "UNAUTHENTICATED");

    let (status, _) = send(&app, Method::GET, "/api/users/me", Some("forged"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_login_and_read_profile() -> anyhow::Result<()> {
    let app = app(setup_state().await?);

    let credentials = json!({ "username": "ann", "password": "secret1" });
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(credentials.clone()),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["username"], "ann");
    assert!(json["data"].get("password_hash").is_none());

    let (status, json) = send(&app, Method::POST, "/api/auth/login", None, Some(credentials)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = json["data"]["token"].as_str().unwrap().to_owned();

    let (status, json) = send(&app, Method::GET, "/api/users/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["role"], "user");

    let (status, json) = send(&app, Method::POST, "/api/auth/refresh", Some(&token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["kind"], "REFRESH_NOT_YET_ELIGIBLE");
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_invalid_argument() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "root", Role::Admin).await?;
    let ann = create_user(&state, "ann", Role::User).await?;
    let token = state.tokens.issue(admin.user_id, &admin.username, admin.role)?.token;
    let app = app(state);

    let (status, json) =
        send(&app, Method::GET, "/api/orders/not-a-uuid", Some(&token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["kind"], "INVALID_ARGUMENT");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/users/{}/role", ann.user_id),
        Some(&token),
        Some(json!({ "role": "root" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, Method::GET, "/api/products?sort=bogus", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["kind"], "INVALID_ARGUMENT");

    let huge_page = format!("page={}&limit=10", u64::MAX);
    for uri in ["/api/products", "/api/admin/orders", "/api/users"] {
        let (status, json) =
            send(&app, Method::GET, &format!("{uri}?{huge_page}"), Some(&token), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["data"]["kind"], "INVALID_ARGUMENT");
    }

    let (status, json) = send(
        &app,
        Method::GET,
        "/api/products/price-range?min=10&max=1",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["kind"], "INVALID_ARGUMENT");
    Ok(())
}

#[tokio::test]
async fn order_endpoints_round_trip() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let ann = create_user(&state, "ann", Role::User).await?;
    let bob = create_user(&state, "bob", Role::User).await?;
    let category = common::create_category(&state, "Mugs").await?;
    let mug = common::create_product(&state, category, "Mug", 1200, "Crab").await?;
    let ann_token = state.tokens.issue(ann.user_id, &ann.username, ann.role)?.token;
    let bob_token = state.tokens.issue(bob.user_id, &bob.username, bob.role)?.token;
    let app = app(state);

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&ann_token),
        Some(json!({ "items": [{ "product_id": mug, "quantity": 2 }] })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = json["data"]["order"]["id"].as_str().unwrap().to_owned();

    let (status, json) = send(
        &app,
        Method::POST,
        &format!("/api/orders/{order_id}/products"),
        Some(&ann_token),
        Some(json!({ "product_id": mug, "quantity": 3 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["quantity"], 5);

    let (status, json) = send(
        &app,
        Method::GET,
        &format!("/api/orders/{order_id}"),
        Some(&bob_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["kind"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/orders/{order_id}"),
        Some(&ann_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/orders/{order_id}"),
        Some(&ann_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
