// Router-level checks that never touch the database.
use ancestral_heartbeat::{
    app::build_router,
    config::AppConfig,
    domain::role::Role,
    i18n::Message,
    notifications::NotificationKind,
    services::auth_service::issue_token,
    state::AppState,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "http-routes-secret";

fn state() -> AppState {
    AppState::new(DatabaseConnection::Disconnected, AppConfig::for_tests(SECRET))
}

async fn send(app: Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn bearer(user_id: Uuid, role: Role) -> anyhow::Result<String> {
    let token = issue_token(&AppConfig::for_tests(SECRET), user_id, role)?;
    Ok(format!("Bearer {token}"))
}

#[tokio::test]
async fn health_is_wrapped_in_envelope() -> anyhow::Result<()> {
    let app = build_router(state())?;
    let (status, body) = send(
        app,
        Request::get("/health").body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() -> anyhow::Result<()> {
    let app = build_router(state())?;
    let (status, body) = send(app, Request::get("/nope").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> anyhow::Result<()> {
    for path in ["/api/cart", "/api/orders", "/api/notifications", "/api/loyalty"] {
        let app = build_router(state())?;
        let (status, body) = send(app, Request::get(path).body(Body::empty())?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["success"], false);
    }

    let app = build_router(state())?;
    let (status, _) = send(
        app,
        Request::get("/api/cart")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn customers_cannot_reach_staff_routes() -> anyhow::Result<()> {
    let app = build_router(state())?;
    let (status, _) = send(
        app,
        Request::get("/api/admin/dashboard")
            .header(header::AUTHORIZATION, bearer(Uuid::new_v4(), Role::Customer)?)
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn notifications_render_in_request_language() -> anyhow::Result<()> {
    let state = state();
    let user_id = Uuid::new_v4();
    let id = state
        .notifications
        .push(
            user_id,
            NotificationKind::Success,
            Message::OrderPlaced {
                invoice_number: "INV-20261017-abcdef12".into(),
            },
            Some(60_000),
        )
        .await;
    let auth = bearer(user_id, Role::Customer)?;

    let (status, body) = send(
        build_router(state.clone())?,
        Request::get("/api/notifications?lang=en")
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "success");
    assert_eq!(items[0]["title"], "Order placed");

    let (_, body) = send(
        build_router(state.clone())?,
        Request::get("/api/notifications")
            .header(header::AUTHORIZATION, &auth)
            .header(header::ACCEPT_LANGUAGE, "es-CO,es;q=0.9")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(body["data"][0]["title"], "Pedido realizado");

    let (status, _) = send(
        build_router(state.clone())?,
        Request::delete(format!("/api/notifications/{id}"))
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        build_router(state)?,
        Request::delete(format!("/api/notifications/{id}"))
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
