mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{create_test_school, create_test_user, generate_unique_school_name, setup_test_app_with_rate_limit};
use scholaris_config::RateLimitConfig;
use scholaris_core::UserRole;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

fn strict_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        general_per_second: 60,
        general_burst_size: 2,
        auth_per_second: 60,
        auth_burst_size: 1,
    }
}

fn login_request(client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(
            serde_json::to_string(&json!({
                "email": "nobody@example.com",
                "password": "password123"
            }))
            .unwrap(),
        ))
        .unwrap()
}

fn health_request(client_ip: &str) -> Request<Body> {
    Request::builder()
        .uri("/health")
        .header("x-forwarded-for", client_ip)
        .body(Body::empty())
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_auth_rate_limit_exceeded(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let first = app.clone().oneshot(login_request("192.168.1.100")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = app.clone().oneshot(login_request("192.168.1.100")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rate_limit_is_per_client(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let first = app.clone().oneshot(login_request("10.0.0.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let other_client = app.clone().oneshot(login_request("10.0.0.2")).await.unwrap();
    assert_eq!(other_client.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_general_bucket_is_separate_from_auth(pool: PgPool) {
    let app = setup_test_app_with_rate_limit(pool, strict_rate_limit_config());

    let login = app.clone().oneshot(login_request("172.16.0.5")).await.unwrap();
    assert_eq!(login.status(), StatusCode::UNAUTHORIZED);

    for _ in 0..2 {
        let response = app.clone().oneshot(health_request("172.16.0.5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = app.clone().oneshot(health_request("172.16.0.5")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_disabled_rate_limit_lets_everything_through(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let user = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let config = RateLimitConfig {
        enabled: false,
        ..strict_rate_limit_config()
    };
    let app = setup_test_app_with_rate_limit(pool, config);

    for _ in 0..5 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "192.168.1.200")
            .body(Body::from(
                serde_json::to_string(&json!({ "email": user.email, "password": user.password }))
                    .unwrap(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
