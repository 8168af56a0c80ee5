#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use scholaris::router::init_router;
use scholaris::state::AppState;
use scholaris_config::{CorsConfig, JwtConfig, RateLimitConfig};
use scholaris_core::{UserRole, hash_password};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub school_id: Option<Uuid>,
}

pub struct TestSchool {
    pub id: Uuid,
    pub name: String,
}

pub fn setup_test_app(pool: PgPool) -> axum::Router {
    setup_test_app_with_rate_limit(pool, RateLimitConfig::permissive())
}

pub fn setup_test_app_with_rate_limit(
    pool: PgPool,
    rate_limit_config: RateLimitConfig,
) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState::new(
        pool,
        JwtConfig::from_env(),
        CorsConfig::default(),
        rate_limit_config,
    );
    init_router(state)
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn generate_unique_school_name() -> String {
    format!("Test School {}", Uuid::new_v4())
}

pub async fn create_test_school(pool: &PgPool, name: &str) -> TestSchool {
    let code = format!("T-{}", &Uuid::new_v4().simple().to_string()[..10]);
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO schools (name, code, address) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(code)
    .bind("Test Address")
    .fetch_one(pool)
    .await
    .unwrap();

    TestSchool {
        id,
        name: name.to_string(),
    }
}

pub async fn create_test_user(pool: &PgPool, role: UserRole, school_id: Option<Uuid>) -> TestUser {
    let email = generate_unique_email();
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO users (first_name, last_name, email, password, role, school_id)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id"#,
    )
    .bind("Test")
    .bind("User")
    .bind(&email)
    .bind(hashed)
    .bind(role)
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        email,
        password: TEST_PASSWORD.to_string(),
        role,
        school_id,
    }
}

/// Teacher account plus its profile row id.
pub async fn create_test_teacher(pool: &PgPool, school_id: Uuid) -> (TestUser, Uuid) {
    let user = create_test_user(pool, UserRole::Teacher, Some(school_id)).await;
    let teacher_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO teachers (user_id, school_id, employee_number) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user.id)
    .bind(school_id)
    .bind(format!("T-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap();
    (user, teacher_id)
}

pub async fn create_test_parent(pool: &PgPool, school_id: Uuid) -> (TestUser, Uuid) {
    let user = create_test_user(pool, UserRole::Parent, Some(school_id)).await;
    let parent_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO parents (user_id, school_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(user.id)
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (user, parent_id)
}

pub async fn create_test_student(
    pool: &PgPool,
    school_id: Uuid,
    class_id: Option<Uuid>,
    parent_id: Option<Uuid>,
) -> (TestUser, Uuid) {
    let user = create_test_user(pool, UserRole::Student, Some(school_id)).await;
    let student_id = sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO students (user_id, school_id, admission_number, class_id, parent_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(user.id)
    .bind(school_id)
    .bind(format!("ADM-{}", Uuid::new_v4()))
    .bind(class_id)
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (user, student_id)
}

pub async fn create_test_class(pool: &PgPool, school_id: Uuid, name: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO classes (school_id, name, section) VALUES ($1, $2, 'A') RETURNING id",
    )
    .bind(school_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Sends a request and returns the status with the JSON body, `Null` when empty.
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get_auth_token(app: &axum::Router, user: &TestUser) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}
