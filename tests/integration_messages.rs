mod common;

use axum::http::StatusCode;
use common::{
    TestUser, create_test_parent, create_test_school, create_test_teacher, create_test_user,
    generate_unique_school_name, get_auth_token, send, setup_test_app,
};
use scholaris_core::UserRole;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn send_message(app: &axum::Router, token: &str, to: &TestUser, subject: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/messages",
        Some(token),
        Some(json!({ "recipient_id": to.id, "subject": subject, "body": "Hello there" })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_send_and_read_message(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (parent, _) = create_test_parent(&pool, school.id).await;
    let app = setup_test_app(pool);
    let teacher_token = get_auth_token(&app, &teacher).await;
    let parent_token = get_auth_token(&app, &parent).await;

    let (status, message) = send_message(&app, &parent_token, &teacher, "Homework question").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["sender_id"], parent.id.to_string());
    assert!(message["read_at"].is_null());

    let (status, inbox) = send(&app, "GET", "/api/messages", Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["meta"]["total"], 1);
    assert_eq!(inbox["unread_count"], 1);

    let (_, sent) = send(&app, "GET", "/api/messages?folder=sent", Some(&parent_token), None).await;
    assert_eq!(sent["meta"]["total"], 1);
    assert_eq!(sent["unread_count"], 0);

    let read_uri = format!("/api/messages/{}/read", message["id"].as_str().unwrap());
    let (status, _) = send(&app, "PATCH", &read_uri, Some(&parent_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, read) = send(&app, "PATCH", &read_uri, Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(read["read_at"].is_string());

    let (_, inbox) = send(&app, "GET", "/api/messages", Some(&teacher_token), None).await;
    assert_eq!(inbox["unread_count"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_message_yourself(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (status, body) = send_message(&app, &token, &teacher, "Note to self").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot send a message to yourself");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_message_other_school(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let other = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let outsider = create_test_user(&pool, UserRole::SchoolAdmin, Some(other.id)).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (status, body) = send_message(&app, &token, &outsider, "Hi").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Recipient must belong to your school");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_third_party_cannot_read_message(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (parent, _) = create_test_parent(&pool, school.id).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let app = setup_test_app(pool);
    let parent_token = get_auth_token(&app, &parent).await;

    let (_, message) = send_message(&app, &parent_token, &teacher, "Private").await;

    let admin_token = get_auth_token(&app, &admin).await;
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/messages/{}", message["id"].as_str().unwrap()),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_is_per_side_until_both_delete(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (parent, _) = create_test_parent(&pool, school.id).await;
    let app = setup_test_app(pool.clone());
    let teacher_token = get_auth_token(&app, &teacher).await;
    let parent_token = get_auth_token(&app, &parent).await;

    let (_, message) = send_message(&app, &parent_token, &teacher, "Absence").await;
    let uri = format!("/api/messages/{}", message["id"].as_str().unwrap());

    let (status, _) = send(&app, "DELETE", &uri, Some(&parent_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, Some(&parent_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &uri, Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &uri, Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_message_requires_subject(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (parent, _) = create_test_parent(&pool, school.id).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &parent).await;

    let (status, _) = send_message(&app, &token, &teacher, "").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
