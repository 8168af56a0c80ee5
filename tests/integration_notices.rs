mod common;

use axum::http::StatusCode;
use common::{
    create_test_class, create_test_parent, create_test_school, create_test_student,
    create_test_teacher, create_test_user, generate_unique_school_name, get_auth_token, send,
    setup_test_app,
};
use scholaris_core::UserRole;
use serde_json::{Value, json};
use sqlx::PgPool;

fn titles(body: &Value) -> Vec<String> {
    let mut titles: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect();
    titles.sort();
    titles
}

async fn post_notice(app: &axum::Router, token: &str, body: Value) -> Value {
    let (status, notice) = send(app, "POST", "/api/notices", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", notice);
    notice
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_notice_defaults(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    let notice = post_notice(
        &app,
        &token,
        json!({ "title": "Sports day", "content": "Friday on the main field" }),
    )
    .await;

    assert_eq!(notice["audience"], "ALL");
    assert_eq!(notice["priority"], "NORMAL");
    assert_eq!(notice["school_id"], school.id.to_string());
    assert_eq!(notice["author_id"], admin.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_audiences_are_filtered_per_role(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (student, _) = create_test_student(&pool, school.id, None, None).await;
    let (parent, _) = create_test_parent(&pool, school.id).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    for (title, audience) in [
        ("everyone", "ALL"),
        ("pupils", "STUDENTS"),
        ("staff", "TEACHERS"),
        ("families", "PARENTS"),
    ] {
        post_notice(
            &app,
            &token,
            json!({ "title": title, "content": "body", "audience": audience }),
        )
        .await;
    }

    let (_, body) = send(&app, "GET", "/api/notices", Some(&token), None).await;
    assert_eq!(body["meta"]["total"], 4);

    let student_token = get_auth_token(&app, &student).await;
    let (status, body) = send(&app, "GET", "/api/notices", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["everyone", "pupils"]);

    let (_, body) = send(
        &app,
        "GET",
        "/api/notices?audience=TEACHERS",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["total"], 0);

    let parent_token = get_auth_token(&app, &parent).await;
    let (_, body) = send(&app, "GET", "/api/notices", Some(&parent_token), None).await;
    assert_eq!(titles(&body), vec!["everyone", "families"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_notice_only_reaches_that_class(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let class_a = create_test_class(&pool, school.id, "Grade 1").await;
    let class_b = create_test_class(&pool, school.id, "Grade 2").await;
    let (in_a, _) = create_test_student(&pool, school.id, Some(class_a), None).await;
    let (in_b, _) = create_test_student(&pool, school.id, Some(class_b), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    let notice = post_notice(
        &app,
        &token,
        json!({ "title": "Field trip", "content": "Bring lunch", "class_id": class_a }),
    )
    .await;
    let uri = format!("/api/notices/{}", notice["id"].as_str().unwrap());

    let token_a = get_auth_token(&app, &in_a).await;
    let (status, _) = send(&app, "GET", &uri, Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);

    let token_b = get_auth_token(&app, &in_b).await;
    let (status, _) = send(&app, "GET", &uri, Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expired_notice_hidden_from_students(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (student, _) = create_test_student(&pool, school.id, None, None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    post_notice(
        &app,
        &token,
        json!({
            "title": "Old news",
            "content": "Gone",
            "expires_at": "2000-01-01T00:00:00Z"
        }),
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/notices", Some(&token), None).await;
    assert_eq!(body["meta"]["total"], 1);

    let student_token = get_auth_token(&app, &student).await;
    let (_, body) = send(&app, "GET", "/api/notices", Some(&student_token), None).await;
    assert_eq!(body["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_create_notice(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let (student, _) = create_test_student(&pool, school.id, None, None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &student).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/notices",
        Some(&token),
        Some(json!({ "title": "Party", "content": "My house" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_edits_only_own_notices(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let app = setup_test_app(pool);
    let admin_token = get_auth_token(&app, &admin).await;
    let teacher_token = get_auth_token(&app, &teacher).await;

    let admin_notice = post_notice(
        &app,
        &admin_token,
        json!({ "title": "Admin notice", "content": "From the office" }),
    )
    .await;
    let own_notice = post_notice(
        &app,
        &teacher_token,
        json!({ "title": "Homework", "content": "Chapter 3", "audience": "STUDENTS" }),
    )
    .await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/notices/{}", admin_notice["id"].as_str().unwrap()),
        Some(&teacher_token),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/notices/{}", own_notice["id"].as_str().unwrap()),
        Some(&teacher_token),
        Some(json!({ "priority": "HIGH" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], "HIGH");
    assert_eq!(body["title"], "Homework");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/notices/{}", own_notice["id"].as_str().unwrap()),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_notices_do_not_leak_across_schools(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let other = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let other_admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(other.id)).await;
    let app = setup_test_app(pool);

    let token = get_auth_token(&app, &admin).await;
    let notice = post_notice(&app, &token, json!({ "title": "Ours", "content": "x" })).await;

    let other_token = get_auth_token(&app, &other_admin).await;
    let (_, body) = send(&app, "GET", "/api/notices", Some(&other_token), None).await;
    assert_eq!(body["meta"]["total"], 0);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/notices/{}", notice["id"].as_str().unwrap()),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_patch_null_clears_class_and_expiry(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let class_id = create_test_class(&pool, school.id, "Grade 8").await;
    let (student, _) = create_test_student(&pool, school.id, None, None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    let notice = post_notice(
        &app,
        &token,
        json!({
            "title": "Field trip",
            "content": "Bring lunch",
            "class_id": class_id,
            "expires_at": "2000-01-01T00:00:00Z"
        }),
    )
    .await;
    let uri = format!("/api/notices/{}", notice["id"].as_str().unwrap());

    let student_token = get_auth_token(&app, &student).await;
    let (status, _) = send(&app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&token),
        Some(json!({ "class_id": null, "expires_at": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["class_id"].is_null());
    assert!(body["expires_at"].is_null());
    assert_eq!(body["title"], "Field trip");

    let (status, _) = send(&app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
}
