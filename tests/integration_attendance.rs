mod common;

use axum::http::StatusCode;
use common::{
    create_test_class, create_test_parent, create_test_school, create_test_student,
    create_test_teacher, generate_unique_school_name, get_auth_token, send, setup_test_app,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

async fn mark(
    app: &axum::Router,
    token: &str,
    class_id: Uuid,
    date: &str,
    entries: Value,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/attendance",
        Some(token),
        Some(json!({ "class_id": class_id, "date": date, "entries": entries })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_marks_class(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, present) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let (_, absent) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (status, body) = mark(
        &app,
        &token,
        class_id,
        "2024-05-06",
        json!([
            { "student_id": present, "status": "PRESENT" },
            { "student_id": absent, "status": "ABSENT", "remarks": "Sick" }
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 2);
    assert_eq!(body["date"], "2024-05-06");
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_remarking_same_day_overwrites(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    for status in ["ABSENT", "LATE"] {
        let (code, _) = mark(
            &app,
            &token,
            class_id,
            "2024-05-07",
            json!([{ "student_id": student, "status": status }]),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/attendance?student_id={}", student),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["status"], "LATE");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_future_date_rejected(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (status, body) = mark(
        &app,
        &token,
        class_id,
        "2999-01-01",
        json!([{ "student_id": student, "status": "PRESENT" }]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Attendance cannot be marked for a future date");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_outside_class_rejected(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let other_class = create_test_class(&pool, school.id, "Grade 4").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, outsider) = create_test_student(&pool, school.id, Some(other_class), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (status, _) = mark(
        &app,
        &token,
        class_id,
        "2024-05-06",
        json!([{ "student_id": outsider, "status": "PRESENT" }]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_summary_rate(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    for (date, status) in [
        ("2024-05-06", "PRESENT"),
        ("2024-05-07", "LATE"),
        ("2024-05-08", "ABSENT"),
        ("2024-05-09", "EXCUSED"),
    ] {
        mark(
            &app,
            &token,
            class_id,
            date,
            json!([{ "student_id": student, "status": status }]),
        )
        .await;
    }

    let (status, summary) = send(
        &app,
        "GET",
        &format!("/api/attendance/summary?student_id={}", student),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["present"], 1);
    assert_eq!(summary["late"], 1);
    assert_eq!(summary["absent"], 1);
    assert_eq!(summary["excused"], 1);
    assert_eq!(summary["attendance_rate"], 50.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_reads_only_childs_attendance(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (parent, parent_id) = create_test_parent(&pool, school.id).await;
    let (_, child) = create_test_student(&pool, school.id, Some(class_id), Some(parent_id)).await;
    let (_, classmate) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    mark(
        &app,
        &token,
        class_id,
        "2024-05-06",
        json!([
            { "student_id": child, "status": "PRESENT" },
            { "student_id": classmate, "status": "ABSENT" }
        ]),
    )
    .await;

    let parent_token = get_auth_token(&app, &parent).await;
    let (status, body) = send(&app, "GET", "/api/attendance", Some(&parent_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["student_id"], child.to_string());

    let (status, _) = mark(
        &app,
        &parent_token,
        class_id,
        "2024-05-07",
        json!([{ "student_id": child, "status": "PRESENT" }]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_and_delete_record(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 3").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;

    let (_, body) = mark(
        &app,
        &token,
        class_id,
        "2024-05-06",
        json!([{ "student_id": student, "status": "ABSENT" }]),
    )
    .await;
    let record_uri = format!("/api/attendance/{}", body["records"][0]["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        "PATCH",
        &record_uri,
        Some(&token),
        Some(json!({ "status": "EXCUSED", "remarks": "Doctor's note" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "EXCUSED");

    let (status, _) = send(&app, "DELETE", &record_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &record_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
