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
use uuid::Uuid;

async fn create_exam(app: &axum::Router, token: &str, class_id: Uuid) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/exams",
        Some(token),
        Some(json!({
            "class_id": class_id,
            "name": "Midterm",
            "subject": "Mathematics",
            "exam_date": "2030-03-15",
            "max_marks": 100,
            "passing_marks": 40
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create exam failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

fn result_for<'a>(results: &'a Value, student_id: Uuid) -> &'a Value {
    results
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["student_id"] == student_id.to_string())
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_records_results_with_grades(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let (teacher, _) = create_test_teacher(&pool, school.id).await;
    let (_, top) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let (_, weak) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &teacher).await;
    let exam_id = create_exam(&app, &token, class_id).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", exam_id),
        Some(&token),
        Some(json!({
            "results": [
                { "student_id": top, "marks_obtained": 92.5 },
                { "student_id": weak, "marks_obtained": 35, "remarks": "Needs support" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], 2);
    let top_result = result_for(&body["results"], top);
    assert_eq!(top_result["grade"], "A+");
    assert_eq!(top_result["passed"], true);
    let weak_result = result_for(&body["results"], weak);
    assert_eq!(weak_result["grade"], "F");
    assert_eq!(weak_result["passed"], false);
    assert_eq!(weak_result["remarks"], "Needs support");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recording_again_overwrites_result(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;
    let exam_id = create_exam(&app, &token, class_id).await;
    let uri = format!("/api/exams/{}/results", exam_id);

    for marks in [55.0, 75.0] {
        let (status, _) = send(
            &app,
            "POST",
            &uri,
            Some(&token),
            Some(json!({ "results": [{ "student_id": student, "marks_obtained": marks }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["marks_obtained"], 75.0);
    assert_eq!(body[0]["grade"], "B");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_results_reject_unenrolled_student(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let other_class = create_test_class(&pool, school.id, "Grade 8").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (_, enrolled) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let (_, outsider) = create_test_student(&pool, school.id, Some(other_class), None).await;
    let app = setup_test_app(pool.clone());
    let token = get_auth_token(&app, &admin).await;
    let exam_id = create_exam(&app, &token, class_id).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", exam_id),
        Some(&token),
        Some(json!({
            "results": [
                { "student_id": enrolled, "marks_obtained": 80 },
                { "student_id": outsider, "marks_obtained": 80 }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not enrolled"));

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_results")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_results_reject_marks_above_max(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;
    let exam_id = create_exam(&app, &token, class_id).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", exam_id),
        Some(&token),
        Some(json!({ "results": [{ "student_id": student, "marks_obtained": 101 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_passing_marks_above_max_rejected(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&token),
        Some(json!({
            "class_id": class_id,
            "name": "Quiz",
            "subject": "Science",
            "exam_date": "2030-01-10",
            "max_marks": 20,
            "passing_marks": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_max_marks_cannot_drop_below_recorded(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (_, student) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;
    let exam_id = create_exam(&app, &token, class_id).await;

    send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", exam_id),
        Some(&token),
        Some(json!({ "results": [{ "student_id": student, "marks_obtained": 90 }] })),
    )
    .await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/exams/{}", exam_id),
        Some(&token),
        Some(json!({ "max_marks": 50, "passing_marks": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_sees_only_their_childs_results(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (parent, parent_id) = create_test_parent(&pool, school.id).await;
    let (_, child) = create_test_student(&pool, school.id, Some(class_id), Some(parent_id)).await;
    let (_, classmate) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;
    let exam_id = create_exam(&app, &token, class_id).await;

    send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", exam_id),
        Some(&token),
        Some(json!({
            "results": [
                { "student_id": child, "marks_obtained": 65 },
                { "student_id": classmate, "marks_obtained": 85 }
            ]
        })),
    )
    .await;

    let parent_token = get_auth_token(&app, &parent).await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/exams/{}/results", exam_id),
        Some(&parent_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["student_id"], child.to_string());
    assert_eq!(results[0]["grade"], "C");

    let (status, body) = send(&app, "GET", "/api/results", Some(&parent_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_see_other_class_exam(pool: PgPool) {
    let school = create_test_school(&pool, &generate_unique_school_name()).await;
    let class_id = create_test_class(&pool, school.id, "Grade 7").await;
    let other_class = create_test_class(&pool, school.id, "Grade 9").await;
    let admin = create_test_user(&pool, UserRole::SchoolAdmin, Some(school.id)).await;
    let (student, _) = create_test_student(&pool, school.id, Some(class_id), None).await;
    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin).await;
    let own_exam = create_exam(&app, &token, class_id).await;
    let other_exam = create_exam(&app, &token, other_class).await;

    let student_token = get_auth_token(&app, &student).await;
    let (status, body) = send(&app, "GET", "/api/exams", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], own_exam);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/exams/{}", other_exam),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/results", own_exam),
        Some(&student_token),
        Some(json!({ "results": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
