//! Integration tests for the SQLite layer
//!
//! Each test opens its own single-connection in-memory database so tests
//! can run in parallel without touching each other's state.

use chrono::NaiveDate;
use homework_bot::db;
use homework_bot::{Role, SubmissionStatus};
use sqlx::sqlite::SqlitePool;

async fn test_pool() -> SqlitePool {
    let pool = db::connect(":memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    db::init_database_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

/// Seed one teacher, one course taught by them, and one assignment
async fn seed_course_with_assignment(pool: &SqlitePool) -> (i64, i64, i64) {
    let teacher_id = db::create_user(pool, 100, "Anna", "Petrova", "anna@example.com", Role::Teacher)
        .await
        .unwrap();
    let course_id = db::create_course(pool, "Rust Basics", Some(teacher_id))
        .await
        .unwrap();
    let assignment_id = db::create_assignment(
        pool,
        course_id,
        "Ownership exercise",
        "Implement a linked stack without cloning",
        None,
    )
    .await
    .unwrap();
    (teacher_id, course_id, assignment_id)
}

#[tokio::test]
async fn test_user_crud_round_trip() {
    let pool = test_pool().await;

    let user_id = db::create_user(&pool, 42, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
        .await
        .unwrap();

    let user = db::get_user_by_chat_id(&pool, 42).await.unwrap().unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.first_name, "Ivan");
    assert_eq!(user.role, Role::Student);
    assert_eq!(user.display_name(), "Ivan Sidorov");

    assert!(db::update_user_role(&pool, user_id, Role::Teacher)
        .await
        .unwrap());
    let user = db::get_user_by_id(&pool, user_id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Teacher);

    let teachers = db::list_users_by_role(&pool, Role::Teacher).await.unwrap();
    assert_eq!(teachers.len(), 1);
    assert!(db::list_users_by_role(&pool, Role::Student)
        .await
        .unwrap()
        .is_empty());

    assert!(db::delete_user(&pool, user_id).await.unwrap());
    assert!(db::get_user_by_id(&pool, user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ensure_admin_user_is_idempotent() {
    let pool = test_pool().await;

    db::ensure_admin_user(&pool, 777).await.unwrap();
    db::ensure_admin_user(&pool, 777).await.unwrap();

    let admin = db::get_user_by_chat_id(&pool, 777).await.unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(db::list_users_by_role(&pool, Role::Admin).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_registration_request_replaces_pending_one() {
    let pool = test_pool().await;

    let first = db::create_registration_request(
        &pool,
        10,
        "Maria",
        "Ivanova",
        "maria@example.com",
        Role::Student,
    )
    .await
    .unwrap();
    let second = db::create_registration_request(
        &pool,
        10,
        "Maria",
        "Ivanova",
        "maria@example.com",
        Role::Teacher,
    )
    .await
    .unwrap();
    assert_eq!(first, second);

    let requests = db::list_registration_requests(&pool).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].requested_role, Role::Teacher);
}

#[tokio::test]
async fn test_approve_registration_creates_user_and_consumes_request() {
    let pool = test_pool().await;

    let request_id = db::create_registration_request(
        &pool,
        20,
        "Pavel",
        "Smirnov",
        "pavel@example.com",
        Role::Student,
    )
    .await
    .unwrap();

    let user = db::approve_registration(&pool, request_id)
        .await
        .unwrap()
        .expect("Approval should create a user");
    assert_eq!(user.chat_id, 20);
    assert_eq!(user.role, Role::Student);

    // Request is gone, user exists, approving again is a no-op
    assert!(db::get_registration_request(&pool, request_id)
        .await
        .unwrap()
        .is_none());
    assert!(db::get_user_by_chat_id(&pool, 20).await.unwrap().is_some());
    assert!(db::approve_registration(&pool, request_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_reject_registration_removes_request_without_user() {
    let pool = test_pool().await;

    let request_id = db::create_registration_request(
        &pool,
        30,
        "Olga",
        "Kuznetsova",
        "olga@example.com",
        Role::Teacher,
    )
    .await
    .unwrap();

    let request = db::reject_registration(&pool, request_id)
        .await
        .unwrap()
        .expect("Rejection should return the request");
    assert_eq!(request.chat_id, 30);

    assert!(db::get_user_by_chat_id(&pool, 30).await.unwrap().is_none());
    assert!(db::reject_registration(&pool, request_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_course_pagination_and_teacher_assignment() {
    let pool = test_pool().await;

    let teacher_id =
        db::create_user(&pool, 100, "Anna", "Petrova", "anna@example.com", Role::Teacher)
            .await
            .unwrap();
    for name in ["Algebra", "Biology", "Chemistry", "Databases", "English", "French"] {
        db::create_course(&pool, name, None).await.unwrap();
    }

    let (page, total) = db::get_courses_paginated(&pool, 5, 0).await.unwrap();
    assert_eq!(page.len(), 5);
    assert_eq!(total, 6);
    assert_eq!(page[0].name, "Algebra");

    let (page, _) = db::get_courses_paginated(&pool, 5, 5).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "French");

    let course_id = page[0].id;
    assert!(db::assign_teacher(&pool, course_id, teacher_id)
        .await
        .unwrap());
    let by_teacher = db::list_courses_by_teacher(&pool, teacher_id).await.unwrap();
    assert_eq!(by_teacher.len(), 1);
    assert_eq!(by_teacher[0].id, course_id);
}

#[tokio::test]
async fn test_assignment_requires_course_with_teacher() {
    let pool = test_pool().await;

    let orphan_course = db::create_course(&pool, "Unstaffed", None).await.unwrap();
    let result =
        db::create_assignment(&pool, orphan_course, "Task", "Description", None).await;
    assert!(result.is_err());

    let result = db::create_assignment(&pool, 9999, "Task", "Description", None).await;
    assert!(result.is_err());

    let (_, course_id, _) = seed_course_with_assignment(&pool).await;
    let due = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
    let assignment_id =
        db::create_assignment(&pool, course_id, "Traits", "Model shapes with traits", Some(due))
            .await
            .unwrap();

    let assignment = db::get_assignment(&pool, assignment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(assignment.due_date, Some(due));

    let listed = db::list_assignments_with_course(&pool).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|(_, course)| course == "Rust Basics"));
}

#[tokio::test]
async fn test_resubmission_resets_status_and_comment() {
    let pool = test_pool().await;
    let (_, _, assignment_id) = seed_course_with_assignment(&pool).await;
    let student_id =
        db::create_user(&pool, 200, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
            .await
            .unwrap();

    let submission_id = db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack",
    )
    .await
    .unwrap();

    assert!(db::grade_submission(
        &pool,
        submission_id,
        SubmissionStatus::NeedsRevision,
        Some("Leaks memory in pop"),
    )
    .await
    .unwrap());

    // Resubmitting reuses the row and clears the grading
    let resubmitted_id = db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack-v2",
    )
    .await
    .unwrap();
    assert_eq!(submission_id, resubmitted_id);

    let submission = db::get_submission_for_student(&pool, assignment_id, student_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Submitted);
    assert_eq!(submission.link, "https://github.com/ivan/stack-v2");
    assert!(submission.teacher_comment.is_none());
}

#[tokio::test]
async fn test_grading_updates_status_and_comment() {
    let pool = test_pool().await;
    let (_, _, assignment_id) = seed_course_with_assignment(&pool).await;
    let student_id =
        db::create_user(&pool, 200, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
            .await
            .unwrap();
    let submission_id = db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack",
    )
    .await
    .unwrap();

    assert!(db::grade_submission(
        &pool,
        submission_id,
        SubmissionStatus::Approved,
        Some("Clean solution"),
    )
    .await
    .unwrap());

    let submission = db::get_submission(&pool, submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Approved);
    assert_eq!(submission.teacher_comment.as_deref(), Some("Clean solution"));

    // Grading a missing submission reports false, not an error
    assert!(!db::grade_submission(&pool, 9999, SubmissionStatus::Approved, None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_review_queue_only_lists_own_ungraded_submissions() {
    let pool = test_pool().await;
    let (teacher_id, _, assignment_id) = seed_course_with_assignment(&pool).await;

    let other_teacher =
        db::create_user(&pool, 101, "Boris", "Volkov", "boris@example.com", Role::Teacher)
            .await
            .unwrap();
    let other_course = db::create_course(&pool, "Networking", Some(other_teacher))
        .await
        .unwrap();
    let other_assignment =
        db::create_assignment(&pool, other_course, "Sockets", "Write an echo server", None)
            .await
            .unwrap();

    let student_id =
        db::create_user(&pool, 200, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
            .await
            .unwrap();
    let own = db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack",
    )
    .await
    .unwrap();
    db::upsert_submission(
        &pool,
        other_assignment,
        student_id,
        "https://github.com/ivan/echo",
    )
    .await
    .unwrap();

    let queue = db::list_ungraded_submissions_for_teacher(&pool, teacher_id)
        .await
        .unwrap();
    assert_eq!(queue.len(), 1);
    let (submission, title, student_name) = &queue[0];
    assert_eq!(submission.id, own);
    assert_eq!(title, "Ownership exercise");
    assert_eq!(student_name, "Ivan Sidorov");

    // Graded submissions drop out of the queue
    db::grade_submission(&pool, own, SubmissionStatus::Approved, None)
        .await
        .unwrap();
    assert!(db::list_ungraded_submissions_for_teacher(&pool, teacher_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_student_status_listing() {
    let pool = test_pool().await;
    let (_, _, assignment_id) = seed_course_with_assignment(&pool).await;
    let student_id =
        db::create_user(&pool, 200, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
            .await
            .unwrap();

    assert!(db::list_submissions_by_student(&pool, student_id)
        .await
        .unwrap()
        .is_empty());

    let submission_id = db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack",
    )
    .await
    .unwrap();
    db::grade_submission(
        &pool,
        submission_id,
        SubmissionStatus::NeedsRevision,
        Some("Add tests"),
    )
    .await
    .unwrap();

    let listed = db::list_submissions_by_student(&pool, student_id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    let (submission, title) = &listed[0];
    assert_eq!(title, "Ownership exercise");
    assert_eq!(submission.status, SubmissionStatus::NeedsRevision);
    assert_eq!(submission.teacher_comment.as_deref(), Some("Add tests"));
}

#[tokio::test]
async fn test_registration_request_lookup_by_chat_id() {
    let pool = test_pool().await;

    assert!(db::get_registration_request_by_chat_id(&pool, 50)
        .await
        .unwrap()
        .is_none());

    db::create_registration_request(&pool, 50, "Dmitri", "Orlov", "dmitri@example.com", Role::Student)
        .await
        .unwrap();

    let request = db::get_registration_request_by_chat_id(&pool, 50)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.first_name, "Dmitri");
}

#[tokio::test]
async fn test_assignment_deletion_removes_its_submissions() {
    let pool = test_pool().await;
    let (_, _, assignment_id) = seed_course_with_assignment(&pool).await;
    let student_id =
        db::create_user(&pool, 200, "Ivan", "Sidorov", "ivan@example.com", Role::Student)
            .await
            .unwrap();
    db::upsert_submission(
        &pool,
        assignment_id,
        student_id,
        "https://github.com/ivan/stack",
    )
    .await
    .unwrap();

    let submissions = db::list_submissions_by_assignment(&pool, assignment_id)
        .await
        .unwrap();
    assert_eq!(submissions.len(), 1);

    assert!(db::delete_assignment(&pool, assignment_id).await.unwrap());
    assert!(db::list_submissions_by_assignment(&pool, assignment_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deleting_course_cascades_to_assignments() {
    let pool = test_pool().await;
    let (_, course_id, assignment_id) = seed_course_with_assignment(&pool).await;

    assert!(db::delete_course(&pool, course_id).await.unwrap());
    assert!(db::get_course(&pool, course_id).await.unwrap().is_none());
    assert!(db::get_assignment(&pool, assignment_id)
        .await
        .unwrap()
        .is_none());
}
