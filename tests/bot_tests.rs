//! Tests for keyboards, message formatting, and localization

use chrono::{NaiveDate, Utc};
use homework_bot::bot::ui_builder::{
    create_courses_pagination_keyboard, create_grade_keyboard, create_request_keyboard,
    create_role_keyboard, create_submit_keyboard, format_assignments_list,
    format_submission_status_list,
};
use homework_bot::bot::CallbackData;
use homework_bot::localization::{create_localization_manager, t_args_lang, t_lang};
use homework_bot::{Assignment, Course, Role, Submission, SubmissionStatus};
use std::sync::Arc;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

fn setup_localization() -> Arc<homework_bot::localization::LocalizationManager> {
    create_localization_manager().expect("Failed to create localization manager")
}

fn button_payload(keyboard: &InlineKeyboardMarkup, row: usize, col: usize) -> &str {
    match &keyboard.inline_keyboard[row][col].kind {
        InlineKeyboardButtonKind::CallbackData(data) => data,
        other => panic!("Expected callback button, got {:?}", other),
    }
}

fn sample_course(id: i64, name: &str) -> Course {
    Course {
        id,
        name: name.to_string(),
        teacher_id: Some(1),
    }
}

fn sample_assignment(id: i64, title: &str, due_date: Option<NaiveDate>) -> Assignment {
    Assignment {
        id,
        course_id: 1,
        title: title.to_string(),
        description: "desc".to_string(),
        due_date,
        created_at: Utc::now(),
    }
}

#[test]
fn test_role_keyboard_offers_student_and_teacher_only() {
    let localization = setup_localization();
    let keyboard = create_role_keyboard(&localization, Some("en"));

    assert_eq!(keyboard.inline_keyboard.len(), 1);
    assert_eq!(keyboard.inline_keyboard[0].len(), 2);
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 0)),
        Some(CallbackData::Role(Role::Student))
    );
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 1)),
        Some(CallbackData::Role(Role::Teacher))
    );
}

#[test]
fn test_request_keyboard_carries_request_id() {
    let localization = setup_localization();
    let keyboard = create_request_keyboard(42, &localization, None);

    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 0)),
        Some(CallbackData::Approve(42))
    );
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 1)),
        Some(CallbackData::Reject(42))
    );
}

#[test]
fn test_pagination_keyboard_navigation_rows() {
    let localization = setup_localization();
    let courses: Vec<Course> = (1..=5)
        .map(|i| sample_course(i, &format!("Course {}", i)))
        .collect();

    // First page of three: no "back" arrow
    let keyboard = create_courses_pagination_keyboard(&courses, 0, 12, 5, &localization, None);
    assert_eq!(keyboard.inline_keyboard.len(), 6);
    let nav = &keyboard.inline_keyboard[5];
    assert_eq!(nav.len(), 2);
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 5, 0)),
        Some(CallbackData::Noop)
    );
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 5, 1)),
        Some(CallbackData::Page(1))
    );

    // Middle page: both arrows
    let keyboard = create_courses_pagination_keyboard(&courses, 1, 12, 5, &localization, None);
    let nav = &keyboard.inline_keyboard[5];
    assert_eq!(nav.len(), 3);
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 5, 0)),
        Some(CallbackData::Page(0))
    );
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 5, 2)),
        Some(CallbackData::Page(2))
    );

    // Everything fits on one page: no navigation row at all
    let keyboard = create_courses_pagination_keyboard(&courses, 0, 5, 5, &localization, None);
    assert_eq!(keyboard.inline_keyboard.len(), 5);
}

#[test]
fn test_grade_keyboard_encodes_both_outcomes() {
    let localization = setup_localization();
    let keyboard = create_grade_keyboard(7, &localization, Some("en"));

    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 0)),
        Some(CallbackData::Grade(7, SubmissionStatus::Approved))
    );
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 1)),
        Some(CallbackData::Grade(7, SubmissionStatus::NeedsRevision))
    );
}

#[test]
fn test_submit_keyboard_truncates_long_titles() {
    let long_title = "An exceptionally verbose assignment title that will not fit";
    let assignments = vec![(sample_assignment(3, long_title, None), "Rust".to_string())];
    let keyboard = create_submit_keyboard(&assignments);

    let label = &keyboard.inline_keyboard[0][0].text;
    assert!(label.chars().count() <= 30);
    assert!(label.ends_with("..."));
    assert_eq!(
        CallbackData::parse(button_payload(&keyboard, 0, 0)),
        Some(CallbackData::Submit(3))
    );
}

#[test]
fn test_assignments_list_formatting() {
    let localization = setup_localization();
    let due = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
    let assignments = vec![
        (sample_assignment(1, "Ownership", Some(due)), "Rust Basics".to_string()),
        (sample_assignment(2, "Lifetimes", None), "Rust Basics".to_string()),
    ];

    let text = format_assignments_list(&assignments, &localization, Some("en"));
    assert!(text.contains("1. **Ownership** (Rust Basics)"));
    assert!(text.contains("2030-06-01"));
    assert!(text.contains("2. **Lifetimes** (Rust Basics)"));
    // No due date means no due label on that line
    let lifetimes_line = text.lines().nth(1).unwrap();
    assert!(!lifetimes_line.contains("due"));
}

#[test]
fn test_submission_status_list_shows_comment() {
    let localization = setup_localization();
    let submission = Submission {
        id: 1,
        assignment_id: 1,
        student_id: 1,
        link: "https://github.com/ivan/stack".to_string(),
        status: SubmissionStatus::NeedsRevision,
        teacher_comment: Some("Add tests".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let rows = vec![(submission, "Ownership".to_string())];

    let text = format_submission_status_list(&rows, &localization, Some("en"));
    assert!(text.contains("**Ownership**"));
    assert!(text.contains("needs revision"));
    assert!(text.contains("Add tests"));
}

#[test]
fn test_localization_fallback_and_arguments() {
    let localization = setup_localization();

    // Unknown language falls back to English
    let en = t_lang(&localization, "courses-none", Some("en"));
    let fallback = t_lang(&localization, "courses-none", Some("de"));
    assert_eq!(en, fallback);

    // Russian resolves to its own bundle
    let ru = t_lang(&localization, "courses-none", Some("ru"));
    assert_ne!(en, ru);

    // Region subtags are stripped before lookup
    let ru_regional = t_lang(&localization, "courses-none", Some("ru-RU"));
    assert_eq!(ru, ru_regional);

    // Arguments are interpolated
    let with_args = t_args_lang(
        &localization,
        "assignment-created",
        &[("title", "Ownership")],
        Some("en"),
    );
    assert!(with_args.contains("Ownership"));
}

#[test]
fn test_every_validation_error_key_exists() {
    let localization = setup_localization();
    let keys = [
        "name-empty",
        "name-too-long",
        "name-has-slash",
        "email-invalid",
        "title-empty",
        "title-too-long",
        "title-has-slash",
        "description-empty",
        "description-has-slash",
        "link-empty",
        "link-not-github",
        "date-format",
        "date-past",
        "grade-comment-empty",
        "grade-comment-has-slash",
    ];
    for key in keys {
        for lang in [Some("en"), Some("ru")] {
            let message = t_lang(&localization, key, lang);
            assert!(
                !message.starts_with("Missing translation"),
                "Key {} missing for {:?}",
                key,
                lang
            );
        }
    }
}
