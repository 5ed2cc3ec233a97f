//! UI Builder module for creating keyboards and formatting messages

use std::sync::Arc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::db::{Assignment, Course, Role, Submission, SubmissionStatus, User};
use crate::localization::{t_lang, LocalizationManager};

use super::callback_data::CallbackData;

/// Truncate long text for button display
fn button_label(text: &str) -> String {
    if text.chars().count() > 30 {
        let truncated: String = text.chars().take(27).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Localized display name for a submission status
pub fn status_label(
    status: SubmissionStatus,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let key = match status {
        SubmissionStatus::Submitted => "status-submitted",
        SubmissionStatus::Approved => "status-approved",
        SubmissionStatus::NeedsRevision => "status-needs-revision",
    };
    t_lang(localization, key, language_code)
}

/// Localized display name for a role
pub fn role_label(
    role: Role,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let key = match role {
        Role::Student => "role-student",
        Role::Teacher => "role-teacher",
        Role::Admin => "role-admin",
    };
    t_lang(localization, key, language_code)
}

/// Create the role picker shown at the end of registration
///
/// Administrators are appointed by the configured admin, so the picker only
/// offers student and teacher.
pub fn create_role_keyboard(
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            format!("🎓 {}", t_lang(localization, "role-student", language_code)),
            CallbackData::Role(Role::Student).encode(),
        ),
        InlineKeyboardButton::callback(
            format!("📚 {}", t_lang(localization, "role-teacher", language_code)),
            CallbackData::Role(Role::Teacher).encode(),
        ),
    ]])
}

/// Create the approve/reject row attached to a pending registration request
pub fn create_request_keyboard(
    request_id: i64,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            format!("✅ {}", t_lang(localization, "approve-button", language_code)),
            CallbackData::Approve(request_id).encode(),
        ),
        InlineKeyboardButton::callback(
            format!("❌ {}", t_lang(localization, "reject-button", language_code)),
            CallbackData::Reject(request_id).encode(),
        ),
    ]])
}

/// Create inline keyboard for a paginated course list
pub fn create_courses_pagination_keyboard(
    courses: &[Course],
    current_page: i64,
    total_count: i64,
    limit: i64,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons = Vec::new();

    for course in courses {
        buttons.push(vec![InlineKeyboardButton::callback(
            button_label(&course.name),
            CallbackData::Course(course.id).encode(),
        )]);
    }

    let total_pages = (total_count + limit - 1) / limit;

    if total_pages > 1 {
        let mut nav_buttons = Vec::new();

        if current_page > 0 {
            nav_buttons.push(InlineKeyboardButton::callback(
                format!("⬅️ {}", t_lang(localization, "previous", language_code)),
                CallbackData::Page(current_page - 1).encode(),
            ));
        }

        let page_info = format!(
            "{} {} {} {}",
            t_lang(localization, "page", language_code),
            current_page + 1,
            t_lang(localization, "of", language_code),
            total_pages
        );
        nav_buttons.push(InlineKeyboardButton::callback(
            page_info,
            CallbackData::Noop.encode(),
        ));

        if current_page + 1 < total_pages {
            nav_buttons.push(InlineKeyboardButton::callback(
                format!("{} ➡️", t_lang(localization, "next", language_code)),
                CallbackData::Page(current_page + 1).encode(),
            ));
        }

        buttons.push(nav_buttons);
    }

    InlineKeyboardMarkup::new(buttons)
}

/// Create the course picker for assignment creation
pub fn create_course_pick_keyboard(courses: &[Course]) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = courses
        .iter()
        .map(|course| {
            vec![InlineKeyboardButton::callback(
                button_label(&course.name),
                CallbackData::AssignCourse(course.id).encode(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Create the teacher picker for course creation
pub fn create_teacher_pick_keyboard(teachers: &[User]) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = teachers
        .iter()
        .map(|teacher| {
            vec![InlineKeyboardButton::callback(
                button_label(&teacher.display_name()),
                CallbackData::Teacher(teacher.id).encode(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Create the assignment picker for `/submit`
pub fn create_submit_keyboard(assignments: &[(Assignment, String)]) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = assignments
        .iter()
        .map(|(assignment, course_name)| {
            vec![InlineKeyboardButton::callback(
                button_label(&format!("{} ({})", assignment.title, course_name)),
                CallbackData::Submit(assignment.id).encode(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Create the submission picker for `/review`
pub fn create_review_keyboard(
    submissions: &[(Submission, String, String)],
) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = submissions
        .iter()
        .map(|(submission, title, student_name)| {
            vec![InlineKeyboardButton::callback(
                button_label(&format!("{} — {}", student_name, title)),
                CallbackData::Review(submission.id).encode(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Create the grade picker shown under a submission being reviewed
pub fn create_grade_keyboard(
    submission_id: i64,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            format!(
                "✅ {}",
                t_lang(localization, "grade-approve-button", language_code)
            ),
            CallbackData::Grade(submission_id, SubmissionStatus::Approved).encode(),
        ),
        InlineKeyboardButton::callback(
            format!(
                "🔄 {}",
                t_lang(localization, "grade-revise-button", language_code)
            ),
            CallbackData::Grade(submission_id, SubmissionStatus::NeedsRevision).encode(),
        ),
    ]])
}

/// Format assignments as a numbered list with course names and due dates
pub fn format_assignments_list(
    assignments: &[(Assignment, String)],
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let mut result = String::new();

    for (i, (assignment, course_name)) in assignments.iter().enumerate() {
        let due_display = match assignment.due_date {
            Some(date) => format!(
                " — {} {}",
                t_lang(localization, "due-label", language_code),
                date.format("%Y-%m-%d")
            ),
            None => String::new(),
        };
        result.push_str(&format!(
            "{}. **{}** ({}){}\n",
            i + 1,
            assignment.title,
            course_name,
            due_display
        ));
    }

    result
}

/// Format a student's submissions with their statuses and teacher comments
pub fn format_submission_status_list(
    submissions: &[(Submission, String)],
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let mut result = String::new();

    for (i, (submission, assignment_title)) in submissions.iter().enumerate() {
        result.push_str(&format!(
            "{}. **{}** — {}\n",
            i + 1,
            assignment_title,
            status_label(submission.status, localization, language_code)
        ));
        if let Some(ref comment) = submission.teacher_comment {
            result.push_str(&format!(
                "   💬 {}: {}\n",
                t_lang(localization, "comment-label", language_code),
                comment
            ));
        }
    }

    result
}
