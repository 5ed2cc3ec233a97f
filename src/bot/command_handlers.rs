//! Command Handlers module for processing bot commands
//!
//! Role checks happen in the message handler before these are called; each
//! handler here only implements the command itself.

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::db::{self, Role, User};
use crate::dialogue::{HomeworkDialogue, HomeworkDialogueState};
use crate::localization::{t_args_lang, t_lang, LocalizationManager};

use super::ui_builder::{
    create_courses_pagination_keyboard, create_course_pick_keyboard, create_request_keyboard,
    create_review_keyboard, create_submit_keyboard, format_assignments_list,
    format_submission_status_list, role_label,
};

/// Courses shown per page of the `/courses` keyboard
pub const COURSES_PAGE_SIZE: i64 = 5;

/// Handle the /start command
pub async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    user: Option<&User>,
) -> Result<()> {
    let welcome_message = match user {
        Some(user) => t_args_lang(
            localization,
            "welcome-registered",
            &[
                ("name", user.first_name.as_str()),
                (
                    "role",
                    &role_label(user.role, localization, language_code),
                ),
            ],
            language_code,
        ),
        None => t_lang(localization, "welcome-unregistered", language_code),
    };

    let full_message = format!(
        "👋 **{}**\n\n{}",
        t_lang(localization, "welcome-title", language_code),
        welcome_message
    );
    bot.send_message(msg.chat.id, full_message).await?;
    Ok(())
}

/// Handle the /help command, listing the commands the caller's role allows
pub async fn handle_help_command(
    bot: &Bot,
    msg: &Message,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    user: Option<&User>,
) -> Result<()> {
    let role_key = match user.map(|u| u.role) {
        Some(Role::Student) => "help-student",
        Some(Role::Teacher) => "help-teacher",
        Some(Role::Admin) => "help-admin",
        None => "help-unregistered",
    };

    let help_message = format!(
        "**{}**\n\n{}\n\n{}",
        t_lang(localization, "help-title", language_code),
        t_lang(localization, "help-common", language_code),
        t_lang(localization, role_key, language_code)
    );
    bot.send_message(msg.chat.id, help_message).await?;
    Ok(())
}

/// Handle the /cancel command, resetting any in-flight dialogue
pub async fn handle_cancel_command(
    bot: &Bot,
    msg: &Message,
    dialogue: HomeworkDialogue,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    let key = match dialogue.get().await? {
        Some(HomeworkDialogueState::Idle) | None => "cancel-nothing",
        Some(_) => "cancel-done",
    };
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, t_lang(localization, key, language_code))
        .await?;
    Ok(())
}

/// Handle the /register command, starting the registration flow
pub async fn handle_register_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    dialogue: HomeworkDialogue,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /register command");

    if db::get_user_by_chat_id(&pool, msg.chat.id.0).await?.is_some() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "register-already", language_code),
        )
        .await?;
        return Ok(());
    }

    dialogue.update(HomeworkDialogueState::RegisterFirstName).await?;
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "register-ask-first-name", language_code),
    )
    .await?;
    Ok(())
}

/// Handle the /courses command, showing the paginated course list
pub async fn handle_courses_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /courses command");

    let (courses, total_count) = db::get_courses_paginated(&pool, COURSES_PAGE_SIZE, 0).await?;

    if courses.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "courses-none", language_code),
        )
        .await?;
    } else {
        let keyboard = create_courses_pagination_keyboard(
            &courses,
            0,
            total_count,
            COURSES_PAGE_SIZE,
            localization,
            language_code,
        );
        bot.send_message(
            msg.chat.id,
            format!(
                "📚 **{}**",
                t_lang(localization, "courses-title", language_code)
            ),
        )
        .reply_markup(keyboard)
        .await?;
    }

    Ok(())
}

/// Handle the /newcourse command (admin only), starting the course flow
pub async fn handle_new_course_command(
    bot: &Bot,
    msg: &Message,
    dialogue: HomeworkDialogue,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    dialogue.update(HomeworkDialogueState::CourseName).await?;
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "newcourse-ask-name", language_code),
    )
    .await?;
    Ok(())
}

/// Handle the /newassignment command (teacher only)
///
/// Offers the teacher's own courses; the rest of the flow continues from
/// the course-pick callback.
pub async fn handle_new_assignment_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    teacher: &User,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /newassignment command");

    let courses = db::list_courses_by_teacher(&pool, teacher.id).await?;
    if courses.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "newassignment-no-courses", language_code),
        )
        .await?;
        return Ok(());
    }

    let keyboard = create_course_pick_keyboard(&courses);
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "newassignment-choose-course", language_code),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

/// Handle the /assignments command, listing assignments with due dates
pub async fn handle_assignments_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /assignments command");

    let assignments = db::list_assignments_with_course(&pool).await?;
    if assignments.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "assignments-none", language_code),
        )
        .await?;
    } else {
        let message = format!(
            "📋 **{}**\n\n{}",
            t_lang(localization, "assignments-title", language_code),
            format_assignments_list(&assignments, localization, language_code)
        );
        bot.send_message(msg.chat.id, message).await?;
    }
    Ok(())
}

/// Handle the /submit command (student only), offering assignments to pick
pub async fn handle_submit_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /submit command");

    let assignments = db::list_assignments_with_course(&pool).await?;
    if assignments.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "submit-no-assignments", language_code),
        )
        .await?;
        return Ok(());
    }

    let keyboard = create_submit_keyboard(&assignments);
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "submit-choose-assignment", language_code),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

/// Handle the /status command (student only), listing own submissions
pub async fn handle_status_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    student: &User,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /status command");

    let submissions = db::list_submissions_by_student(&pool, student.id).await?;
    if submissions.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "status-none", language_code),
        )
        .await?;
    } else {
        let message = format!(
            "📊 **{}**\n\n{}",
            t_lang(localization, "status-title", language_code),
            format_submission_status_list(&submissions, localization, language_code)
        );
        bot.send_message(msg.chat.id, message).await?;
    }
    Ok(())
}

/// Handle the /review command (teacher only), listing ungraded submissions
pub async fn handle_review_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    teacher: &User,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /review command");

    let submissions = db::list_ungraded_submissions_for_teacher(&pool, teacher.id).await?;
    if submissions.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "review-none", language_code),
        )
        .await?;
        return Ok(());
    }

    let keyboard = create_review_keyboard(&submissions);
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "review-choose", language_code),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

/// Handle the /requests command (admin only)
///
/// Each pending registration is sent as its own message with an
/// approve/reject keyboard attached, so decisions stay independent.
pub async fn handle_requests_command(
    bot: &Bot,
    msg: &Message,
    pool: Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Handling /requests command");

    let requests = db::list_registration_requests(&pool).await?;
    if requests.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_lang(localization, "requests-none", language_code),
        )
        .await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "📥 **{}**",
            t_lang(localization, "requests-title", language_code)
        ),
    )
    .await?;

    for request in requests {
        let text = t_args_lang(
            localization,
            "request-summary",
            &[
                (
                    "name",
                    &format!("{} {}", request.first_name, request.last_name),
                ),
                ("email", request.email.as_str()),
                (
                    "role",
                    &role_label(request.requested_role, localization, language_code),
                ),
            ],
            language_code,
        );
        let keyboard = create_request_keyboard(request.id, localization, language_code);
        bot.send_message(msg.chat.id, text)
            .reply_markup(keyboard)
            .await?;
    }

    Ok(())
}

/// Reply when a command exists but the caller's role doesn't allow it
pub async fn handle_not_allowed(
    bot: &Bot,
    msg: &Message,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "not-allowed", language_code),
    )
    .await?;
    Ok(())
}

/// Reply when a command requires registration first
pub async fn handle_not_registered(
    bot: &Bot,
    msg: &Message,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        t_lang(localization, "not-registered", language_code),
    )
    .await?;
    Ok(())
}
