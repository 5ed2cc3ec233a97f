//! Dialogue Manager module for handling dialogue state transitions
//!
//! Each handler receives the free-text input for one step, validates it,
//! replies, and either advances the dialogue or leaves it in place so the
//! user can try again.

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::db::{self, Role, SubmissionStatus, User};
use crate::dialogue::{HomeworkDialogue, HomeworkDialogueState};
use crate::errors::error_logging;
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::validation::{
    validate_description, validate_due_date, validate_email, validate_grade_comment,
    validate_person_name, validate_submission_link, validate_title,
};

use super::ui_builder::{create_role_keyboard, create_teacher_pick_keyboard, status_label};

/// Input that skips an optional step (due date, grading comment)
fn is_skip(input: &str) -> bool {
    matches!(input.trim(), "skip" | "-" | "пропустить")
}

/// Common context for dialogue step handlers
pub struct DialogueContext<'a> {
    pub bot: &'a Bot,
    pub msg: &'a Message,
    pub dialogue: HomeworkDialogue,
    pub localization: &'a Arc<LocalizationManager>,
    pub language_code: Option<&'a str>,
}

/// Parameters for completing a registration after the role button press
pub struct RegistrationSubmitParams<'a> {
    pub pool: &'a SqlitePool,
    pub admin_chat_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub requested_role: Role,
}

/// Handle the first-name step of registration
pub async fn handle_register_first_name(ctx: DialogueContext<'_>, input: &str) -> Result<()> {
    match validate_person_name(input) {
        Ok(first_name) => {
            ctx.dialogue
                .update(HomeworkDialogueState::RegisterLastName {
                    first_name: first_name.to_string(),
                })
                .await?;
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "register-ask-last-name", ctx.language_code),
                )
                .await?;
        }
        Err(key) => {
            error_logging::log_validation_error(
                &key,
                "register_first_name",
                Some(ctx.msg.chat.id.0),
                "name",
                Some(input),
            );
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
            // Dialogue stays in place, user can try again
        }
    }
    Ok(())
}

/// Handle the last-name step of registration
pub async fn handle_register_last_name(
    ctx: DialogueContext<'_>,
    first_name: String,
    input: &str,
) -> Result<()> {
    match validate_person_name(input) {
        Ok(last_name) => {
            ctx.dialogue
                .update(HomeworkDialogueState::RegisterEmail {
                    first_name,
                    last_name: last_name.to_string(),
                })
                .await?;
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "register-ask-email", ctx.language_code),
                )
                .await?;
        }
        Err(key) => {
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
        }
    }
    Ok(())
}

/// Handle the email step of registration, then offer the role picker
pub async fn handle_register_email(
    ctx: DialogueContext<'_>,
    first_name: String,
    last_name: String,
    input: &str,
) -> Result<()> {
    match validate_email(input) {
        Ok(email) => {
            ctx.dialogue
                .update(HomeworkDialogueState::RegisterRole {
                    first_name,
                    last_name,
                    email: email.to_string(),
                })
                .await?;
            let keyboard = create_role_keyboard(ctx.localization, ctx.language_code);
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "register-ask-role", ctx.language_code),
                )
                .reply_markup(keyboard)
                .await?;
        }
        Err(key) => {
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
        }
    }
    Ok(())
}

/// Store the finished registration request and notify the administrator
///
/// Called from the callback handler once a role button is pressed. The
/// requester's chat id comes from the callback query.
pub async fn complete_registration(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &HomeworkDialogue,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    params: RegistrationSubmitParams<'_>,
) -> Result<()> {
    let RegistrationSubmitParams {
        pool,
        admin_chat_id,
        first_name,
        last_name,
        email,
        requested_role,
    } = params;

    let request_id = db::create_registration_request(
        pool,
        chat_id.0,
        &first_name,
        &last_name,
        &email,
        requested_role,
    )
    .await?;
    dialogue.exit().await?;

    info!(chat_id = %chat_id, request_id = %request_id, "Registration request submitted");

    bot.send_message(
        chat_id,
        t_lang(localization, "register-sent", language_code),
    )
    .await?;

    // Notifications to the admin go out in the fallback language; we don't
    // know the admin's Telegram locale here.
    let admin_text = t_args_lang(
        localization,
        "admin-new-request",
        &[
            ("name", &format!("{} {}", first_name, last_name)),
            ("role", requested_role.as_str()),
        ],
        None,
    );
    if let Err(e) = bot.send_message(ChatId(admin_chat_id), admin_text).await {
        error_logging::log_telegram_error(&e, "notify_admin_new_request", admin_chat_id);
    }

    Ok(())
}

/// Handle the course-name step of course creation
pub async fn handle_course_name_input(
    ctx: DialogueContext<'_>,
    pool: &SqlitePool,
    input: &str,
) -> Result<()> {
    match validate_title(input) {
        Ok(name) => {
            let teachers = db::list_users_by_role(pool, Role::Teacher).await?;
            if teachers.is_empty() {
                // No teacher to attach means the course could never hold
                // assignments; make the admin register a teacher first.
                ctx.dialogue.exit().await?;
                ctx.bot
                    .send_message(
                        ctx.msg.chat.id,
                        t_lang(ctx.localization, "newcourse-no-teachers", ctx.language_code),
                    )
                    .await?;
                return Ok(());
            }

            ctx.dialogue
                .update(HomeworkDialogueState::CourseTeacher {
                    name: name.to_string(),
                })
                .await?;
            let keyboard = create_teacher_pick_keyboard(&teachers);
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "newcourse-ask-teacher", ctx.language_code),
                )
                .reply_markup(keyboard)
                .await?;
        }
        Err(key) => {
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
        }
    }
    Ok(())
}

/// Handle the title step of assignment creation
pub async fn handle_assignment_title_input(
    ctx: DialogueContext<'_>,
    course_id: i64,
    input: &str,
) -> Result<()> {
    match validate_title(input) {
        Ok(title) => {
            ctx.dialogue
                .update(HomeworkDialogueState::AssignmentDescription {
                    course_id,
                    title: title.to_string(),
                })
                .await?;
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "assignment-ask-description", ctx.language_code),
                )
                .await?;
        }
        Err(key) => {
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
        }
    }
    Ok(())
}

/// Handle the description step of assignment creation
pub async fn handle_assignment_description_input(
    ctx: DialogueContext<'_>,
    course_id: i64,
    title: String,
    input: &str,
) -> Result<()> {
    let description = match validate_description(input) {
        Ok(description) => description,
        Err(key) => {
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
            return Ok(());
        }
    };

    ctx.dialogue
        .update(HomeworkDialogueState::AssignmentDueDate {
            course_id,
            title,
            description: description.to_string(),
        })
        .await?;
    ctx.bot
        .send_message(
            ctx.msg.chat.id,
            t_lang(ctx.localization, "assignment-ask-due-date", ctx.language_code),
        )
        .await?;
    Ok(())
}

/// Handle the due-date step of assignment creation, then store it
pub async fn handle_assignment_due_date_input(
    ctx: DialogueContext<'_>,
    pool: &SqlitePool,
    course_id: i64,
    title: String,
    description: String,
    input: &str,
) -> Result<()> {
    let due_date = if is_skip(input) {
        None
    } else {
        match validate_due_date(input) {
            Ok(date) => Some(date),
            Err(key) => {
                ctx.bot
                    .send_message(
                        ctx.msg.chat.id,
                        t_lang(ctx.localization, key, ctx.language_code),
                    )
                    .await?;
                return Ok(());
            }
        }
    };

    let assignment_id =
        db::create_assignment(pool, course_id, &title, &description, due_date).await?;
    ctx.dialogue.exit().await?;

    debug!(assignment_id = %assignment_id, "Assignment created via dialogue");
    ctx.bot
        .send_message(
            ctx.msg.chat.id,
            t_args_lang(
                ctx.localization,
                "assignment-created",
                &[("title", title.as_str())],
                ctx.language_code,
            ),
        )
        .await?;
    Ok(())
}

/// Handle the solution-link step of submission, then store and notify
pub async fn handle_submit_link_input(
    ctx: DialogueContext<'_>,
    pool: &SqlitePool,
    assignment_id: i64,
    student: &User,
    input: &str,
) -> Result<()> {
    let link = match validate_submission_link(input) {
        Ok(link) => link,
        Err(key) => {
            error_logging::log_validation_error(
                &key,
                "submit_link",
                Some(ctx.msg.chat.id.0),
                "link",
                Some(input),
            );
            ctx.bot
                .send_message(ctx.msg.chat.id, t_lang(ctx.localization, key, ctx.language_code))
                .await?;
            return Ok(());
        }
    };

    let assignment = match db::get_assignment(pool, assignment_id).await? {
        Some(assignment) => assignment,
        None => {
            // Assignment deleted while the dialogue was open
            ctx.dialogue.exit().await?;
            ctx.bot
                .send_message(
                    ctx.msg.chat.id,
                    t_lang(ctx.localization, "assignment-gone", ctx.language_code),
                )
                .await?;
            return Ok(());
        }
    };

    db::upsert_submission(pool, assignment_id, student.id, link).await?;
    ctx.dialogue.exit().await?;

    ctx.bot
        .send_message(
            ctx.msg.chat.id,
            t_args_lang(
                ctx.localization,
                "submit-stored",
                &[("title", assignment.title.as_str())],
                ctx.language_code,
            ),
        )
        .await?;

    // Tell the course teacher there is something to review
    if let Some(course) = db::get_course(pool, assignment.course_id).await? {
        if let Some(teacher_id) = course.teacher_id {
            if let Some(teacher) = db::get_user_by_id(pool, teacher_id).await? {
                let text = t_args_lang(
                    ctx.localization,
                    "submit-teacher-notify",
                    &[
                        ("student", &student.display_name()),
                        ("title", assignment.title.as_str()),
                        ("link", link),
                    ],
                    None,
                );
                if let Err(e) = ctx.bot.send_message(ChatId(teacher.chat_id), text).await {
                    error_logging::log_telegram_error(
                        &e,
                        "notify_teacher_new_submission",
                        teacher.chat_id,
                    );
                }
            }
        }
    }

    Ok(())
}

/// Handle the comment step of grading, then store and notify the student
pub async fn handle_grade_comment_input(
    ctx: DialogueContext<'_>,
    pool: &SqlitePool,
    submission_id: i64,
    status: SubmissionStatus,
    input: &str,
) -> Result<()> {
    let comment = if is_skip(input) {
        None
    } else {
        match validate_grade_comment(input) {
            Ok(comment) => Some(comment),
            Err(key) => {
                ctx.bot
                    .send_message(
                        ctx.msg.chat.id,
                        t_lang(ctx.localization, key, ctx.language_code),
                    )
                    .await?;
                return Ok(());
            }
        }
    };

    let submission = db::get_submission(pool, submission_id).await?;
    let graded = db::grade_submission(pool, submission_id, status, comment).await?;
    ctx.dialogue.exit().await?;

    if !graded {
        ctx.bot
            .send_message(
                ctx.msg.chat.id,
                t_lang(ctx.localization, "submission-gone", ctx.language_code),
            )
            .await?;
        return Ok(());
    }

    ctx.bot
        .send_message(
            ctx.msg.chat.id,
            t_args_lang(
                ctx.localization,
                "grade-done",
                &[(
                    "status",
                    &status_label(status, ctx.localization, ctx.language_code),
                )],
                ctx.language_code,
            ),
        )
        .await?;

    // Push the status change to the student's chat
    if let Some(submission) = submission {
        if let Some(student) = db::get_user_by_id(pool, submission.student_id).await? {
            if let Some(assignment) = db::get_assignment(pool, submission.assignment_id).await? {
                let status_text = status_label(status, ctx.localization, None);
                let mut args: Vec<(&str, &str)> = vec![
                    ("title", assignment.title.as_str()),
                    ("status", status_text.as_str()),
                ];
                let comment_owned;
                if let Some(comment) = comment {
                    comment_owned = comment.to_string();
                    args.push(("comment", comment_owned.as_str()));
                }
                let key = if comment.is_some() {
                    "grade-student-notify-comment"
                } else {
                    "grade-student-notify"
                };
                let text = t_args_lang(ctx.localization, key, &args, None);
                if let Err(e) = ctx.bot.send_message(ChatId(student.chat_id), text).await {
                    error_logging::log_telegram_error(
                        &e,
                        "notify_student_graded",
                        student.chat_id,
                    );
                }
            }
        }
    }

    Ok(())
}
