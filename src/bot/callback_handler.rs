//! Callback handler for inline keyboard button presses
//!
//! Every payload goes through [`CallbackData::parse`]; unknown or stale
//! payloads are answered and dropped so old keyboards can't wedge a chat.

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::MaybeInaccessibleMessage;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::AppConfig;
use crate::db::{self, Role, SubmissionStatus};
use crate::dialogue::{HomeworkDialogue, HomeworkDialogueState};
use crate::errors::error_logging;
use crate::localization::{t_args_lang, t_lang, LocalizationManager};

use super::callback_data::CallbackData;
use super::command_handlers::COURSES_PAGE_SIZE;
use super::dialogue_manager::{complete_registration, RegistrationSubmitParams};
use super::ui_builder::{
    create_courses_pagination_keyboard, create_grade_keyboard, format_assignments_list,
};
use super::HandlerContext;

/// Entry point wired into the dispatcher for `Update::filter_callback_query()`
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    pool: Arc<SqlitePool>,
    localization: Arc<LocalizationManager>,
    config: Arc<AppConfig>,
    storage: Arc<InMemStorage<HomeworkDialogueState>>,
) -> Result<()> {
    let span = info_span!("callback", from = %q.from.id);
    async {
        // Always answer so the button's spinner stops
        bot.answer_callback_query(q.id.clone()).await?;

        let chat_id = match &q.message {
            Some(MaybeInaccessibleMessage::Regular(msg)) => msg.chat.id,
            _ => ChatId::from(q.from.id),
        };
        let message_id = match &q.message {
            Some(MaybeInaccessibleMessage::Regular(msg)) => Some(msg.id),
            _ => None,
        };

        let data = match q.data.as_deref().and_then(CallbackData::parse) {
            Some(data) => data,
            None => {
                warn!(data = ?q.data, "Ignoring unrecognized callback payload");
                return Ok(());
            }
        };

        let language_code = q.from.language_code.as_deref();

        // Payloads are caller-supplied bytes: anyone can press a button in a
        // forwarded message or craft one through the API. The presser's role
        // is resolved from the database before any branch runs, same as the
        // command dispatch does for text.
        let caller = db::get_user_by_chat_id(&pool, ChatId::from(q.from.id).0).await?;
        match (required_access(data), caller.as_ref()) {
            (Access::Open, _) => {}
            (Access::Registered, Some(_)) => {}
            (Access::Only(role), Some(user)) if user.role == role => {}
            (_, None) => {
                bot.send_message(chat_id, t_lang(&localization, "not-registered", language_code))
                    .await?;
                return Ok(());
            }
            _ => {
                warn!(data = ?q.data, "Callback denied for caller's role");
                bot.send_message(chat_id, t_lang(&localization, "not-allowed", language_code))
                    .await?;
                return Ok(());
            }
        }

        let ctx = HandlerContext {
            bot: &bot,
            localization: &localization,
            language_code,
        };
        let dialogue = HomeworkDialogue::new(storage, chat_id);

        let outcome = match data {
            CallbackData::Noop => Ok(()),
            CallbackData::Role(role) => {
                handle_role_choice(&ctx, &pool, &config, chat_id, dialogue, role).await
            }
            CallbackData::Approve(request_id) => {
                handle_approve(&ctx, &pool, chat_id, request_id).await
            }
            CallbackData::Reject(request_id) => {
                handle_reject(&ctx, &pool, chat_id, request_id).await
            }
            CallbackData::Course(course_id) => {
                handle_show_course(&ctx, &pool, chat_id, course_id).await
            }
            CallbackData::AssignCourse(course_id) => {
                handle_assign_course(&ctx, chat_id, dialogue, course_id).await
            }
            CallbackData::Teacher(teacher_id) => {
                handle_teacher_choice(&ctx, &pool, chat_id, dialogue, teacher_id).await
            }
            CallbackData::Submit(assignment_id) => {
                handle_submit_choice(&ctx, chat_id, dialogue, assignment_id).await
            }
            CallbackData::Review(submission_id) => {
                handle_review_choice(&ctx, &pool, chat_id, submission_id).await
            }
            CallbackData::Grade(submission_id, status) => {
                handle_grade_choice(&ctx, chat_id, dialogue, submission_id, status).await
            }
            CallbackData::Page(page) => {
                handle_page_flip(&ctx, &pool, chat_id, message_id, page).await
            }
        };

        if let Err(e) = outcome {
            error_logging::log_dialogue_error(&e, "callback_handler", chat_id.0);
        }
        Ok(())
    }
    .instrument(span)
    .await
}

/// Who may act on a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// No account needed (registration flow, inert buttons)
    Open,
    /// Any registered user
    Registered,
    /// Exactly this role
    Only(Role),
}

fn required_access(data: CallbackData) -> Access {
    match data {
        CallbackData::Noop | CallbackData::Role(_) => Access::Open,
        CallbackData::Course(_) | CallbackData::Page(_) => Access::Registered,
        CallbackData::Approve(_) | CallbackData::Reject(_) | CallbackData::Teacher(_) => {
            Access::Only(Role::Admin)
        }
        CallbackData::AssignCourse(_)
        | CallbackData::Review(_)
        | CallbackData::Grade(_, _) => Access::Only(Role::Teacher),
        CallbackData::Submit(_) => Access::Only(Role::Student),
    }
}

/// Role button during registration: the request is complete, store it
async fn handle_role_choice(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    config: &AppConfig,
    chat_id: ChatId,
    dialogue: HomeworkDialogue,
    role: Role,
) -> Result<()> {
    match dialogue.get().await? {
        Some(HomeworkDialogueState::RegisterRole {
            first_name,
            last_name,
            email,
        }) => {
            complete_registration(
                ctx.bot,
                chat_id,
                &dialogue,
                ctx.localization,
                ctx.language_code,
                RegistrationSubmitParams {
                    pool,
                    admin_chat_id: config.admin.chat_id,
                    first_name,
                    last_name,
                    email,
                    requested_role: role,
                },
            )
            .await
        }
        other => {
            debug!(state = ?other.map(|s| s.name()), "Role button outside registration, ignoring");
            Ok(())
        }
    }
}

async fn handle_approve(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    request_id: i64,
) -> Result<()> {
    match db::approve_registration(pool, request_id).await? {
        Some(user) => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_args_lang(
                        ctx.localization,
                        "request-approved-admin",
                        &[("name", &user.display_name())],
                        ctx.language_code,
                    ),
                )
                .await?;
            // The approved user gets the notification in the fallback
            // language; their Telegram locale is not stored.
            let text = t_lang(ctx.localization, "request-approved", None);
            if let Err(e) = ctx.bot.send_message(ChatId(user.chat_id), text).await {
                error_logging::log_telegram_error(&e, "notify_user_approved", user.chat_id);
            }
        }
        None => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_lang(ctx.localization, "request-gone", ctx.language_code),
                )
                .await?;
        }
    }
    Ok(())
}

async fn handle_reject(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    request_id: i64,
) -> Result<()> {
    match db::reject_registration(pool, request_id).await? {
        Some(request) => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_args_lang(
                        ctx.localization,
                        "request-rejected-admin",
                        &[("name", &format!("{} {}", request.first_name, request.last_name))],
                        ctx.language_code,
                    ),
                )
                .await?;
            let text = t_lang(ctx.localization, "request-rejected-user", None);
            if let Err(e) = ctx.bot.send_message(ChatId(request.chat_id), text).await {
                error_logging::log_telegram_error(&e, "notify_user_rejected", request.chat_id);
            }
        }
        None => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_lang(ctx.localization, "request-gone", ctx.language_code),
                )
                .await?;
        }
    }
    Ok(())
}

/// Course button on the course list: show that course's assignments
async fn handle_show_course(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    course_id: i64,
) -> Result<()> {
    let course = match db::get_course(pool, course_id).await? {
        Some(course) => course,
        None => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_lang(ctx.localization, "course-gone", ctx.language_code),
                )
                .await?;
            return Ok(());
        }
    };

    let assignments = db::list_assignments_by_course(pool, course_id).await?;
    if assignments.is_empty() {
        ctx.bot
            .send_message(
                chat_id,
                t_args_lang(
                    ctx.localization,
                    "course-no-assignments",
                    &[("name", course.name.as_str())],
                    ctx.language_code,
                ),
            )
            .await?;
        return Ok(());
    }

    let pairs: Vec<_> = assignments
        .into_iter()
        .map(|assignment| (assignment, course.name.clone()))
        .collect();
    let header = t_args_lang(
        ctx.localization,
        "course-assignments-title",
        &[("name", course.name.as_str())],
        ctx.language_code,
    );
    let body = format_assignments_list(&pairs, ctx.localization, ctx.language_code);
    ctx.bot
        .send_message(chat_id, format!("{}\n\n{}", header, body))
        .await?;
    Ok(())
}

/// Course picked for a new assignment: ask for the title
async fn handle_assign_course(
    ctx: &HandlerContext<'_>,
    chat_id: ChatId,
    dialogue: HomeworkDialogue,
    course_id: i64,
) -> Result<()> {
    dialogue
        .update(HomeworkDialogueState::AssignmentTitle { course_id })
        .await?;
    ctx.bot
        .send_message(
            chat_id,
            t_lang(ctx.localization, "assignment-ask-title", ctx.language_code),
        )
        .await?;
    Ok(())
}

/// Teacher picked for a new course: create it
async fn handle_teacher_choice(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    dialogue: HomeworkDialogue,
    teacher_id: i64,
) -> Result<()> {
    let name = match dialogue.get().await? {
        Some(HomeworkDialogueState::CourseTeacher { name }) => name,
        other => {
            debug!(state = ?other.map(|s| s.name()), "Teacher button outside course creation, ignoring");
            return Ok(());
        }
    };

    let course_id = db::create_course(pool, &name, Some(teacher_id)).await?;
    dialogue.exit().await?;

    debug!(course_id = %course_id, "Course created via dialogue");
    ctx.bot
        .send_message(
            chat_id,
            t_args_lang(
                ctx.localization,
                "course-created",
                &[("name", name.as_str())],
                ctx.language_code,
            ),
        )
        .await?;
    Ok(())
}

/// Assignment picked for submission: ask for the solution link
async fn handle_submit_choice(
    ctx: &HandlerContext<'_>,
    chat_id: ChatId,
    dialogue: HomeworkDialogue,
    assignment_id: i64,
) -> Result<()> {
    dialogue
        .update(HomeworkDialogueState::SubmitLink { assignment_id })
        .await?;
    ctx.bot
        .send_message(
            chat_id,
            t_lang(ctx.localization, "submit-ask-link", ctx.language_code),
        )
        .await?;
    Ok(())
}

/// Submission picked for review: show its details with the grade buttons
async fn handle_review_choice(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    submission_id: i64,
) -> Result<()> {
    let submission = match db::get_submission(pool, submission_id).await? {
        Some(submission) => submission,
        None => {
            ctx.bot
                .send_message(
                    chat_id,
                    t_lang(ctx.localization, "submission-gone", ctx.language_code),
                )
                .await?;
            return Ok(());
        }
    };

    let assignment_title = match db::get_assignment(pool, submission.assignment_id).await? {
        Some(assignment) => assignment.title,
        None => String::new(),
    };
    let student_name = match db::get_user_by_id(pool, submission.student_id).await? {
        Some(student) => student.display_name(),
        None => String::new(),
    };

    let text = t_args_lang(
        ctx.localization,
        "review-detail",
        &[
            ("student", student_name.as_str()),
            ("title", assignment_title.as_str()),
            ("link", submission.link.as_str()),
        ],
        ctx.language_code,
    );
    let keyboard = create_grade_keyboard(submission_id, ctx.localization, ctx.language_code);
    ctx.bot
        .send_message(chat_id, text)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Grade button pressed: ask for the optional comment
async fn handle_grade_choice(
    ctx: &HandlerContext<'_>,
    chat_id: ChatId,
    dialogue: HomeworkDialogue,
    submission_id: i64,
    status: SubmissionStatus,
) -> Result<()> {
    dialogue
        .update(HomeworkDialogueState::GradeComment {
            submission_id,
            status,
        })
        .await?;
    ctx.bot
        .send_message(
            chat_id,
            t_lang(ctx.localization, "grade-ask-comment", ctx.language_code),
        )
        .await?;
    Ok(())
}

/// Row offset for a page number, saturating so an absurd forged page
/// number cannot overflow the multiplication.
fn page_offset(page: i64) -> i64 {
    page.max(0).saturating_mul(COURSES_PAGE_SIZE)
}

/// Pagination arrow on the course list: swap the keyboard in place
async fn handle_page_flip(
    ctx: &HandlerContext<'_>,
    pool: &SqlitePool,
    chat_id: ChatId,
    message_id: Option<teloxide::types::MessageId>,
    page: i64,
) -> Result<()> {
    let page = page.max(0);
    let (courses, total_count) =
        db::get_courses_paginated(pool, COURSES_PAGE_SIZE, page_offset(page)).await?;
    let keyboard = create_courses_pagination_keyboard(
        &courses,
        page,
        total_count,
        COURSES_PAGE_SIZE,
        ctx.localization,
        ctx.language_code,
    );

    match message_id {
        Some(message_id) => {
            ctx.bot
                .edit_message_reply_markup(chat_id, message_id)
                .reply_markup(keyboard)
                .await?;
        }
        None => {
            // Original message is inaccessible, send the page fresh
            ctx.bot
                .send_message(
                    chat_id,
                    t_lang(ctx.localization, "courses-title", ctx.language_code),
                )
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(())
}
