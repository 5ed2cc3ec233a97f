//! Message handler for incoming Telegram messages
//!
//! Text routing is dialogue-state-first: when a multi-step flow is open the
//! message is fed to the matching step handler, otherwise it is dispatched as
//! a command. Role checks happen here so the command handlers can assume a
//! permitted caller.

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::{debug, info_span, Instrument};

use crate::db::{self, Role, User};
use crate::dialogue::{HomeworkDialogue, HomeworkDialogueState};
use crate::errors::error_logging;
use crate::localization::{t_lang, LocalizationManager};

use super::command_handlers::{
    handle_assignments_command, handle_cancel_command, handle_courses_command,
    handle_help_command, handle_new_assignment_command, handle_new_course_command,
    handle_not_allowed, handle_not_registered, handle_register_command, handle_requests_command,
    handle_review_command, handle_start_command, handle_status_command, handle_submit_command,
};
use super::dialogue_manager::{
    handle_assignment_description_input, handle_assignment_due_date_input,
    handle_assignment_title_input, handle_course_name_input, handle_grade_comment_input,
    handle_register_email, handle_register_first_name, handle_register_last_name,
    handle_submit_link_input, DialogueContext,
};

/// Entry point wired into the dispatcher for `Update::filter_message()`
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    pool: Arc<SqlitePool>,
    localization: Arc<LocalizationManager>,
    storage: Arc<InMemStorage<HomeworkDialogueState>>,
) -> Result<()> {
    let span = info_span!("message", chat_id = %msg.chat.id, message_id = msg.id.0);
    async {
        let dialogue = HomeworkDialogue::new(storage, msg.chat.id);
        if let Err(e) = route_message(&bot, &msg, &pool, &localization, dialogue).await {
            error_logging::log_dialogue_error(&e, "route_message", msg.chat.id.0);
        }
        Ok(())
    }
    .instrument(span)
    .await
}

async fn route_message(
    bot: &Bot,
    msg: &Message,
    pool: &Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    dialogue: HomeworkDialogue,
) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_deref());

    let text = match msg.text() {
        Some(text) => text.trim(),
        None => {
            // Photos, stickers, voice notes and so on
            bot.send_message(
                msg.chat.id,
                t_lang(localization, "unsupported-message", language_code),
            )
            .await?;
            return Ok(());
        }
    };

    // /cancel aborts any flow regardless of the current state
    if command_word(text) == Some("/cancel") {
        return handle_cancel_command(bot, msg, dialogue, localization, language_code).await;
    }

    let state = dialogue.get().await?.unwrap_or_default();
    debug!(state = state.name(), "Routing text message");

    match state {
        HomeworkDialogueState::Idle => {
            dispatch_command(bot, msg, pool, localization, language_code, dialogue, text).await
        }
        HomeworkDialogueState::RegisterFirstName => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_register_first_name(ctx, text).await
        }
        HomeworkDialogueState::RegisterLastName { first_name } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_register_last_name(ctx, first_name, text).await
        }
        HomeworkDialogueState::RegisterEmail {
            first_name,
            last_name,
        } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_register_email(ctx, first_name, last_name, text).await
        }
        HomeworkDialogueState::RegisterRole { .. }
        | HomeworkDialogueState::CourseTeacher { .. } => {
            // These steps finish with an inline button, not text
            bot.send_message(
                msg.chat.id,
                t_lang(localization, "use-buttons", language_code),
            )
            .await?;
            Ok(())
        }
        HomeworkDialogueState::CourseName => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_course_name_input(ctx, pool, text).await
        }
        HomeworkDialogueState::AssignmentTitle { course_id } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_assignment_title_input(ctx, course_id, text).await
        }
        HomeworkDialogueState::AssignmentDescription { course_id, title } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_assignment_description_input(ctx, course_id, title, text).await
        }
        HomeworkDialogueState::AssignmentDueDate {
            course_id,
            title,
            description,
        } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_assignment_due_date_input(ctx, pool, course_id, title, description, text).await
        }
        HomeworkDialogueState::SubmitLink { assignment_id } => {
            match db::get_user_by_chat_id(pool, msg.chat.id.0).await? {
                Some(student) => {
                    let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
                    handle_submit_link_input(ctx, pool, assignment_id, &student, text).await
                }
                None => {
                    dialogue.exit().await?;
                    handle_not_registered(bot, msg, localization, language_code).await
                }
            }
        }
        HomeworkDialogueState::GradeComment {
            submission_id,
            status,
        } => {
            let ctx = step_ctx(bot, msg, dialogue, localization, language_code);
            handle_grade_comment_input(ctx, pool, submission_id, status, text).await
        }
    }
}

async fn dispatch_command(
    bot: &Bot,
    msg: &Message,
    pool: &Arc<SqlitePool>,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    dialogue: HomeworkDialogue,
    text: &str,
) -> Result<()> {
    let user = match db::get_user_by_chat_id(pool, msg.chat.id.0).await {
        Ok(user) => user,
        Err(e) => {
            error_logging::log_database_error(&e, "get_user_by_chat_id", Some(msg.chat.id.0));
            return Err(e);
        }
    };

    match command_word(text) {
        Some("/start") => {
            handle_start_command(bot, msg, localization, language_code, user.as_ref()).await
        }
        Some("/help") => {
            handle_help_command(bot, msg, localization, language_code, user.as_ref()).await
        }
        Some("/register") => {
            handle_register_command(bot, msg, Arc::clone(pool), dialogue, localization, language_code)
                .await
        }
        Some("/courses") => {
            if user.is_some() {
                handle_courses_command(bot, msg, Arc::clone(pool), localization, language_code)
                    .await
            } else {
                handle_not_registered(bot, msg, localization, language_code).await
            }
        }
        Some("/assignments") => {
            if user.is_some() {
                handle_assignments_command(bot, msg, Arc::clone(pool), localization, language_code)
                    .await
            } else {
                handle_not_registered(bot, msg, localization, language_code).await
            }
        }
        Some("/newcourse") => match require_role(user.as_ref(), Role::Admin) {
            RoleCheck::Allowed(_) => {
                handle_new_course_command(bot, msg, dialogue, localization, language_code).await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some("/newassignment") => match require_role(user.as_ref(), Role::Teacher) {
            RoleCheck::Allowed(teacher) => {
                handle_new_assignment_command(
                    bot,
                    msg,
                    Arc::clone(pool),
                    localization,
                    language_code,
                    teacher,
                )
                .await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some("/submit") => match require_role(user.as_ref(), Role::Student) {
            RoleCheck::Allowed(_) => {
                handle_submit_command(bot, msg, Arc::clone(pool), localization, language_code)
                    .await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some("/status") => match require_role(user.as_ref(), Role::Student) {
            RoleCheck::Allowed(student) => {
                handle_status_command(
                    bot,
                    msg,
                    Arc::clone(pool),
                    localization,
                    language_code,
                    student,
                )
                .await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some("/review") => match require_role(user.as_ref(), Role::Teacher) {
            RoleCheck::Allowed(teacher) => {
                handle_review_command(
                    bot,
                    msg,
                    Arc::clone(pool),
                    localization,
                    language_code,
                    teacher,
                )
                .await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some("/requests") => match require_role(user.as_ref(), Role::Admin) {
            RoleCheck::Allowed(_) => {
                handle_requests_command(bot, msg, Arc::clone(pool), localization, language_code)
                    .await
            }
            outcome => deny(bot, msg, localization, language_code, outcome).await,
        },
        Some(_) => {
            bot.send_message(
                msg.chat.id,
                t_lang(localization, "unknown-command", language_code),
            )
            .await?;
            Ok(())
        }
        None => {
            bot.send_message(
                msg.chat.id,
                t_lang(localization, "unsupported-message", language_code),
            )
            .await?;
            Ok(())
        }
    }
}

fn step_ctx<'a>(
    bot: &'a Bot,
    msg: &'a Message,
    dialogue: HomeworkDialogue,
    localization: &'a Arc<LocalizationManager>,
    language_code: Option<&'a str>,
) -> DialogueContext<'a> {
    DialogueContext {
        bot,
        msg,
        dialogue,
        localization,
        language_code,
    }
}

enum RoleCheck<'a> {
    Allowed(&'a User),
    WrongRole,
    NotRegistered,
}

fn require_role<'a>(user: Option<&'a User>, role: Role) -> RoleCheck<'a> {
    match user {
        Some(user) if user.role == role => RoleCheck::Allowed(user),
        Some(_) => RoleCheck::WrongRole,
        None => RoleCheck::NotRegistered,
    }
}

async fn deny(
    bot: &Bot,
    msg: &Message,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
    outcome: RoleCheck<'_>,
) -> Result<()> {
    match outcome {
        RoleCheck::NotRegistered => {
            handle_not_registered(bot, msg, localization, language_code).await
        }
        _ => handle_not_allowed(bot, msg, localization, language_code).await,
    }
}

/// First word of the message with any `@botname` suffix stripped,
/// only when it looks like a command.
fn command_word(text: &str) -> Option<&str> {
    let word = text.split_whitespace().next()?;
    if !word.starts_with('/') {
        return None;
    }
    Some(word.split('@').next().unwrap_or(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_word_parsing() {
        assert_eq!(command_word("/start"), Some("/start"));
        assert_eq!(command_word("/help@homework_bot extra"), Some("/help"));
        assert_eq!(command_word("hello"), None);
        assert_eq!(command_word(""), None);
    }
}
