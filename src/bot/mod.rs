//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `callback_data`: typed grammar for inline keyboard payloads
//! - `callback_handler`: handles inline keyboard button presses
//! - `command_handlers`: handles slash commands, role-gated
//! - `dialogue_manager`: advances the multi-step conversation flows
//! - `message_handler`: routes incoming text messages
//! - `ui_builder`: creates keyboards and formats messages

pub mod callback_data;
pub mod callback_handler;
pub mod command_handlers;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use crate::localization::LocalizationManager;
use teloxide::Bot;

/// Common context for bot handlers containing shared dependencies
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub localization: &'a std::sync::Arc<LocalizationManager>,
    pub language_code: Option<&'a str>,
}

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

// Re-export the callback grammar for tests and keyboards
pub use callback_data::CallbackData;
