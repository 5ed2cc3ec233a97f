//! # Homework Tracker Telegram Bot
//!
//! A Telegram bot for tracking homework: users register through a multi-step
//! conversation, an administrator approves them into a role, teachers create
//! courses and assignments, students submit solution links, and teachers
//! grade submissions. All state lives in a SQLite database.

pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod validation;

// Re-export types for easier access
pub use db::{Assignment, Course, RegistrationRequest, Role, Submission, SubmissionStatus, User};
pub use dialogue::{HomeworkDialogue, HomeworkDialogueState};
