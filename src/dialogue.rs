//! Conversation state machine for the multi-step bot flows.
//!
//! Each flow is a linear progression keyed by chat id: one field is
//! collected per step, invalid input re-prompts without advancing, and
//! `/cancel` resets to [`HomeworkDialogueState::Idle`]. State lives in
//! teloxide's `InMemStorage`, which is shared safely across concurrent
//! updates.

use crate::db::SubmissionStatus;
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Conversation state, one variant per pending prompt
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum HomeworkDialogueState {
    #[default]
    Idle,
    /// Registration: waiting for the first name
    RegisterFirstName,
    /// Registration: waiting for the last name
    RegisterLastName { first_name: String },
    /// Registration: waiting for the email address
    RegisterEmail {
        first_name: String,
        last_name: String,
    },
    /// Registration: waiting for a role button press
    RegisterRole {
        first_name: String,
        last_name: String,
        email: String,
    },
    /// Course creation: waiting for the course name
    CourseName,
    /// Course creation: waiting for a teacher button press
    CourseTeacher { name: String },
    /// Assignment creation: waiting for the title
    AssignmentTitle { course_id: i64 },
    /// Assignment creation: waiting for the description
    AssignmentDescription { course_id: i64, title: String },
    /// Assignment creation: waiting for a due date or "skip"
    AssignmentDueDate {
        course_id: i64,
        title: String,
        description: String,
    },
    /// Submission: waiting for the solution link
    SubmitLink { assignment_id: i64 },
    /// Grading: waiting for a comment or "skip"
    GradeComment {
        submission_id: i64,
        status: SubmissionStatus,
    },
}

impl HomeworkDialogueState {
    /// Short state name for log events
    pub fn name(&self) -> &'static str {
        match self {
            HomeworkDialogueState::Idle => "idle",
            HomeworkDialogueState::RegisterFirstName => "register_first_name",
            HomeworkDialogueState::RegisterLastName { .. } => "register_last_name",
            HomeworkDialogueState::RegisterEmail { .. } => "register_email",
            HomeworkDialogueState::RegisterRole { .. } => "register_role",
            HomeworkDialogueState::CourseName => "course_name",
            HomeworkDialogueState::CourseTeacher { .. } => "course_teacher",
            HomeworkDialogueState::AssignmentTitle { .. } => "assignment_title",
            HomeworkDialogueState::AssignmentDescription { .. } => "assignment_description",
            HomeworkDialogueState::AssignmentDueDate { .. } => "assignment_due_date",
            HomeworkDialogueState::SubmitLink { .. } => "submit_link",
            HomeworkDialogueState::GradeComment { .. } => "grade_comment",
        }
    }
}

/// Type alias for the homework dialogue
pub type HomeworkDialogue = Dialogue<HomeworkDialogueState, InMemStorage<HomeworkDialogueState>>;
