//! Typed grammar for inline keyboard callback payloads
//!
//! Every button the bot sends carries a `prefix:payload` string built by
//! [`CallbackData::encode`], and every button press is parsed back through
//! [`CallbackData::parse`]. Unknown or malformed payloads parse to `None`
//! and are ignored by the callback handler.

use crate::db::{Role, SubmissionStatus};

/// All callback payloads the bot can send and receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// Registration role choice
    Role(Role),
    /// Approve a registration request
    Approve(i64),
    /// Reject a registration request
    Reject(i64),
    /// Show a course's assignments
    Course(i64),
    /// Pick the course for a new assignment
    AssignCourse(i64),
    /// Pick the teacher for a new course
    Teacher(i64),
    /// Pick the assignment to submit for
    Submit(i64),
    /// Open a submission for review
    Review(i64),
    /// Grade a submission with a status
    Grade(i64, SubmissionStatus),
    /// Flip to another page of the course list
    Page(i64),
    /// Inert button (e.g. the page indicator)
    Noop,
}

impl CallbackData {
    /// Render the payload string placed on a button
    pub fn encode(&self) -> String {
        match self {
            CallbackData::Role(role) => format!("role:{}", role.as_str()),
            CallbackData::Approve(id) => format!("approve:{}", id),
            CallbackData::Reject(id) => format!("reject:{}", id),
            CallbackData::Course(id) => format!("course:{}", id),
            CallbackData::AssignCourse(id) => format!("assign_course:{}", id),
            CallbackData::Teacher(id) => format!("teacher:{}", id),
            CallbackData::Submit(id) => format!("submit:{}", id),
            CallbackData::Review(id) => format!("review:{}", id),
            CallbackData::Grade(id, status) => format!("grade:{}:{}", id, status.as_str()),
            CallbackData::Page(n) => format!("page:{}", n),
            CallbackData::Noop => "noop".to_string(),
        }
    }

    /// Parse a payload string received from a button press
    pub fn parse(data: &str) -> Option<CallbackData> {
        if data == "noop" {
            return Some(CallbackData::Noop);
        }

        let (prefix, payload) = data.split_once(':')?;
        match prefix {
            // Only the roles the registration keyboard offers; "role:admin"
            // is a forged payload, not a button the bot ever sent.
            "role" => match payload.parse::<Role>().ok()? {
                Role::Admin => None,
                role => Some(CallbackData::Role(role)),
            },
            "approve" => payload.parse().ok().map(CallbackData::Approve),
            "reject" => payload.parse().ok().map(CallbackData::Reject),
            "course" => payload.parse().ok().map(CallbackData::Course),
            "assign_course" => payload.parse().ok().map(CallbackData::AssignCourse),
            "teacher" => payload.parse().ok().map(CallbackData::Teacher),
            "submit" => payload.parse().ok().map(CallbackData::Submit),
            "review" => payload.parse().ok().map(CallbackData::Review),
            "grade" => {
                let (id, status) = payload.split_once(':')?;
                Some(CallbackData::Grade(
                    id.parse().ok()?,
                    status.parse::<SubmissionStatus>().ok()?,
                ))
            }
            "page" => payload.parse().ok().map(CallbackData::Page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_parse_round_trip() {
        let cases = [
            CallbackData::Role(Role::Teacher),
            CallbackData::Approve(7),
            CallbackData::Reject(12),
            CallbackData::Course(3),
            CallbackData::AssignCourse(4),
            CallbackData::Teacher(9),
            CallbackData::Submit(21),
            CallbackData::Review(33),
            CallbackData::Grade(33, SubmissionStatus::NeedsRevision),
            CallbackData::Page(2),
            CallbackData::Noop,
        ];
        for case in cases {
            assert_eq!(CallbackData::parse(&case.encode()), Some(case));
        }
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        assert_eq!(CallbackData::parse(""), None);
        assert_eq!(CallbackData::parse("role:principal"), None);
        assert_eq!(CallbackData::parse("role:admin"), None);
        assert_eq!(CallbackData::parse("approve:abc"), None);
        assert_eq!(CallbackData::parse("grade:5"), None);
        assert_eq!(CallbackData::parse("grade:5:rejected"), None);
        assert_eq!(CallbackData::parse("something_else"), None);
    }
}
