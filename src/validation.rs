//! Validation module for user-supplied input
//!
//! Every dialogue step funnels its free-text input through one of these
//! functions. Errors are `&'static str` keys that map directly to
//! localization entries, so handlers can reply with a translated message
//! without re-classifying the failure.

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("Invalid email regex pattern");
    static ref GITHUB_LINK_PATTERN: Regex =
        Regex::new(r"^https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(/.*)?$")
            .expect("Invalid GitHub link regex pattern");
}

/// Validates a person name entered during registration
///
/// # Returns
/// * `Ok(&str)` - The trimmed name if valid
/// * `Err(&str)` - Error key: "name-empty", "name-too-long" or "name-has-slash"
///
/// # Examples
/// ```
/// use homework_bot::validation::validate_person_name;
///
/// assert_eq!(validate_person_name("  Ivan "), Ok("Ivan"));
/// assert_eq!(validate_person_name(""), Err("name-empty"));
/// assert_eq!(validate_person_name("/start"), Err("name-has-slash"));
/// ```
pub fn validate_person_name(name: &str) -> Result<&str, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("name-empty");
    }
    if trimmed.chars().count() > 100 {
        return Err("name-too-long");
    }
    // A slash almost always means the user typed a command mid-dialogue.
    if trimmed.contains('/') {
        return Err("name-has-slash");
    }

    Ok(trimmed)
}

/// Validates an email address entered during registration
///
/// # Examples
/// ```
/// use homework_bot::validation::validate_email;
///
/// assert!(validate_email("student@example.com").is_ok());
/// assert_eq!(validate_email("not-an-email"), Err("email-invalid"));
/// ```
pub fn validate_email(email: &str) -> Result<&str, &'static str> {
    let trimmed = email.trim();

    if trimmed.is_empty() || trimmed.chars().count() > 254 {
        return Err("email-invalid");
    }
    if !EMAIL_PATTERN.is_match(trimmed) {
        return Err("email-invalid");
    }

    Ok(trimmed)
}

/// Validates a course or assignment title
///
/// Same constraints as person names except titles may be longer.
pub fn validate_title(title: &str) -> Result<&str, &'static str> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err("title-empty");
    }
    if trimmed.chars().count() > 255 {
        return Err("title-too-long");
    }
    if trimmed.contains('/') {
        return Err("title-has-slash");
    }

    Ok(trimmed)
}

/// Validates an assignment description
///
/// Descriptions are free prose, but a slash still means a command was
/// typed mid-dialogue, so it is rejected like the shorter fields.
pub fn validate_description(text: &str) -> Result<&str, &'static str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err("description-empty");
    }
    if trimmed.contains('/') {
        return Err("description-has-slash");
    }

    Ok(trimmed)
}

/// Validates a grading comment
///
/// Callers handle the skip word before this, so blank input here is an
/// error rather than "no comment".
pub fn validate_grade_comment(text: &str) -> Result<&str, &'static str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err("grade-comment-empty");
    }
    if trimmed.contains('/') {
        return Err("grade-comment-has-slash");
    }

    Ok(trimmed)
}

/// Validates a homework submission link
///
/// Submissions are GitHub repository links, so anything that is not an
/// `https://github.com/owner/repo...` URL is rejected.
///
/// # Examples
/// ```
/// use homework_bot::validation::validate_submission_link;
///
/// assert!(validate_submission_link("https://github.com/octocat/hello-world").is_ok());
/// assert_eq!(
///     validate_submission_link("http://example.com/repo"),
///     Err("link-not-github")
/// );
/// ```
pub fn validate_submission_link(link: &str) -> Result<&str, &'static str> {
    let trimmed = link.trim();

    if trimmed.is_empty() {
        return Err("link-empty");
    }
    if !GITHUB_LINK_PATTERN.is_match(trimmed) {
        return Err("link-not-github");
    }

    Ok(trimmed)
}

/// Parses an assignment due date in `YYYY-MM-DD` form
///
/// # Returns
/// * `Ok(NaiveDate)` - The parsed date
/// * `Err(&str)` - Error key: "date-format" or "date-past"
pub fn validate_due_date(input: &str) -> Result<NaiveDate, &'static str> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| "date-format")?;

    if date < Utc::now().date_naive() {
        return Err("date-past");
    }

    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn person_name_rejects_blank_and_slash() {
        assert_eq!(validate_person_name("   "), Err("name-empty"));
        assert_eq!(validate_person_name("Ivan/Petrov"), Err("name-has-slash"));
        assert_eq!(validate_person_name(&"a".repeat(101)), Err("name-too-long"));
    }

    #[test]
    fn person_name_trims_whitespace() {
        assert_eq!(validate_person_name("  Мария  "), Ok("Мария"));
    }

    #[test]
    fn email_accepts_common_forms() {
        assert!(validate_email("a.b+c@sub.example.org").is_ok());
        assert_eq!(validate_email("missing-at.example.com"), Err("email-invalid"));
        assert_eq!(validate_email("user@nodot"), Err("email-invalid"));
    }

    #[test]
    fn link_requires_github_https() {
        assert!(validate_submission_link("https://github.com/user/repo").is_ok());
        assert!(validate_submission_link("https://github.com/user/repo/tree/main").is_ok());
        assert_eq!(
            validate_submission_link("https://gitlab.com/user/repo"),
            Err("link-not-github")
        );
        assert_eq!(validate_submission_link(""), Err("link-empty"));
    }

    #[test]
    fn due_date_parses_iso_and_rejects_past() {
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        assert_eq!(
            validate_due_date(&tomorrow.format("%Y-%m-%d").to_string()),
            Ok(tomorrow)
        );
        assert_eq!(validate_due_date("2020-01-01"), Err("date-past"));
        assert_eq!(validate_due_date("01.01.2030"), Err("date-format"));
    }

    #[test]
    fn description_and_comment_reject_commands() {
        assert_eq!(validate_description("  "), Err("description-empty"));
        assert_eq!(validate_description("/help"), Err("description-has-slash"));
        assert_eq!(
            validate_description("Implement the parser from chapter 3"),
            Ok("Implement the parser from chapter 3")
        );
        assert_eq!(validate_grade_comment(""), Err("grade-comment-empty"));
        assert_eq!(
            validate_grade_comment("see /tmp notes"),
            Err("grade-comment-has-slash")
        );
        assert_eq!(validate_grade_comment(" Well done "), Ok("Well done"));
    }

    #[test]
    fn title_allows_longer_text_than_names() {
        assert!(validate_title(&"a".repeat(200)).is_ok());
        assert_eq!(validate_title(&"a".repeat(256)), Err("title-too-long"));
    }
}
