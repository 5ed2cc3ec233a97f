use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// User role, constrained to a fixed set both here and by a SQL CHECK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("unknown role: {}", other)),
        }
    }
}

/// Review status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    NeedsRevision,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::NeedsRevision => "needs_revision",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "submitted" => Ok(SubmissionStatus::Submitted),
            "approved" => Ok(SubmissionStatus::Approved),
            "needs_revision" => Ok(SubmissionStatus::NeedsRevision),
            other => Err(anyhow::anyhow!("unknown submission status: {}", other)),
        }
    }
}

/// Represents a registered user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Full name for lists and notifications. The bootstrap admin has no
    /// last name, so the joined form is trimmed.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A pending registration, promoted to a [`User`] on admin approval
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub id: i64,
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub requested_role: Role,
    pub created_at: DateTime<Utc>,
}

/// Represents a course
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub teacher_id: Option<i64>,
}

/// Represents a homework assignment within a course
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A student's submission for an assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub link: String,
    pub status: SubmissionStatus,
    pub teacher_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Open a connection pool to the SQLite database, creating the file if needed
pub async fn connect(path: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to SQLite database")?;

    Ok(pool)
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('student', 'teacher', 'admin')),
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS registration_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            requested_role TEXT NOT NULL CHECK (requested_role IN ('student', 'teacher', 'admin')),
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create registration_requests table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            teacher_id INTEGER REFERENCES users(id) ON DELETE SET NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create courses table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            due_date TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create assignments table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            assignment_id INTEGER NOT NULL REFERENCES assignments(id) ON DELETE CASCADE,
            student_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            link TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'submitted'
                CHECK (status IN ('submitted', 'approved', 'needs_revision')),
            teacher_comment TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (assignment_id, student_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create submissions table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS assignments_course_id_idx ON assignments(course_id)")
        .execute(pool)
        .await
        .context("Failed to create assignments course_id index")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS submissions_assignment_id_idx ON submissions(assignment_id)",
    )
    .execute(pool)
    .await
    .context("Failed to create submissions assignment_id index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS submissions_student_id_idx ON submissions(student_id)")
        .execute(pool)
        .await
        .context("Failed to create submissions student_id index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let role: String = row.get(5);
    Ok(User {
        id: row.get(0),
        chat_id: row.get(1),
        first_name: row.get(2),
        last_name: row.get(3),
        email: row.get(4),
        role: role.parse()?,
        created_at: row.get(6),
    })
}

fn row_to_request(row: &SqliteRow) -> Result<RegistrationRequest> {
    let requested_role: String = row.get(5);
    Ok(RegistrationRequest {
        id: row.get(0),
        chat_id: row.get(1),
        first_name: row.get(2),
        last_name: row.get(3),
        email: row.get(4),
        requested_role: requested_role.parse()?,
        created_at: row.get(6),
    })
}

fn row_to_course(row: &SqliteRow) -> Course {
    Course {
        id: row.get(0),
        name: row.get(1),
        teacher_id: row.get(2),
    }
}

fn row_to_assignment(row: &SqliteRow) -> Assignment {
    Assignment {
        id: row.get(0),
        course_id: row.get(1),
        title: row.get(2),
        description: row.get(3),
        due_date: row.get(4),
        created_at: row.get(5),
    }
}

fn row_to_submission(row: &SqliteRow) -> Result<Submission> {
    let status: String = row.get(4);
    Ok(Submission {
        id: row.get(0),
        assignment_id: row.get(1),
        student_id: row.get(2),
        link: row.get(3),
        status: status.parse()?,
        teacher_comment: row.get(5),
        created_at: row.get(6),
        updated_at: row.get(7),
    })
}

// --- Users ---

/// Get a user by Telegram chat id
pub async fn get_user_by_chat_id(pool: &SqlitePool, chat_id: i64) -> Result<Option<User>> {
    debug!(chat_id = %chat_id, "Getting user by chat_id");

    let row = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, role, created_at
         FROM users WHERE chat_id = ?",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by chat_id")?;

    row.as_ref().map(row_to_user).transpose()
}

/// Get a user by internal id
pub async fn get_user_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    debug!(user_id = %user_id, "Getting user by id");

    let row = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, role, created_at
         FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by id")?;

    row.as_ref().map(row_to_user).transpose()
}

/// Create a new user
pub async fn create_user(
    pool: &SqlitePool,
    chat_id: i64,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: Role,
) -> Result<i64> {
    debug!(chat_id = %chat_id, role = %role.as_str(), "Creating new user");

    let row = sqlx::query(
        "INSERT INTO users (chat_id, first_name, last_name, email, role, created_at)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(chat_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(role.as_str())
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("Failed to insert new user")?;

    let user_id: i64 = row.get(0);
    debug!(user_id = %user_id, "User created successfully");
    Ok(user_id)
}

/// Update a user's role
pub async fn update_user_role(pool: &SqlitePool, user_id: i64, role: Role) -> Result<bool> {
    debug!(user_id = %user_id, role = %role.as_str(), "Updating user role");

    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user role")?;

    Ok(result.rows_affected() > 0)
}

/// List all users holding a given role
pub async fn list_users_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<User>> {
    debug!(role = %role.as_str(), "Listing users by role");

    let rows = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, role, created_at
         FROM users WHERE role = ? ORDER BY last_name, first_name",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await
    .context("Failed to list users by role")?;

    rows.iter().map(row_to_user).collect()
}

/// Delete a user
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<bool> {
    debug!(user_id = %user_id, "Deleting user");

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

/// Make sure the configured administrator exists as an admin user
///
/// Without this the approval loop could never start: nobody would hold the
/// admin role that approves the first registration.
pub async fn ensure_admin_user(pool: &SqlitePool, chat_id: i64) -> Result<()> {
    if get_user_by_chat_id(pool, chat_id).await?.is_some() {
        return Ok(());
    }

    info!(chat_id = %chat_id, "Bootstrapping administrator user");
    create_user(pool, chat_id, "Admin", "", "admin@localhost", Role::Admin).await?;
    Ok(())
}

// --- Registration requests ---

/// Store a registration request, replacing any pending one for the same chat
pub async fn create_registration_request(
    pool: &SqlitePool,
    chat_id: i64,
    first_name: &str,
    last_name: &str,
    email: &str,
    requested_role: Role,
) -> Result<i64> {
    debug!(chat_id = %chat_id, "Creating registration request");

    let row = sqlx::query(
        "INSERT INTO registration_requests
             (chat_id, first_name, last_name, email, requested_role, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(chat_id) DO UPDATE SET
             first_name = excluded.first_name,
             last_name = excluded.last_name,
             email = excluded.email,
             requested_role = excluded.requested_role,
             created_at = excluded.created_at
         RETURNING id",
    )
    .bind(chat_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(requested_role.as_str())
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("Failed to insert registration request")?;

    let request_id: i64 = row.get(0);
    debug!(request_id = %request_id, "Registration request stored");
    Ok(request_id)
}

/// Get a registration request by id
pub async fn get_registration_request(
    pool: &SqlitePool,
    request_id: i64,
) -> Result<Option<RegistrationRequest>> {
    let row = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, requested_role, created_at
         FROM registration_requests WHERE id = ?",
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get registration request")?;

    row.as_ref().map(row_to_request).transpose()
}

/// Get the pending registration request for a chat, if any
pub async fn get_registration_request_by_chat_id(
    pool: &SqlitePool,
    chat_id: i64,
) -> Result<Option<RegistrationRequest>> {
    let row = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, requested_role, created_at
         FROM registration_requests WHERE chat_id = ?",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get registration request by chat_id")?;

    row.as_ref().map(row_to_request).transpose()
}

/// List all pending registration requests, oldest first
pub async fn list_registration_requests(pool: &SqlitePool) -> Result<Vec<RegistrationRequest>> {
    let rows = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, requested_role, created_at
         FROM registration_requests ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list registration requests")?;

    rows.iter().map(row_to_request).collect()
}

/// Approve a registration request, promoting it to a user
///
/// Promotion and request deletion happen in one transaction so a crash can
/// never leave both a pending request and a registered user behind.
/// Returns the created user, or `None` when the request no longer exists.
pub async fn approve_registration(pool: &SqlitePool, request_id: i64) -> Result<Option<User>> {
    debug!(request_id = %request_id, "Approving registration request");

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let row = sqlx::query(
        "SELECT id, chat_id, first_name, last_name, email, requested_role, created_at
         FROM registration_requests WHERE id = ?",
    )
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to fetch registration request")?;

    let request = match row.as_ref().map(row_to_request).transpose()? {
        Some(request) => request,
        None => {
            debug!(request_id = %request_id, "No registration request found");
            return Ok(None);
        }
    };

    let created_at = Utc::now();
    let row = sqlx::query(
        "INSERT INTO users (chat_id, first_name, last_name, email, role, created_at)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(request.chat_id)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&request.email)
    .bind(request.requested_role.as_str())
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to promote registration request to user")?;

    let user_id: i64 = row.get(0);

    sqlx::query("DELETE FROM registration_requests WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete approved registration request")?;

    tx.commit().await.context("Failed to commit approval")?;

    info!(user_id = %user_id, chat_id = %request.chat_id, "Registration approved");
    Ok(Some(User {
        id: user_id,
        chat_id: request.chat_id,
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        role: request.requested_role,
        created_at,
    }))
}

/// Reject and remove a registration request
///
/// Returns the removed request (for notifying the registrant), or `None`
/// when it no longer exists.
pub async fn reject_registration(
    pool: &SqlitePool,
    request_id: i64,
) -> Result<Option<RegistrationRequest>> {
    debug!(request_id = %request_id, "Rejecting registration request");

    let request = match get_registration_request(pool, request_id).await? {
        Some(request) => request,
        None => return Ok(None),
    };

    sqlx::query("DELETE FROM registration_requests WHERE id = ?")
        .bind(request_id)
        .execute(pool)
        .await
        .context("Failed to delete rejected registration request")?;

    info!(request_id = %request_id, chat_id = %request.chat_id, "Registration rejected");
    Ok(Some(request))
}

// --- Courses ---

/// Create a new course
pub async fn create_course(
    pool: &SqlitePool,
    name: &str,
    teacher_id: Option<i64>,
) -> Result<i64> {
    debug!(name = %name, teacher_id = ?teacher_id, "Creating course");

    let row = sqlx::query("INSERT INTO courses (name, teacher_id) VALUES (?, ?) RETURNING id")
        .bind(name)
        .bind(teacher_id)
        .fetch_one(pool)
        .await
        .context("Failed to insert new course")?;

    let course_id: i64 = row.get(0);
    debug!(course_id = %course_id, "Course created successfully");
    Ok(course_id)
}

/// Get a course by id
pub async fn get_course(pool: &SqlitePool, course_id: i64) -> Result<Option<Course>> {
    let row = sqlx::query("SELECT id, name, teacher_id FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course")?;

    Ok(row.as_ref().map(row_to_course))
}

/// List a page of courses plus the total count
pub async fn get_courses_paginated(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Course>, i64)> {
    let rows = sqlx::query("SELECT id, name, teacher_id FROM courses ORDER BY name LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;

    let courses: Vec<Course> = rows.iter().map(row_to_course).collect();

    let total: i64 = sqlx::query("SELECT COUNT(*) FROM courses")
        .fetch_one(pool)
        .await
        .context("Failed to count courses")?
        .get(0);

    debug!(count = courses.len(), total = %total, "Courses page fetched");
    Ok((courses, total))
}

/// List courses taught by a teacher
pub async fn list_courses_by_teacher(pool: &SqlitePool, teacher_id: i64) -> Result<Vec<Course>> {
    let rows =
        sqlx::query("SELECT id, name, teacher_id FROM courses WHERE teacher_id = ? ORDER BY name")
            .bind(teacher_id)
            .fetch_all(pool)
            .await
            .context("Failed to list courses by teacher")?;

    Ok(rows.iter().map(row_to_course).collect())
}

/// Assign a teacher to a course
pub async fn assign_teacher(pool: &SqlitePool, course_id: i64, teacher_id: i64) -> Result<bool> {
    debug!(course_id = %course_id, teacher_id = %teacher_id, "Assigning teacher to course");

    let result = sqlx::query("UPDATE courses SET teacher_id = ? WHERE id = ?")
        .bind(teacher_id)
        .bind(course_id)
        .execute(pool)
        .await
        .context("Failed to assign teacher")?;

    Ok(result.rows_affected() > 0)
}

/// Delete a course
pub async fn delete_course(pool: &SqlitePool, course_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course_id)
        .execute(pool)
        .await
        .context("Failed to delete course")?;

    Ok(result.rows_affected() > 0)
}

// --- Assignments ---

/// Create a new assignment in a course
///
/// Fails when the course does not exist or has no teacher assigned: there
/// would be nobody to grade the submissions.
pub async fn create_assignment(
    pool: &SqlitePool,
    course_id: i64,
    title: &str,
    description: &str,
    due_date: Option<NaiveDate>,
) -> Result<i64> {
    debug!(course_id = %course_id, title = %title, "Creating assignment");

    let course = get_course(pool, course_id)
        .await?
        .with_context(|| format!("No course found with id {}", course_id))?;
    if course.teacher_id.is_none() {
        return Err(anyhow::anyhow!(
            "Course '{}' has no teacher assigned; assignments cannot be created",
            course.name
        ));
    }

    let row = sqlx::query(
        "INSERT INTO assignments (course_id, title, description, due_date, created_at)
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(course_id)
    .bind(title)
    .bind(description)
    .bind(due_date)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("Failed to insert new assignment")?;

    let assignment_id: i64 = row.get(0);
    debug!(assignment_id = %assignment_id, "Assignment created successfully");
    Ok(assignment_id)
}

/// Get an assignment by id
pub async fn get_assignment(pool: &SqlitePool, assignment_id: i64) -> Result<Option<Assignment>> {
    let row = sqlx::query(
        "SELECT id, course_id, title, description, due_date, created_at
         FROM assignments WHERE id = ?",
    )
    .bind(assignment_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get assignment")?;

    Ok(row.as_ref().map(row_to_assignment))
}

/// List assignments of one course
pub async fn list_assignments_by_course(
    pool: &SqlitePool,
    course_id: i64,
) -> Result<Vec<Assignment>> {
    let rows = sqlx::query(
        "SELECT id, course_id, title, description, due_date, created_at
         FROM assignments WHERE course_id = ? ORDER BY created_at",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
    .context("Failed to list assignments by course")?;

    Ok(rows.iter().map(row_to_assignment).collect())
}

/// List all assignments with their course names, newest first
pub async fn list_assignments_with_course(
    pool: &SqlitePool,
) -> Result<Vec<(Assignment, String)>> {
    let rows = sqlx::query(
        "SELECT a.id, a.course_id, a.title, a.description, a.due_date, a.created_at, c.name
         FROM assignments a JOIN courses c ON a.course_id = c.id
         ORDER BY a.created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list assignments")?;

    Ok(rows
        .iter()
        .map(|row| (row_to_assignment(row), row.get(6)))
        .collect())
}

/// Delete an assignment
pub async fn delete_assignment(pool: &SqlitePool, assignment_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = ?")
        .bind(assignment_id)
        .execute(pool)
        .await
        .context("Failed to delete assignment")?;

    Ok(result.rows_affected() > 0)
}

// --- Submissions ---

/// Store a student's submission for an assignment
///
/// A student has at most one submission per assignment; re-submitting
/// replaces the link and resets the status to `submitted`, clearing any
/// previous teacher comment.
pub async fn upsert_submission(
    pool: &SqlitePool,
    assignment_id: i64,
    student_id: i64,
    link: &str,
) -> Result<i64> {
    debug!(assignment_id = %assignment_id, student_id = %student_id, "Storing submission");

    let now = Utc::now();
    let row = sqlx::query(
        "INSERT INTO submissions
             (assignment_id, student_id, link, status, teacher_comment, created_at, updated_at)
         VALUES (?, ?, ?, 'submitted', NULL, ?, ?)
         ON CONFLICT(assignment_id, student_id) DO UPDATE SET
             link = excluded.link,
             status = 'submitted',
             teacher_comment = NULL,
             updated_at = excluded.updated_at
         RETURNING id",
    )
    .bind(assignment_id)
    .bind(student_id)
    .bind(link)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("Failed to store submission")?;

    let submission_id: i64 = row.get(0);
    debug!(submission_id = %submission_id, "Submission stored successfully");
    Ok(submission_id)
}

/// Get a submission by id
pub async fn get_submission(pool: &SqlitePool, submission_id: i64) -> Result<Option<Submission>> {
    let row = sqlx::query(
        "SELECT id, assignment_id, student_id, link, status, teacher_comment, created_at, updated_at
         FROM submissions WHERE id = ?",
    )
    .bind(submission_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get submission")?;

    row.as_ref().map(row_to_submission).transpose()
}

/// List all submissions for one assignment, oldest first
pub async fn list_submissions_by_assignment(
    pool: &SqlitePool,
    assignment_id: i64,
) -> Result<Vec<Submission>> {
    let rows = sqlx::query(
        "SELECT id, assignment_id, student_id, link, status, teacher_comment, created_at, updated_at
         FROM submissions WHERE assignment_id = ? ORDER BY created_at",
    )
    .bind(assignment_id)
    .fetch_all(pool)
    .await
    .context("Failed to list submissions by assignment")?;

    rows.iter().map(row_to_submission).collect()
}

/// Get a student's submission for one assignment, if any
pub async fn get_submission_for_student(
    pool: &SqlitePool,
    assignment_id: i64,
    student_id: i64,
) -> Result<Option<Submission>> {
    let row = sqlx::query(
        "SELECT id, assignment_id, student_id, link, status, teacher_comment, created_at, updated_at
         FROM submissions WHERE assignment_id = ? AND student_id = ?",
    )
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get submission for student")?;

    row.as_ref().map(row_to_submission).transpose()
}

/// List a student's submissions with the assignment titles, newest first
pub async fn list_submissions_by_student(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Vec<(Submission, String)>> {
    let rows = sqlx::query(
        "SELECT s.id, s.assignment_id, s.student_id, s.link, s.status, s.teacher_comment,
                s.created_at, s.updated_at, a.title
         FROM submissions s JOIN assignments a ON s.assignment_id = a.id
         WHERE s.student_id = ? ORDER BY s.updated_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("Failed to list submissions by student")?;

    rows.iter()
        .map(|row| Ok((row_to_submission(row)?, row.get(8))))
        .collect()
}

/// List ungraded submissions across a teacher's courses
///
/// Returns the submission together with the assignment title and the
/// student's name, so the review keyboard needs only one query.
pub async fn list_ungraded_submissions_for_teacher(
    pool: &SqlitePool,
    teacher_id: i64,
) -> Result<Vec<(Submission, String, String)>> {
    let rows = sqlx::query(
        "SELECT s.id, s.assignment_id, s.student_id, s.link, s.status, s.teacher_comment,
                s.created_at, s.updated_at, a.title, u.first_name || ' ' || u.last_name
         FROM submissions s
         JOIN assignments a ON s.assignment_id = a.id
         JOIN courses c ON a.course_id = c.id
         JOIN users u ON s.student_id = u.id
         WHERE c.teacher_id = ? AND s.status = 'submitted'
         ORDER BY s.created_at",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("Failed to list ungraded submissions")?;

    rows.iter()
        .map(|row| Ok((row_to_submission(row)?, row.get(8), row.get(9))))
        .collect()
}

/// Record a grading decision on a submission
///
/// Status and comment change together inside a transaction. Returns `false`
/// when the submission no longer exists.
pub async fn grade_submission(
    pool: &SqlitePool,
    submission_id: i64,
    status: SubmissionStatus,
    comment: Option<&str>,
) -> Result<bool> {
    debug!(submission_id = %submission_id, status = %status.as_str(), "Grading submission");

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        "UPDATE submissions SET status = ?, teacher_comment = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(comment)
    .bind(Utc::now())
    .bind(submission_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update submission grade")?;

    tx.commit().await.context("Failed to commit grade")?;

    let graded = result.rows_affected() > 0;
    if graded {
        info!(submission_id = %submission_id, status = %status.as_str(), "Submission graded");
    } else {
        info!(submission_id = %submission_id, "No submission found to grade");
    }
    Ok(graded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("director".parse::<Role>().is_err());
    }

    #[test]
    fn submission_status_round_trips_through_strings() {
        for status in [
            SubmissionStatus::Submitted,
            SubmissionStatus::Approved,
            SubmissionStatus::NeedsRevision,
        ] {
            assert_eq!(
                status.as_str().parse::<SubmissionStatus>().unwrap(),
                status
            );
        }
        assert!("rejected".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn user_display_name_joins_parts() {
        let user = User {
            id: 1,
            chat_id: 10,
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            email: "ivan@example.com".to_string(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "Ivan Petrov");

        let admin = User {
            last_name: String::new(),
            first_name: "Admin".to_string(),
            ..user
        };
        assert_eq!(admin.display_name(), "Admin");
    }
}
