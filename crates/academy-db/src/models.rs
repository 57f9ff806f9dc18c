//! Database models

use crate::utils::{parse_datetime_or_now, parse_optional_datetime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidUserRole(String),
    InvalidStatus(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidUserRole(s) => write!(f, "Invalid user role: {}", s),
            ParseError::InvalidStatus(s) => write!(f, "Invalid status: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Teacher,
    Applicant,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Applicant => "applicant",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn all() -> [UserRole; 4] {
        [
            UserRole::User,
            UserRole::Admin,
            UserRole::Teacher,
            UserRole::Applicant,
        ]
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "applicant" => Ok(UserRole::Applicant),
            _ => Err(ParseError::InvalidUserRole(s.to_string())),
        }
    }
}

/// User model (credential store record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub login_count: i64,
    pub password_changed_at: Option<DateTime<Utc>>,
    /// Bumped on every password change; cookie tokens carry the value they
    /// were issued under
    #[serde(skip_serializing)]
    pub token_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// New user (for insertion)
///
/// `verification_token` holds the digest of the token mailed to the user,
/// never the token itself.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
}

/// Profile fields a user may edit on their own record
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
}

/// Administrative edit of a user record, applied as one unit
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub profile: UpdateProfile,
    pub role: Option<UserRole>,
    /// New password digest; also revokes outstanding tokens and sessions
    pub password_hash: Option<String>,
}

/// Provider-managed session (secondary identity source)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    /// Digest of the opaque session token carried in the session cookie
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ProviderSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Contact form status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Replied,
    Archived,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Read => "read",
            ContactStatus::Replied => "replied",
            ContactStatus::Archived => "archived",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "read" => Ok(ContactStatus::Read),
            "replied" => Ok(ContactStatus::Replied),
            "archived" => Ok(ContactStatus::Archived),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// Contact form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub language: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New contact submission (for insertion)
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub language: String,
}

/// Job application status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewing,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewing" => Ok(ApplicationStatus::Reviewing),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// Job application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: i64,
    pub user_id: Option<i64>,
    pub job_title: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New job application (for insertion)
#[derive(Debug, Clone)]
pub struct NewJobApplication {
    pub user_id: Option<i64>,
    pub job_title: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
}

/// Service booking status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// Service booking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBooking {
    pub id: i64,
    pub user_id: Option<i64>,
    pub service: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub preferred_date: Option<String>,
    pub message: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New service booking (for insertion)
#[derive(Debug, Clone)]
pub struct NewServiceBooking {
    pub user_id: Option<i64>,
    pub service: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub preferred_date: Option<String>,
    pub message: Option<String>,
}

/// Settings row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

/// New activity log entry (for insertion)
#[derive(Debug, Clone, Default)]
pub struct NewActivityLog {
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let role_str: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            password_hash: row.try_get("password_hash")?,
            // Unknown roles degrade to the least privileged one
            role: UserRole::from_str(&role_str).unwrap_or(UserRole::User),
            is_email_verified: row.try_get("is_email_verified")?,
            verification_token: row.try_get("verification_token")?,
            verification_expires_at: parse_optional_datetime(
                row.try_get("verification_expires_at")?,
            ),
            reset_token: row.try_get("reset_token")?,
            reset_expires_at: parse_optional_datetime(row.try_get("reset_expires_at")?),
            last_login_at: parse_optional_datetime(row.try_get("last_login_at")?),
            login_count: row.try_get("login_count")?,
            password_changed_at: parse_optional_datetime(row.try_get("password_changed_at")?),
            token_version: row.try_get("token_version")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for ProviderSession {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(ProviderSession {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            expires_at: parse_datetime_or_now(&row.try_get::<String, _>("expires_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Contact {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let status_str: String = row.try_get("status")?;
        Ok(Contact {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            subject: row.try_get("subject")?,
            message: row.try_get("message")?,
            language: row.try_get("language")?,
            status: ContactStatus::from_str(&status_str).unwrap_or(ContactStatus::New),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for JobApplication {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let status_str: String = row.try_get("status")?;
        Ok(JobApplication {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            job_title: row.try_get("job_title")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            cover_letter: row.try_get("cover_letter")?,
            resume_url: row.try_get("resume_url")?,
            status: ApplicationStatus::from_str(&status_str)
                .unwrap_or(ApplicationStatus::Pending),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for ServiceBooking {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let status_str: String = row.try_get("status")?;
        Ok(ServiceBooking {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            service: row.try_get("service")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            preferred_date: row.try_get("preferred_date")?,
            message: row.try_get("message")?,
            status: BookingStatus::from_str(&status_str).unwrap_or(BookingStatus::Pending),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for SettingEntry {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(SettingEntry {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for ActivityLog {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(ActivityLog {
            id: row.try_get("id")?,
            timestamp: parse_datetime_or_now(&row.try_get::<String, _>("timestamp")?),
            action: row.try_get("action")?,
            resource_type: row.try_get("resource_type")?,
            resource_id: row.try_get("resource_id")?,
            user_id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            details: row.try_get("details")?,
            ip_address: row.try_get("ip_address")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_gate() {
        for role in UserRole::all() {
            assert_eq!(UserRole::from_str(role.as_str()).unwrap(), role);
        }
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Teacher.is_admin());
        assert!(UserRole::from_str("superuser").is_err());
        assert!(UserRole::from_str("Admin").is_err());
    }

    #[test]
    fn test_role_display_matches_storage_form() {
        assert_eq!(UserRole::Applicant.to_string(), "applicant");
        assert_eq!(UserRole::Admin.to_string(), UserRole::Admin.as_str());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ContactStatus::from_str("replied").unwrap(), ContactStatus::Replied);
        assert_eq!(
            ApplicationStatus::from_str("reviewing").unwrap(),
            ApplicationStatus::Reviewing
        );
        assert_eq!(BookingStatus::from_str("completed").unwrap(), BookingStatus::Completed);
        assert!(BookingStatus::from_str("done").is_err());
    }

    #[test]
    fn test_provider_session_expiry() {
        let now = Utc::now();
        let session = ProviderSession {
            id: "abc".to_string(),
            user_id: 1,
            created_at: now,
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }
}
