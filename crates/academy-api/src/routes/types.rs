//! Request/Response DTOs

use academy_auth::{Identity, IdentitySource};
use academy_db::{
    ActivityLog, ApplicationStatus, BookingStatus, Contact, ContactStatus, JobApplication,
    ServiceBooking, User, UserRole,
};
use serde::{Deserialize, Serialize};

// ==================== Envelope ====================

/// Success envelope: `{"success": true, "message"?, ...payload}`
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Payload-free body for message-only responses
#[derive(Serialize)]
pub struct Empty {}

/// Paginated list payload
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Common list query parameters
#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(default = "default_offset")]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl ListQuery {
    /// Offset and limit clamped the way the store clamps them
    pub fn bounds(&self) -> (i64, i64) {
        (self.offset.max(0), self.limit.clamp(1, 100))
    }
}

fn default_offset() -> i64 {
    0
}

fn default_limit() -> i64 {
    20
}

// ==================== Auth Types ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Sanitized user record
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub last_login_at: Option<String>,
    pub login_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_email_verified: user.is_email_verified,
            last_login_at: user.last_login_at.map(|t| t.to_rfc3339()),
            login_count: user.login_count,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct UserPayload {
    pub user: UserResponse,
}

/// One identity source as seen by `/api/auth/me`
#[derive(Serialize)]
pub struct IdentityResponse {
    pub source: IdentitySource,
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

impl IdentityResponse {
    pub fn new(source: IdentitySource, identity: &Identity) -> Self {
        Self {
            source,
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
    pub is_admin: bool,
    pub identities: Vec<IdentityResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserResponse,
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct SessionPayload {
    pub session: Option<SessionResponse>,
}

// ==================== Account Types ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Empty string clears the phone number
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ==================== Admin User Types ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

// ==================== Submission Types ====================

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub language: String,
    pub status: ContactStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            subject: contact.subject,
            message: contact.message,
            language: contact.language,
            status: contact.status,
            created_at: contact.created_at.to_rfc3339(),
            updated_at: contact.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    pub job_title: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub job_title: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JobApplication> for ApplicationResponse {
    fn from(application: JobApplication) -> Self {
        Self {
            id: application.id,
            user_id: application.user_id,
            job_title: application.job_title,
            full_name: application.full_name,
            email: application.email,
            phone: application.phone,
            cover_letter: application.cover_letter,
            resume_url: application.resume_url,
            status: application.status,
            created_at: application.created_at.to_rfc3339(),
            updated_at: application.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub service: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_date: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub service: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub preferred_date: Option<String>,
    pub message: Option<String>,
    pub status: BookingStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ServiceBooking> for BookingResponse {
    fn from(booking: ServiceBooking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            service: booking.service,
            full_name: booking.full_name,
            email: booking.email,
            phone: booking.phone,
            preferred_date: booking.preferred_date,
            message: booking.message,
            status: booking.status,
            created_at: booking.created_at.to_rfc3339(),
            updated_at: booking.updated_at.to_rfc3339(),
        }
    }
}

/// Status change for a contact, application or booking
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// ==================== Settings Types ====================

/// Settings visible without signing in
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettingsResponse {
    pub site_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub allow_registration: bool,
    pub applications_open: bool,
    pub bookings_open: bool,
    pub maintenance_mode: bool,
}

// ==================== Analytics Types ====================

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

// ==================== Activity Log Types ====================

/// Activity log entry response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogResponse {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            timestamp: log.timestamp.to_rfc3339(),
            action: log.action,
            resource_type: log.resource_type,
            resource_id: log.resource_id,
            user_id: log.user_id,
            email: log.email,
            details: log.details,
            ip_address: log.ip_address,
        }
    }
}

/// Activity log query parameters
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogsQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default = "default_offset")]
    pub offset: i64,
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    50
}
