//! Router-level tests driving the full application

use std::sync::Arc;

use academy_auth::JwtManager;
use academy_db::{ActivityLogQuery, Database, NewUser, SiteSettings, User, UserRole};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        HeaderMap, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::mail::{MailError, Mailer};
use crate::routes::create_router;
use crate::state::{AppState, AuthOptions};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(&'static str, String, String)>>,
}

impl RecordingMailer {
    fn last_token(&self, kind: &str, to: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(k, recipient, _)| *k == kind && recipient == to)
            .map(|(_, _, token)| token.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, to: &str, _name: &str, token: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .push(("verification", to.to_string(), token.to_string()));
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to: &str,
        _name: &str,
        token: &str,
    ) -> Result<(), MailError> {
        self.sent
            .lock()
            .push(("reset", to.to_string(), token.to_string()));
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            db,
            Arc::new(JwtManager::new("router-test-secret", 168)),
            AuthOptions::default(),
            SiteSettings::default(),
            mailer.clone(),
        );
        let router = create_router(state.clone(), None);
        Self {
            router,
            state,
            mailer,
        }
    }

    /// Insert a user directly, with a cheap bcrypt digest
    async fn seed(&self, email: &str, password: &str, role: UserRole) -> User {
        self.state
            .db
            .insert_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "Person".to_string(),
                phone: None,
                password_hash: bcrypt::hash(password, 4).unwrap(),
                role,
                is_email_verified: true,
                verification_token: None,
                verification_expires_at: None,
            })
            .await
            .unwrap()
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookies: &[&str],
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(COOKIE, cookies.join("; "));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, value)
    }

    /// Cookie-token login returning the `token=...` pair
    async fn login(&self, email: &str, password: &str) -> String {
        let (status, headers, _) = self
            .send(
                "POST",
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
                &[],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        cookie_pair(&headers, "token").unwrap()
    }

    /// Provider sign-in returning the `academy.session-token=...` pair
    async fn provider_login(&self, email: &str, password: &str) -> String {
        let (status, headers, _) = self
            .send(
                "POST",
                "/api/auth/session",
                Some(json!({ "email": email, "password": password })),
                &[],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        cookie_pair(&headers, "academy.session-token").unwrap()
    }
}

fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
        .and_then(|c| c.split(';').next().map(str::to_string))
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, _, body) = app.send("GET", "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_then_login_requires_verification() {
    let app = TestApp::new().await;

    let (status, headers, body) = app
        .send(
            "POST",
            "/api/auth/register",
            Some(json!({
                "firstName": "Aya",
                "lastName": "Karim",
                "email": "a@x.com",
                "password": "first-pass-1"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["isEmailVerified"], false);
    assert_eq!(body["user"]["role"], "user");
    assert!(set_cookies(&headers).is_empty());

    let (status, _, body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "a@x.com", "password": "first-pass-1" })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please verify your email before logging in");

    let token = app.mailer.last_token("verification", "a@x.com").unwrap();
    let (status, _, body) = app
        .send(
            "POST",
            "/api/auth/verify-email",
            Some(json!({ "token": token })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isEmailVerified"], true);

    // Single use
    let (status, _, _) = app
        .send(
            "POST",
            "/api/auth/verify-email",
            Some(json!({ "token": token })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.login("a@x.com", "first-pass-1").await;
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    app.seed("taken@example.com", "whatever-1", UserRole::User).await;

    let (status, _, body) = app
        .send(
            "POST",
            "/api/auth/register",
            Some(json!({
                "firstName": "Second",
                "lastName": "Try",
                "email": "Taken@Example.com",
                "password": "another-pass"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;
    let (status, _, body) = app
        .send(
            "POST",
            "/api/auth/register",
            Some(json!({
                "firstName": " ",
                "lastName": "Karim",
                "email": "b@x.com",
                "password": "long-enough"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "First name is required");
}

#[tokio::test]
async fn test_login_cookie_and_role_gate() {
    let app = TestApp::new().await;
    app.seed("learner@example.com", "learner-pass", UserRole::User).await;

    let (status, headers, body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "learner@example.com", "password": "learner-pass" })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "learner@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let set_cookie = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("token="))
        .unwrap();
    assert!(set_cookie.contains("Max-Age=604800"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("Secure"));

    let cookie = cookie_pair(&headers, "token").unwrap();

    // Authenticated, but not an admin
    let (status, _, body) = app.send("GET", "/api/admin/users", None, &[&cookie]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin access required");

    // Not authenticated at all
    let (status, _, body) = app.send("GET", "/api/admin/users", None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");

    // The denial was audited, the anonymous one was not
    let (logs, total) = app
        .state
        .db
        .list_activity_logs(ActivityLogQuery {
            action: Some("access_denied".to_string()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(logs[0].email.as_deref(), Some("learner@example.com"));
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = TestApp::new().await;
    app.seed("known@example.com", "right-pass", UserRole::User).await;

    let (unknown_status, _, unknown_body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "ghost@example.com", "password": "right-pass" })),
            &[],
        )
        .await;
    let (wrong_status, _, wrong_body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "known@example.com", "password": "wrong-pass" })),
            &[],
        )
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, wrong_status);
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn test_admin_created_user_is_verified() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let (status, _, body) = app
        .send(
            "POST",
            "/api/admin/users",
            Some(json!({
                "firstName": "Omar",
                "lastName": "Teacher",
                "email": "omar@example.com",
                "password": "teacher-pass",
                "role": "teacher"
            })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "teacher");
    assert_eq!(body["user"]["isEmailVerified"], true);

    let stored = app
        .state
        .db
        .get_user_by_email("omar@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_email_verified);
    assert!(stored.verification_token.is_none());
}

#[tokio::test]
async fn test_admin_rejects_unknown_role() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let (status, _, _) = app
        .send(
            "POST",
            "/api/admin/users",
            Some(json!({
                "firstName": "X",
                "lastName": "Y",
                "email": "xy@example.com",
                "password": "some-pass-1",
                "role": "superuser"
            })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_update_is_all_or_nothing() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let learner = app.seed("learner@example.com", "learner-pass", UserRole::User).await;
    let admin_cookie = app.login("admin@example.com", "admin-pass").await;
    let learner_cookie = app.login("learner@example.com", "learner-pass").await;
    let uri = format!("/api/admin/users/{}", learner.id);

    // A short password fails validation, so the role change is not applied either
    let (status, _, _) = app
        .send(
            "PUT",
            &uri,
            Some(json!({ "role": "teacher", "password": "short" })),
            &[&admin_cookie],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = app.state.db.get_user_by_id(learner.id).await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::User);

    let (status, _, body) = app
        .send(
            "PUT",
            &uri,
            Some(json!({ "role": "teacher", "password": "fresh-pass-1", "lastName": "Moved" })),
            &[&admin_cookie],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "teacher");
    assert_eq!(body["user"]["lastName"], "Moved");

    // The admin-set password ends the learner's existing cookie
    let (status, _, _) = app
        .send("GET", "/api/account/profile", None, &[&learner_cookie])
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.login("learner@example.com", "fresh-pass-1").await;

    let (status, _, _) = app
        .send("PUT", "/api/admin/users/9999", Some(json!({ "role": "teacher" })), &[&admin_cookie])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = TestApp::new().await;
    let admin = app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let other = app.seed("other@example.com", "other-pass", UserRole::User).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let (status, _, body) = app
        .send("DELETE", &format!("/api/admin/users/{}", admin.id), None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot delete your own account");
    assert!(app.state.db.get_user_by_id(admin.id).await.unwrap().is_some());

    let (status, _, _) = app
        .send("DELETE", &format!("/api/admin/users/{}", other.id), None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.state.db.get_user_by_id(other.id).await.unwrap().is_none());

    let (status, _, _) = app
        .send("DELETE", &format!("/api/admin/users/{}", other.id), None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let mut bytes = cookie.into_bytes();
    let last = bytes.len() - 3;
    bytes[last] = if bytes[last] == b'Q' { b'R' } else { b'Q' };
    let tampered = String::from_utf8(bytes).unwrap();

    let (status, _, _) = app.send("GET", "/api/auth/me", None, &[&tampered]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app.send("GET", "/api/admin/users", None, &[&tampered]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_provider_admin_session_alone_is_enough() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let session = app.provider_login("admin@example.com", "admin-pass").await;

    let (status, _, body) = app.send("GET", "/api/admin/users", None, &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _, body) = app.send("GET", "/api/auth/session", None, &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["user"]["email"], "admin@example.com");

    let (status, _, _) = app.send("DELETE", "/api/auth/session", None, &[&session]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send("GET", "/api/auth/session", None, &[&session]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["session"].is_null());

    let (status, _, _) = app.send("GET", "/api/admin/users", None, &[&session]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_either_source_claiming_admin_is_admin() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let learner = app.seed("learner@example.com", "learner-pass", UserRole::User).await;

    let cookie = app.login("learner@example.com", "learner-pass").await;
    let session = app.provider_login("admin@example.com", "admin-pass").await;

    let (status, _, body) = app.send("GET", "/api/auth/me", None, &[&cookie, &session]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], true);
    // Provider identity is the effective one
    assert_eq!(body["user"]["email"], "admin@example.com");
    assert_eq!(body["identities"].as_array().unwrap().len(), 2);

    let (status, _, _) = app
        .send("GET", "/api/admin/users", None, &[&cookie, &session])
        .await;
    assert_eq!(status, StatusCode::OK);

    // The cookie identity still counts as "self"
    let (status, _, _) = app
        .send(
            "DELETE",
            &format!("/api/admin/users/{}", learner.id),
            None,
            &[&cookie, &session],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_both_cookies() {
    let app = TestApp::new().await;
    app.seed("learner@example.com", "learner-pass", UserRole::User).await;
    let session = app.provider_login("learner@example.com", "learner-pass").await;

    let (status, headers, _) = app.send("POST", "/api/auth/logout", None, &[&session]).await;
    assert_eq!(status, StatusCode::OK);

    let cleared = set_cookies(&headers);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    assert!(cleared.iter().any(|c| c.starts_with("token=;")));
    assert!(cleared.iter().any(|c| c.starts_with("academy.session-token=;")));

    assert_eq!(app.state.db.count_active_provider_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn test_password_reset_is_single_use() {
    let app = TestApp::new().await;
    app.seed("forgetful@example.com", "old-password", UserRole::User).await;

    let (status, _, _) = app
        .send(
            "POST",
            "/api/auth/forgot-password",
            Some(json!({ "email": "forgetful@example.com" })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Unknown accounts get the same answer and no mail
    let (status, _, _) = app
        .send(
            "POST",
            "/api/auth/forgot-password",
            Some(json!({ "email": "nobody@example.com" })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.mailer.last_token("reset", "nobody@example.com").is_none());

    let token = app.mailer.last_token("reset", "forgetful@example.com").unwrap();
    let reset = json!({ "token": token, "password": "new-password" });

    let (status, _, _) = app
        .send("POST", "/api/auth/reset-password", Some(reset.clone()), &[])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send("POST", "/api/auth/reset-password", Some(reset), &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.login("forgetful@example.com", "new-password").await;
}

#[tokio::test]
async fn test_settings_gate_registration() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let mut settings = serde_json::to_value(SiteSettings::default()).unwrap();
    settings["allowRegistration"] = json!(false);
    settings["siteName"] = json!("Northside Learning");

    let (status, _, body) = app
        .send("PUT", "/api/admin/settings", Some(settings.clone()), &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["siteName"], "Northside Learning");

    let (_, _, body) = app.send("GET", "/api/settings", None, &[]).await;
    assert_eq!(body["siteName"], "Northside Learning");
    assert_eq!(body["allowRegistration"], false);

    let (status, _, _) = app
        .send(
            "POST",
            "/api/auth/register",
            Some(json!({
                "firstName": "Late",
                "lastName": "Comer",
                "email": "late@example.com",
                "password": "late-pass-1"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Persisted as rows, not just in memory
    let stored = app.state.db.load_site_settings().await.unwrap();
    assert!(!stored.allow_registration);

    settings["defaultLanguage"] = json!("de");
    let (status, _, _) = app
        .send("PUT", "/api/admin/settings", Some(settings), &[&cookie])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.site_settings().default_language, "en");
}

#[tokio::test]
async fn test_submissions_link_to_signed_in_user() {
    let app = TestApp::new().await;
    app.seed("learner@example.com", "learner-pass", UserRole::User).await;
    let cookie = app.login("learner@example.com", "learner-pass").await;

    let (status, _, body) = app
        .send(
            "POST",
            "/api/applications",
            Some(json!({
                "jobTitle": "French tutor",
                "fullName": "Test Person",
                "email": "learner@example.com"
            })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["application"]["userId"].is_number());

    let (status, _, body) = app
        .send(
            "POST",
            "/api/bookings",
            Some(json!({
                "service": "Career coaching",
                "fullName": "Walk In",
                "email": "walkin@example.com"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["booking"]["userId"].is_null());

    let (status, _, body) = app
        .send("GET", "/api/account/applications", None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["jobTitle"], "French tutor");

    let (status, _, body) = app.send("GET", "/api/account/bookings", None, &[&cookie]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_contact_flow_through_admin() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;

    let (status, _, body) = app
        .send(
            "POST",
            "/api/contact",
            Some(json!({
                "name": "Curious Visitor",
                "email": "visitor@example.com",
                "message": "Do you run evening classes?",
                "language": "xx"
            })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["contact"]["language"], "en");
    let id = body["contact"]["id"].as_i64().unwrap();

    let cookie = app.login("admin@example.com", "admin-pass").await;
    let (status, _, body) = app
        .send(
            "PUT",
            &format!("/api/admin/contacts/{}", id),
            Some(json!({ "status": "replied" })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact"]["status"], "replied");

    let (status, _, _) = app
        .send(
            "PUT",
            &format!("/api/admin/contacts/{}", id),
            Some(json!({ "status": "shredded" })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = app
        .send("GET", "/api/admin/contacts?status=replied", None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = TestApp::new().await;
    app.seed("learner@example.com", "learner-pass", UserRole::User).await;
    let cookie = app.login("learner@example.com", "learner-pass").await;

    let (status, _, body) = app
        .send(
            "PUT",
            "/api/account/profile",
            Some(json!({ "firstName": "Renamed", "phone": "+1 555 0101" })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["firstName"], "Renamed");
    assert_eq!(body["user"]["phone"], "+1 555 0101");

    let (status, _, _) = app
        .send(
            "PUT",
            "/api/account/password",
            Some(json!({ "currentPassword": "not-it", "newPassword": "fresh-pass-1" })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, headers, _) = app
        .send(
            "PUT",
            "/api/account/password",
            Some(json!({ "currentPassword": "learner-pass", "newPassword": "fresh-pass-1" })),
            &[&cookie],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = cookie_pair(&headers, "token").unwrap();

    let (status, _, _) = app.send("GET", "/api/account/profile", None, &[&fresh]).await;
    assert_eq!(status, StatusCode::OK);

    // The cookie from before the change stops working at once
    let (status, _, _) = app.send("GET", "/api/account/profile", None, &[&cookie]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.login("learner@example.com", "fresh-pass-1").await;
}

#[tokio::test]
async fn test_analytics_and_logs() {
    let app = TestApp::new().await;
    app.seed("admin@example.com", "admin-pass", UserRole::Admin).await;
    let cookie = app.login("admin@example.com", "admin-pass").await;

    let (status, _, body) = app
        .send("GET", "/api/admin/analytics?days=7", None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 7);
    assert_eq!(body["stats"]["totalUsers"], 1);

    let (status, _, body) = app.send("GET", "/api/admin/logs/actions", None, &[&cookie]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["actions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "login")
    );

    let (status, _, body) = app
        .send("GET", "/api/admin/logs?action=login", None, &[&cookie])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new().await;
    let (status, _, body) = app.send("GET", "/api/nope", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
