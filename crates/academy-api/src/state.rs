//! Application state

use academy_auth::{
    AuthResolver, CookieSettings, CookieTokenProvider, JwtManager, ProviderSessionProvider,
    TrustPolicy,
};
use academy_db::{Database, DbError, NewActivityLog, SiteSettings};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

use crate::mail::Mailer;

/// Prometheus render handle served at `/metrics`
pub type MetricsHandle = PrometheusHandle;

/// Authentication knobs taken from configuration
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub cookie_name: String,
    pub session_cookie_name: String,
    pub session_ttl_hours: i64,
    pub verification_ttl_hours: i64,
    pub reset_ttl_hours: i64,
    /// Mark cookies `Secure`; off only for local development
    pub secure_cookies: bool,
    pub trust_policy: TrustPolicy,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            session_cookie_name: "academy.session-token".to_string(),
            session_ttl_hours: 720,
            verification_ttl_hours: 24,
            reset_ttl_hours: 1,
            secure_cookies: false,
            trust_policy: TrustPolicy::Either,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub resolver: AuthResolver,
    pub cookie_tokens: Arc<CookieTokenProvider>,
    pub provider_sessions: Arc<ProviderSessionProvider>,
    pub settings: Arc<RwLock<SiteSettings>>,
    /// Serializes settings writes so the stored and in-memory copies agree
    settings_update: Arc<Mutex<()>>,
    pub mailer: Arc<dyn Mailer>,
    pub verification_ttl_hours: i64,
    pub reset_ttl_hours: i64,
}

impl AppState {
    pub fn new(
        db: Database,
        jwt: Arc<JwtManager>,
        options: AuthOptions,
        settings: SiteSettings,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let token_cookie = CookieSettings::new(
            options.cookie_name,
            jwt.expiry_secs(),
            options.secure_cookies,
        );
        let session_cookie = CookieSettings::new(
            options.session_cookie_name,
            options.session_ttl_hours * 3600,
            options.secure_cookies,
        );

        let cookie_tokens = Arc::new(CookieTokenProvider::new(jwt, token_cookie, db.clone()));
        let provider_sessions = Arc::new(ProviderSessionProvider::new(
            db.clone(),
            session_cookie,
            options.session_ttl_hours,
        ));
        let resolver = AuthResolver::new(
            cookie_tokens.clone(),
            provider_sessions.clone(),
            options.trust_policy,
        );

        Self {
            db,
            resolver,
            cookie_tokens,
            provider_sessions,
            settings: Arc::new(RwLock::new(settings)),
            settings_update: Arc::new(Mutex::new(())),
            mailer,
            verification_ttl_hours: options.verification_ttl_hours,
            reset_ttl_hours: options.reset_ttl_hours,
        }
    }

    /// Snapshot of the current site settings
    pub fn site_settings(&self) -> SiteSettings {
        self.settings.read().clone()
    }

    /// Persist new site settings and swap the in-memory copy.
    ///
    /// Writers are serialized across the store commit and the swap, so the
    /// copy handlers read always matches the last committed write.
    pub async fn replace_site_settings(
        &self,
        settings: SiteSettings,
    ) -> Result<SiteSettings, DbError> {
        let _writer = self.settings_update.lock().await;
        let saved = self.db.save_site_settings(settings).await?;
        *self.settings.write() = saved.clone();
        Ok(saved)
    }

    /// Append to the activity log. Failures are logged and otherwise ignored.
    pub async fn record_activity(&self, entry: NewActivityLog) {
        if let Err(e) = self.db.insert_activity_log(entry).await {
            error!("Failed to write activity log: {}", e);
        }
    }
}
