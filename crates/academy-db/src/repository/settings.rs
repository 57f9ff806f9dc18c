//! Settings operations

use chrono::Utc;

use crate::error::DbError;
use crate::models::SettingEntry;
use crate::repository::Database;
use crate::settings::SiteSettings;
use crate::utils::timestamp;

const UPSERT_SETTING: &str = r#"
    INSERT INTO settings (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#;

impl Database {
    // ==================== Settings Operations ====================

    /// List all setting rows
    pub async fn list_settings(&self) -> Result<Vec<SettingEntry>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, updated_at
            FROM settings
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| SettingEntry::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Load the typed site settings, falling back to defaults for absent rows
    pub async fn load_site_settings(&self) -> Result<SiteSettings, DbError> {
        let entries = self.list_settings().await?;
        SiteSettings::from_entries(entries.iter().map(|e| (e.key.as_str(), e.value.as_str())))
    }

    /// Normalize, validate and persist every field in one transaction.
    ///
    /// Returns the settings exactly as a later [`Database::load_site_settings`]
    /// will read them.
    pub async fn save_site_settings(&self, settings: SiteSettings) -> Result<SiteSettings, DbError> {
        let settings = settings.normalized();
        settings.validate()?;

        let now = timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.to_entries() {
            sqlx::query(UPSERT_SETTING)
                .bind(key)
                .bind(value)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(settings)
    }
}
