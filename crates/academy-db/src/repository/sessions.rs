//! Provider session operations

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::error::DbError;
use crate::models::ProviderSession;
use crate::utils::timestamp;

use super::Database;

impl Database {
    /// Create a provider session keyed by the digest of its cookie token
    pub async fn create_provider_session(
        &self,
        id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<ProviderSession, DbError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO provider_sessions (id, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(timestamp(now))
        .bind(timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(ProviderSession {
            id: id.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Get a provider session by ID
    pub async fn get_provider_session(&self, id: &str) -> Result<Option<ProviderSession>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, created_at, expires_at
            FROM provider_sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| ProviderSession::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Delete a provider session
    pub async fn delete_provider_session(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM provider_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every provider session of a user
    pub async fn delete_provider_sessions_for_user(&self, user_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM provider_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove sessions whose expiry has passed
    pub async fn purge_expired_provider_sessions(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM provider_sessions WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count live provider sessions
    pub async fn count_active_provider_sessions(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM provider_sessions WHERE expires_at > ?")
            .bind(timestamp(Utc::now()))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        let expires = Utc::now() + Duration::hours(1);

        db.create_provider_session("live", 7, expires).await.unwrap();
        db.create_provider_session("stale", 7, Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        let live = db.get_provider_session("live").await.unwrap().unwrap();
        assert_eq!(live.user_id, 7);
        assert_eq!(db.count_active_provider_sessions().await.unwrap(), 1);

        assert_eq!(db.purge_expired_provider_sessions().await.unwrap(), 1);
        assert!(db.get_provider_session("stale").await.unwrap().is_none());

        assert!(db.delete_provider_session("live").await.unwrap());
        assert!(!db.delete_provider_session("live").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_sessions_for_user() {
        let db = Database::in_memory().await.unwrap();
        let expires = Utc::now() + Duration::hours(1);
        db.create_provider_session("a", 1, expires).await.unwrap();
        db.create_provider_session("b", 1, expires).await.unwrap();
        db.create_provider_session("c", 2, expires).await.unwrap();

        assert_eq!(db.delete_provider_sessions_for_user(1).await.unwrap(), 2);
        assert!(db.get_provider_session("c").await.unwrap().is_some());
    }
}
