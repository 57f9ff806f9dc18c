//! User operations (credential store)

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, UpdateProfile, UpdateUser, User, UserRole};
use crate::repository::{Database, like_pattern, page_bounds};
use crate::utils::{normalize_email, timestamp};

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, password_hash, role, \
     is_email_verified, verification_token, verification_expires_at, reset_token, \
     reset_expires_at, last_login_at, login_count, password_changed_at, token_version, \
     created_at, updated_at";

/// Query parameters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Matches email, first or last name
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub offset: i64,
    pub limit: i64,
}

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let email = normalize_email(&user.email);

        // Check if user already exists
        if self.get_user_by_email(&email).await?.is_some() {
            return Err(DbError::Duplicate(format!("User '{}' already exists", email)));
        }

        let now = timestamp(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, phone, password_hash, role,
                               is_email_verified, verification_token, verification_expires_at,
                               login_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_expires_at.map(timestamp))
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration for the same email
            let duplicate = e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            if duplicate {
                DbError::Duplicate(format!("User '{}' already exists", email))
            } else {
                DbError::from(e)
            }
        })?;

        let id: i64 = result.get("id");
        self.get_user_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("User: {}", id)))
    }

    /// Get a user by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List users with filtering and pagination
    pub async fn list_users(&self, query: UserQuery) -> Result<(Vec<User>, i64), DbError> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push(
                "(email LIKE ? ESCAPE '\\' OR first_name LIKE ? ESCAPE '\\' OR last_name LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search.trim());
            params.extend([pattern.clone(), pattern.clone(), pattern]);
        }
        if let Some(role) = query.role {
            conditions.push("role = ?");
            params.push(role.as_str().to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as count FROM users {}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        for param in &params {
            count_query = count_query.bind(param);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("count");

        let (offset, limit) = page_bounds(query.offset, query.limit);
        let sql = format!(
            "SELECT {} FROM users {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS, where_clause
        );
        let mut users_query = sqlx::query(&sql);
        for param in &params {
            users_query = users_query.bind(param);
        }
        let rows = users_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let users = rows
            .iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total))
    }

    /// Update the editable profile fields of a user
    pub async fn update_user_profile(
        &self,
        id: i64,
        update: UpdateProfile,
    ) -> Result<bool, DbError> {
        let mut sets = vec!["updated_at = ?"];
        let mut params: Vec<Option<String>> = vec![Some(timestamp(Utc::now()))];

        if let Some(first_name) = update.first_name {
            sets.push("first_name = ?");
            params.push(Some(first_name));
        }
        if let Some(last_name) = update.last_name {
            sets.push("last_name = ?");
            params.push(Some(last_name));
        }
        if let Some(phone) = update.phone {
            sets.push("phone = ?");
            params.push(phone);
        }

        let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }
        let result = query.bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply an administrative edit in one transaction.
    ///
    /// A password change also bumps `token_version` and ends the user's
    /// provider sessions. Returns false when the user does not exist.
    pub async fn update_user(&self, id: i64, update: UpdateUser) -> Result<bool, DbError> {
        let now = timestamp(Utc::now());
        let mut sets = vec!["updated_at = ?"];
        let mut params: Vec<Option<String>> = vec![Some(now.clone())];

        if let Some(first_name) = update.profile.first_name {
            sets.push("first_name = ?");
            params.push(Some(first_name));
        }
        if let Some(last_name) = update.profile.last_name {
            sets.push("last_name = ?");
            params.push(Some(last_name));
        }
        if let Some(phone) = update.profile.phone {
            sets.push("phone = ?");
            params.push(phone);
        }
        if let Some(role) = update.role {
            sets.push("role = ?");
            params.push(Some(role.as_str().to_string()));
        }
        let password_changed = update.password_hash.is_some();
        if let Some(password_hash) = update.password_hash {
            sets.push("password_hash = ?");
            params.push(Some(password_hash));
            sets.push("password_changed_at = ?");
            params.push(Some(now));
            sets.push("token_version = token_version + 1");
            sets.push("reset_token = NULL");
            sets.push("reset_expires_at = NULL");
        }

        let mut tx = self.pool.begin().await?;

        let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }
        let result = query.bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if password_changed {
            sqlx::query("DELETE FROM provider_sessions WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Replace the pending verification token digest of an unverified user
    pub async fn set_verification_token(
        &self,
        id: i64,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verification_token = ?, verification_expires_at = ?, updated_at = ?
            WHERE id = ? AND is_email_verified = 0
            "#,
        )
        .bind(token_digest)
        .bind(timestamp(expires_at))
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Consume a verification token and mark its owner verified.
    ///
    /// Matching, expiry check and clearing happen in one statement, so a token
    /// can succeed at most once even under concurrent requests.
    pub async fn consume_verification_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DbError> {
        let sql = format!(
            r#"
            UPDATE users
            SET is_email_verified = 1, verification_token = NULL,
                verification_expires_at = NULL, updated_at = ?
            WHERE verification_token = ? AND verification_expires_at > ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let now = timestamp(now);
        let result = sqlx::query(&sql)
            .bind(&now)
            .bind(token_digest)
            .bind(&now)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Store a password reset token digest
    pub async fn set_reset_token(
        &self,
        id: i64,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = ?, reset_expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token_digest)
        .bind(timestamp(expires_at))
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Consume a reset token and install the new password hash in one step
    pub async fn consume_reset_token(
        &self,
        token_digest: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DbError> {
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = ?, password_changed_at = ?, token_version = token_version + 1,
                reset_token = NULL, reset_expires_at = NULL, updated_at = ?
            WHERE reset_token = ? AND reset_expires_at > ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let now = timestamp(now);
        let result = sqlx::query(&sql)
            .bind(password_hash)
            .bind(&now)
            .bind(&now)
            .bind(token_digest)
            .bind(&now)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Record a successful sign-in
    pub async fn record_login(&self, id: i64) -> Result<(), DbError> {
        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = ?, login_count = login_count + 1
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a user together with their provider sessions
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM provider_sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any users exist
    pub async fn has_users(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
