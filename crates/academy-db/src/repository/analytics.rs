//! Aggregate queries backing the admin dashboard

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::error::DbError;
use crate::repository::Database;
use crate::utils::timestamp;

/// Row count for one status or role value
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Sign-ups on one calendar day (UTC)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Dashboard aggregates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub verified_users: i64,
    pub users_by_role: Vec<StatusCount>,
    pub contacts_by_status: Vec<StatusCount>,
    pub applications_by_status: Vec<StatusCount>,
    pub bookings_by_status: Vec<StatusCount>,
    pub signups_per_day: Vec<DailyCount>,
    pub active_sessions: i64,
}

impl Database {
    /// Collect the dashboard aggregates over the last `days` days
    pub async fn dashboard_stats(&self, days: i64) -> Result<DashboardStats, DbError> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) as total,
                   COALESCE(SUM(CASE WHEN is_email_verified = 1 THEN 1 ELSE 0 END), 0) as verified
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let since = timestamp(Utc::now() - Duration::days(days.max(1)));
        let signup_rows = sqlx::query(
            r#"
            SELECT substr(created_at, 1, 10) as day, COUNT(*) as count
            FROM users
            WHERE created_at >= ?
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users: totals.get("total"),
            verified_users: totals.get("verified"),
            users_by_role: self.grouped_counts("users", "role").await?,
            contacts_by_status: self.grouped_counts("contacts", "status").await?,
            applications_by_status: self.grouped_counts("job_applications", "status").await?,
            bookings_by_status: self.grouped_counts("service_bookings", "status").await?,
            signups_per_day: signup_rows
                .iter()
                .map(|row| DailyCount {
                    date: row.get("day"),
                    count: row.get("count"),
                })
                .collect(),
            active_sessions: self.count_active_provider_sessions().await?,
        })
    }

    /// `table` and `column` are compile-time identifiers, never request input
    async fn grouped_counts(
        &self,
        table: &'static str,
        column: &'static str,
    ) -> Result<Vec<StatusCount>, DbError> {
        let sql = format!(
            "SELECT {column} as value, COUNT(*) as count FROM {table} GROUP BY {column} ORDER BY {column}"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| StatusCount {
                status: row.get("value"),
                count: row.get("count"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewContact, NewUser, UserRole};

    #[tokio::test]
    async fn test_dashboard_counts() {
        let db = Database::in_memory().await.unwrap();
        for (email, role, verified) in [
            ("admin@example.com", UserRole::Admin, true),
            ("t@example.com", UserRole::Teacher, true),
            ("u@example.com", UserRole::User, false),
        ] {
            db.insert_user(NewUser {
                email: email.to_string(),
                first_name: "F".to_string(),
                last_name: "L".to_string(),
                phone: None,
                password_hash: "h".to_string(),
                role,
                is_email_verified: verified,
                verification_token: None,
                verification_expires_at: None,
            })
            .await
            .unwrap();
        }
        db.insert_contact(NewContact {
            name: "V".to_string(),
            email: "v@example.com".to_string(),
            phone: None,
            subject: None,
            message: "Hello".to_string(),
            language: "fr".to_string(),
        })
        .await
        .unwrap();

        let stats = db.dashboard_stats(30).await.unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.verified_users, 2);
        assert_eq!(stats.users_by_role.len(), 3);
        assert_eq!(
            stats.contacts_by_status,
            vec![StatusCount {
                status: "new".to_string(),
                count: 1
            }]
        );
        assert!(stats.applications_by_status.is_empty());
        assert_eq!(stats.signups_per_day.iter().map(|d| d.count).sum::<i64>(), 3);
        assert_eq!(stats.active_sessions, 0);
    }
}
