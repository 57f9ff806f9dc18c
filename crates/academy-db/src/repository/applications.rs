//! Job application operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{ApplicationStatus, JobApplication, NewJobApplication};
use crate::repository::{Database, like_pattern, page_bounds};
use crate::utils::timestamp;

const APPLICATION_COLUMNS: &str = "id, user_id, job_title, full_name, email, phone, cover_letter, \
     resume_url, status, created_at, updated_at";

/// Query parameters for listing job applications
#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub user_id: Option<i64>,
    /// Matches applicant name, email or job title
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Database {
    /// Insert a new job application
    pub async fn insert_application(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, DbError> {
        let now = timestamp(Utc::now());
        let sql = format!(
            r#"
            INSERT INTO job_applications (user_id, job_title, full_name, email, phone, cover_letter,
                                          resume_url, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(application.user_id)
            .bind(&application.job_title)
            .bind(&application.full_name)
            .bind(&application.email)
            .bind(&application.phone)
            .bind(&application.cover_letter)
            .bind(&application.resume_url)
            .bind(ApplicationStatus::Pending.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(JobApplication::try_from(&row)?)
    }

    /// Get a job application by ID
    pub async fn get_application(&self, id: i64) -> Result<Option<JobApplication>, DbError> {
        let sql = format!(
            "SELECT {} FROM job_applications WHERE id = ?",
            APPLICATION_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result
            .map(|row| JobApplication::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List job applications with filtering and pagination
    pub async fn list_applications(
        &self,
        query: ApplicationQuery,
    ) -> Result<(Vec<JobApplication>, i64), DbError> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            conditions.push("status = ?");
            params.push(status.as_str().to_string());
        }
        if let Some(user_id) = query.user_id {
            conditions.push("user_id = ?");
            params.push(user_id.to_string());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push(
                "(full_name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\' OR job_title LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search.trim());
            params.extend([pattern.clone(), pattern.clone(), pattern]);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!(
            "SELECT COUNT(*) as count FROM job_applications {}",
            where_clause
        );
        let mut count_query = sqlx::query(&count_sql);
        for param in &params {
            count_query = count_query.bind(param);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("count");

        let (offset, limit) = page_bounds(query.offset, query.limit);
        let sql = format!(
            "SELECT {} FROM job_applications {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            APPLICATION_COLUMNS, where_clause
        );
        let mut list_query = sqlx::query(&sql);
        for param in &params {
            list_query = list_query.bind(param);
        }
        let rows = list_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let applications = rows
            .iter()
            .map(|row| JobApplication::try_from(row).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((applications, total))
    }

    /// Update application status
    pub async fn update_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE job_applications SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(timestamp(Utc::now()))
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a job application
    pub async fn delete_application(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM job_applications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(user_id: Option<i64>, job_title: &str) -> NewJobApplication {
        NewJobApplication {
            user_id,
            job_title: job_title.to_string(),
            full_name: "Noor Haddad".to_string(),
            email: "noor@example.com".to_string(),
            phone: None,
            cover_letter: Some("Ten years of ESL teaching.".to_string()),
            resume_url: None,
        }
    }

    #[tokio::test]
    async fn test_application_filters() {
        let db = Database::in_memory().await.unwrap();
        let mine = db
            .insert_application(application(Some(3), "English Tutor"))
            .await
            .unwrap();
        db.insert_application(application(None, "Math Tutor")).await.unwrap();
        assert_eq!(mine.status, ApplicationStatus::Pending);

        let (own, total) = db
            .list_applications(ApplicationQuery {
                user_id: Some(3),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(own[0].job_title, "English Tutor");

        db.update_application_status(mine.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        let (accepted, _) = db
            .list_applications(ApplicationQuery {
                status: Some(ApplicationStatus::Accepted),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, mine.id);
    }
}
