//! Contact form operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Contact, ContactStatus, NewContact};
use crate::repository::{Database, like_pattern, page_bounds};
use crate::utils::timestamp;

const CONTACT_COLUMNS: &str =
    "id, name, email, phone, subject, message, language, status, created_at, updated_at";

/// Query parameters for listing contact submissions
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub status: Option<ContactStatus>,
    /// Matches name, email or subject
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Database {
    /// Insert a new contact submission
    pub async fn insert_contact(&self, contact: NewContact) -> Result<Contact, DbError> {
        let now = timestamp(Utc::now());
        let sql = format!(
            r#"
            INSERT INTO contacts (name, email, phone, subject, message, language, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.subject)
            .bind(&contact.message)
            .bind(&contact.language)
            .bind(ContactStatus::New.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(Contact::try_from(&row)?)
    }

    /// Get a contact submission by ID
    pub async fn get_contact(&self, id: i64) -> Result<Option<Contact>, DbError> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Contact::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List contact submissions with filtering and pagination
    pub async fn list_contacts(&self, query: ContactQuery) -> Result<(Vec<Contact>, i64), DbError> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            conditions.push("status = ?");
            params.push(status.as_str().to_string());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push(
                "(name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\' OR subject LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search.trim());
            params.extend([pattern.clone(), pattern.clone(), pattern]);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as count FROM contacts {}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        for param in &params {
            count_query = count_query.bind(param);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("count");

        let (offset, limit) = page_bounds(query.offset, query.limit);
        let sql = format!(
            "SELECT {} FROM contacts {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CONTACT_COLUMNS, where_clause
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

        let contacts = rows
            .iter()
            .map(|row| Contact::try_from(row).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((contacts, total))
    }

    /// Update contact status
    pub async fn update_contact_status(
        &self,
        id: i64,
        status: ContactStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE contacts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a contact submission
    pub async fn delete_contact(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str, subject: &str) -> NewContact {
        NewContact {
            name: name.to_string(),
            email: "visitor@example.com".to_string(),
            phone: None,
            subject: Some(subject.to_string()),
            message: "When does the evening course start?".to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn test_contact_workflow() {
        let db = Database::in_memory().await.unwrap();
        let first = db.insert_contact(submission("Sam", "Evening classes")).await.unwrap();
        db.insert_contact(submission("Lee", "Pricing")).await.unwrap();
        assert_eq!(first.status, ContactStatus::New);

        assert!(db.update_contact_status(first.id, ContactStatus::Replied).await.unwrap());

        let (replied, total) = db
            .list_contacts(ContactQuery {
                status: Some(ContactStatus::Replied),
                limit: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(replied[0].name, "Sam");

        let (found, _) = db
            .list_contacts(ContactQuery {
                search: Some("pric".to_string()),
                limit: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Lee");

        assert!(db.delete_contact(first.id).await.unwrap());
        assert!(db.get_contact(first.id).await.unwrap().is_none());
    }
}
