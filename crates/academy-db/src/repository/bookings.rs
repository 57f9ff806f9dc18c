//! Service booking operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{BookingStatus, NewServiceBooking, ServiceBooking};
use crate::repository::{Database, like_pattern, page_bounds};
use crate::utils::timestamp;

const BOOKING_COLUMNS: &str = "id, user_id, service, full_name, email, phone, preferred_date, \
     message, status, created_at, updated_at";

/// Query parameters for listing service bookings
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub user_id: Option<i64>,
    /// Matches name, email or service
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Database {
    /// Insert a new service booking
    pub async fn insert_booking(&self, booking: NewServiceBooking) -> Result<ServiceBooking, DbError> {
        let now = timestamp(Utc::now());
        let sql = format!(
            r#"
            INSERT INTO service_bookings (user_id, service, full_name, email, phone, preferred_date,
                                          message, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(booking.user_id)
            .bind(&booking.service)
            .bind(&booking.full_name)
            .bind(&booking.email)
            .bind(&booking.phone)
            .bind(&booking.preferred_date)
            .bind(&booking.message)
            .bind(BookingStatus::Pending.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(ServiceBooking::try_from(&row)?)
    }

    /// Get a service booking by ID
    pub async fn get_booking(&self, id: i64) -> Result<Option<ServiceBooking>, DbError> {
        let sql = format!("SELECT {} FROM service_bookings WHERE id = ?", BOOKING_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result
            .map(|row| ServiceBooking::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List service bookings with filtering and pagination
    pub async fn list_bookings(
        &self,
        query: BookingQuery,
    ) -> Result<(Vec<ServiceBooking>, i64), DbError> {
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
                "(full_name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\' OR service LIKE ? ESCAPE '\\')",
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
            "SELECT COUNT(*) as count FROM service_bookings {}",
            where_clause
        );
        let mut count_query = sqlx::query(&count_sql);
        for param in &params {
            count_query = count_query.bind(param);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("count");

        let (offset, limit) = page_bounds(query.offset, query.limit);
        let sql = format!(
            "SELECT {} FROM service_bookings {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            BOOKING_COLUMNS, where_clause
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

        let bookings = rows
            .iter()
            .map(|row| ServiceBooking::try_from(row).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((bookings, total))
    }

    /// Update booking status
    pub async fn update_booking_status(
        &self,
        id: i64,
        status: BookingStatus,
    ) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE service_bookings SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(timestamp(Utc::now()))
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a service booking
    pub async fn delete_booking(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM service_bookings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_booking_status_update() {
        let db = Database::in_memory().await.unwrap();
        let booking = db
            .insert_booking(NewServiceBooking {
                user_id: None,
                service: "Career coaching".to_string(),
                full_name: "Ravi Patel".to_string(),
                email: "ravi@example.com".to_string(),
                phone: Some("+1 555 0101".to_string()),
                preferred_date: Some("2026-11-02".to_string()),
                message: None,
            })
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        assert!(db.update_booking_status(booking.id, BookingStatus::Confirmed).await.unwrap());
        let reloaded = db.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, BookingStatus::Confirmed);
        assert!(!db.update_booking_status(9999, BookingStatus::Cancelled).await.unwrap());
    }
}
