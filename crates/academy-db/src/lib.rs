//! Academy Database Layer
//!
//! This crate provides the persistence layer for the Academy site backend:
//! the credential store, the provider session table, the public submission
//! collections and the settings rows, using SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod settings;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{
    ActivityLogQuery, ApplicationQuery, BookingQuery, ContactQuery, DailyCount, DashboardStats,
    Database, StatusCount, UserQuery,
};
pub use settings::SiteSettings;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
