//! Academy REST API
//!
//! This crate provides the Axum-based HTTP API for the academy site:
//! authentication, the member account area, public submissions and the
//! admin back-office.

pub mod error;
pub mod mail;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use mail::{LogMailer, MailError, Mailer};
pub use routes::create_router;
pub use state::{AppState, AuthOptions, MetricsHandle};
