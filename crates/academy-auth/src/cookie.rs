//! Cookie adapter
//!
//! Builds `Set-Cookie` values for the session cookies and reads them back
//! from incoming request headers.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

use crate::error::AuthError;

/// Attributes of one session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_secs: i64,
    /// Adds the `Secure` attribute; on everywhere except local development
    pub secure: bool,
}

impl CookieSettings {
    pub fn new(name: impl Into<String>, max_age_secs: i64, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age_secs,
            secure,
        }
    }

    /// `Set-Cookie` value carrying `value`
    pub fn set_cookie(&self, value: &str) -> Result<HeaderValue, AuthError> {
        self.header(value, self.max_age_secs)
    }

    /// `Set-Cookie` value that removes the cookie
    pub fn clear_cookie(&self) -> Result<HeaderValue, AuthError> {
        self.header("", 0)
    }

    /// Read this cookie from request headers
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        read_cookie(headers, &self.name)
    }

    fn header(&self, value: &str, max_age: i64) -> Result<HeaderValue, AuthError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name, value, max_age
        );
        if max_age == 0 {
            cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|_| AuthError::InvalidToken)
    }
}

/// Find a cookie by name across all `Cookie` headers.
///
/// An empty value counts as absent.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}
