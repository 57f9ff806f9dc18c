//! Typed site settings
//!
//! Settings are persisted as one `settings` row per field. [`SiteSettings`]
//! owns the mapping in both directions so handlers never deal with the raw
//! key/value form.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DbError;

const SITE_NAME: &str = "site_name";
const CONTACT_EMAIL: &str = "contact_email";
const CONTACT_PHONE: &str = "contact_phone";
const ADDRESS: &str = "address";
const DEFAULT_LANGUAGE: &str = "default_language";
const SUPPORTED_LANGUAGES: &str = "supported_languages";
const ALLOW_REGISTRATION: &str = "allow_registration";
const APPLICATIONS_OPEN: &str = "applications_open";
const BOOKINGS_OPEN: &str = "bookings_open";
const MAINTENANCE_MODE: &str = "maintenance_mode";

/// Site-wide settings editable from the admin back-office
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub allow_registration: bool,
    pub applications_open: bool,
    pub bookings_open: bool,
    pub maintenance_mode: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Academy".to_string(),
            contact_email: "contact@academy.local".to_string(),
            contact_phone: String::new(),
            address: String::new(),
            default_language: "en".to_string(),
            supported_languages: vec!["en".to_string(), "fr".to_string()],
            allow_registration: true,
            applications_open: true,
            bookings_open: true,
            maintenance_mode: false,
        }
    }
}

impl SiteSettings {
    /// Build settings from stored rows, starting from the defaults.
    ///
    /// Unknown keys are skipped. A known key whose value does not parse is an
    /// error, as is a result that fails [`SiteSettings::validate`].
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, DbError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();

        for (key, value) in entries {
            match key {
                SITE_NAME => settings.site_name = value.to_string(),
                CONTACT_EMAIL => settings.contact_email = value.to_string(),
                CONTACT_PHONE => settings.contact_phone = value.to_string(),
                ADDRESS => settings.address = value.to_string(),
                DEFAULT_LANGUAGE => settings.default_language = value.to_string(),
                SUPPORTED_LANGUAGES => settings.supported_languages = parse_list(value),
                ALLOW_REGISTRATION => settings.allow_registration = parse_bool(key, value)?,
                APPLICATIONS_OPEN => settings.applications_open = parse_bool(key, value)?,
                BOOKINGS_OPEN => settings.bookings_open = parse_bool(key, value)?,
                MAINTENANCE_MODE => settings.maintenance_mode = parse_bool(key, value)?,
                other => warn!("Ignoring unknown setting: {}", other),
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Flatten into `(key, value)` rows
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (SITE_NAME, self.site_name.clone()),
            (CONTACT_EMAIL, self.contact_email.clone()),
            (CONTACT_PHONE, self.contact_phone.clone()),
            (ADDRESS, self.address.clone()),
            (DEFAULT_LANGUAGE, self.default_language.clone()),
            (SUPPORTED_LANGUAGES, self.supported_languages.join(",")),
            (ALLOW_REGISTRATION, self.allow_registration.to_string()),
            (APPLICATIONS_OPEN, self.applications_open.to_string()),
            (BOOKINGS_OPEN, self.bookings_open.to_string()),
            (MAINTENANCE_MODE, self.maintenance_mode.to_string()),
        ]
    }

    /// Trim language codes and drop empty entries, the same way a stored
    /// list is read back
    pub fn normalized(mut self) -> Self {
        self.default_language = self.default_language.trim().to_string();
        self.supported_languages = self
            .supported_languages
            .iter()
            .map(|lang| lang.trim())
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        if self.site_name.trim().is_empty() {
            return Err(invalid(SITE_NAME, "must not be empty"));
        }
        if !self.contact_email.is_empty() && !self.contact_email.contains('@') {
            return Err(invalid(CONTACT_EMAIL, "must be an email address"));
        }
        if self.supported_languages.is_empty() {
            return Err(invalid(SUPPORTED_LANGUAGES, "at least one language is required"));
        }
        if self.supported_languages.iter().any(|lang| lang.contains(',')) {
            return Err(invalid(SUPPORTED_LANGUAGES, "language codes must not contain ','"));
        }
        if !self.supported_languages.contains(&self.default_language) {
            return Err(invalid(
                DEFAULT_LANGUAGE,
                "must be one of the supported languages",
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DbError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(key, &format!("expected true or false, got '{}'", other))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, reason: &str) -> DbError {
    DbError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rows_yield_defaults() {
        let settings = SiteSettings::from_entries(std::iter::empty()).unwrap();
        assert_eq!(settings, SiteSettings::default());
    }

    #[test]
    fn test_rows_override_defaults() {
        let rows = [
            ("site_name", "Northside Learning"),
            ("supported_languages", "en, ar"),
            ("default_language", "ar"),
            ("bookings_open", "false"),
            ("legacy_banner", "ignored"),
        ];
        let settings = SiteSettings::from_entries(rows.iter().map(|(k, v)| (*k, *v))).unwrap();

        assert_eq!(settings.site_name, "Northside Learning");
        assert_eq!(settings.supported_languages, vec!["en", "ar"]);
        assert_eq!(settings.default_language, "ar");
        assert!(!settings.bookings_open);
        assert!(settings.applications_open);
    }

    #[test]
    fn test_flatten_then_rebuild() {
        let mut original = SiteSettings::default();
        original.maintenance_mode = true;
        original.contact_phone = "+1 555 0100".to_string();

        let rows = original.to_entries();
        let rebuilt =
            SiteSettings::from_entries(rows.iter().map(|(k, v)| (*k, v.as_str()))).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_bad_boolean_is_rejected() {
        let err = SiteSettings::from_entries([("maintenance_mode", "yes")]).unwrap_err();
        assert!(matches!(err, DbError::InvalidSetting { ref key, .. } if key == "maintenance_mode"));
    }

    #[test]
    fn test_default_language_must_be_supported() {
        let err = SiteSettings::from_entries([("default_language", "de")]).unwrap_err();
        assert!(matches!(err, DbError::InvalidSetting { ref key, .. } if key == "default_language"));
    }

    #[test]
    fn test_normalized_trims_languages() {
        let settings = SiteSettings {
            default_language: " en".to_string(),
            supported_languages: vec![" en".to_string(), "".to_string(), "fr ".to_string()],
            ..Default::default()
        }
        .normalized();

        assert_eq!(settings.default_language, "en");
        assert_eq!(settings.supported_languages, vec!["en", "fr"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_comma_in_language_is_rejected() {
        let settings = SiteSettings {
            supported_languages: vec!["en".to_string(), "fr,de".to_string()],
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            matches!(err, DbError::InvalidSetting { ref key, .. } if key == "supported_languages")
        );
    }
}
