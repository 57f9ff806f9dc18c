//! Public submissions and public settings

use academy_db::{NewActivityLog, NewContact, NewJobApplication, NewServiceBooking};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::CurrentAuth;
use super::client_ip;
use super::types::{
    ApplicationRequest, ApplicationResponse, BookingRequest, BookingResponse, ContactRequest,
    ContactResponse, Envelope, PublicSettingsResponse,
};
use super::validation;

#[derive(Serialize)]
struct ContactPayload {
    contact: ContactResponse,
}

#[derive(Serialize)]
struct ApplicationPayload {
    application: ApplicationResponse,
}

#[derive(Serialize)]
struct BookingPayload {
    booking: BookingResponse,
}

/// POST /api/contact
async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<Envelope<ContactPayload>>), ApiError> {
    let (default_language, supported) = {
        let settings = state.settings.read();
        (
            settings.default_language.clone(),
            settings.supported_languages.clone(),
        )
    };

    // Unsupported languages fall back to the site default
    let language = validation::optional(request.language)
        .filter(|lang| supported.contains(lang))
        .unwrap_or(default_language);

    let contact = state
        .db
        .insert_contact(NewContact {
            name: validation::required("Name", &request.name)?,
            email: validation::email(&request.email)?,
            phone: validation::optional(request.phone),
            subject: validation::optional(request.subject),
            message: validation::message("Message", &request.message)?,
            language,
        })
        .await?;

    info!("Contact message {} received", contact.id);
    state
        .record_activity(NewActivityLog {
            action: "contact_submitted".to_string(),
            resource_type: "contact".to_string(),
            resource_id: Some(contact.id.to_string()),
            email: Some(contact.email.clone()),
            ip_address: client_ip(&headers),
            ..Default::default()
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Thank you for your message. We will get back to you soon.",
            ContactPayload {
                contact: contact.into(),
            },
        )),
    ))
}

/// POST /api/applications
///
/// Linked to the caller's account when signed in.
async fn submit_application(
    State(state): State<AppState>,
    CurrentAuth(auth): CurrentAuth,
    Json(request): Json<ApplicationRequest>,
) -> Result<(StatusCode, Json<Envelope<ApplicationPayload>>), ApiError> {
    let applications_open = state.settings.read().applications_open;
    if !applications_open {
        return Err(ApiError::Forbidden(
            "Applications are currently closed".to_string(),
        ));
    }

    let application = state
        .db
        .insert_application(NewJobApplication {
            user_id: auth.effective_user_id(),
            job_title: validation::required("Job title", &request.job_title)?,
            full_name: validation::required("Full name", &request.full_name)?,
            email: validation::email(&request.email)?,
            phone: validation::optional(request.phone),
            cover_letter: validation::optional(request.cover_letter),
            resume_url: validation::optional(request.resume_url),
        })
        .await?;

    info!("Job application {} received", application.id);
    state
        .record_activity(NewActivityLog {
            action: "application_submitted".to_string(),
            resource_type: "application".to_string(),
            resource_id: Some(application.id.to_string()),
            user_id: application.user_id,
            email: Some(application.email.clone()),
            ..Default::default()
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Application submitted successfully",
            ApplicationPayload {
                application: application.into(),
            },
        )),
    ))
}

/// POST /api/bookings
///
/// Linked to the caller's account when signed in.
async fn submit_booking(
    State(state): State<AppState>,
    CurrentAuth(auth): CurrentAuth,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Envelope<BookingPayload>>), ApiError> {
    let bookings_open = state.settings.read().bookings_open;
    if !bookings_open {
        return Err(ApiError::Forbidden("Bookings are currently closed".to_string()));
    }

    let booking = state
        .db
        .insert_booking(NewServiceBooking {
            user_id: auth.effective_user_id(),
            service: validation::required("Service", &request.service)?,
            full_name: validation::required("Full name", &request.full_name)?,
            email: validation::email(&request.email)?,
            phone: validation::optional(request.phone),
            preferred_date: validation::optional(request.preferred_date),
            message: validation::optional(request.message),
        })
        .await?;

    info!("Service booking {} received", booking.id);
    state
        .record_activity(NewActivityLog {
            action: "booking_submitted".to_string(),
            resource_type: "booking".to_string(),
            resource_id: Some(booking.id.to_string()),
            user_id: booking.user_id,
            email: Some(booking.email.clone()),
            ..Default::default()
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Booking request received",
            BookingPayload {
                booking: booking.into(),
            },
        )),
    ))
}

/// GET /api/settings
async fn public_settings(State(state): State<AppState>) -> Json<Envelope<PublicSettingsResponse>> {
    let settings = state.site_settings();
    Json(Envelope::ok(PublicSettingsResponse {
        site_name: settings.site_name,
        contact_email: settings.contact_email,
        contact_phone: settings.contact_phone,
        address: settings.address,
        default_language: settings.default_language,
        supported_languages: settings.supported_languages,
        allow_registration: settings.allow_registration,
        applications_open: settings.applications_open,
        bookings_open: settings.bookings_open,
        maintenance_mode: settings.maintenance_mode,
    }))
}

/// Create public routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/applications", post(submit_application))
        .route("/api/bookings", post(submit_booking))
        .route("/api/settings", get(public_settings))
}
