//! Contact form route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use emporium_core::{ContactMessageId, Email, Phone};

use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Longest accepted sender name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted subject.
pub const MAX_SUBJECT_LENGTH: usize = 200;

/// Longest accepted message.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// `POST /api/contact` body.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Response for a stored submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: ContactMessageId,
    pub message: &'static str,
}

#[derive(Debug)]
struct ValidContact {
    name: String,
    email: Email,
    phone: Option<Phone>,
    subject: Option<String>,
    message: String,
}

fn validate(form: ContactForm) -> std::result::Result<ValidContact, String> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("Name must be at most {MAX_NAME_LENGTH} characters"));
    }

    let email = Email::parse(&form.email).map_err(|_| "Invalid email address".to_string())?;

    let phone = form
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Phone::parse)
        .transpose()
        .map_err(|_| "Invalid phone number".to_string())?;

    let subject = form
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    if subject
        .as_ref()
        .is_some_and(|s| s.chars().count() > MAX_SUBJECT_LENGTH)
    {
        return Err(format!(
            "Subject must be at most {MAX_SUBJECT_LENGTH} characters"
        ));
    }

    let message = form.message.trim();
    if message.is_empty() {
        return Err("Message is required".to_string());
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {MAX_MESSAGE_LENGTH} characters"
        ));
    }

    Ok(ValidContact {
        name: name.to_owned(),
        email,
        phone,
        subject,
        message: message.to_owned(),
    })
}

/// Store a contact form submission and notify support.
///
/// POST /api/contact
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let contact = validate(form).map_err(AppError::BadRequest)?;

    let id = ContactRepository::new(state.pool())
        .insert(
            &contact.name,
            &contact.email,
            contact.phone.as_ref(),
            contact.subject.as_deref(),
            &contact.message,
        )
        .await?;

    if let Err(e) = state
        .email()
        .send_contact_notification(
            &contact.name,
            contact.email.as_str(),
            contact.subject.as_deref(),
            &contact.message,
        )
        .await
    {
        warn!(contact_id = %id, error = %e, "Failed to send contact notification");
    }

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id,
            message: "Thanks, we will get back to you soon",
        }),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: " Ravi ".to_string(),
            email: "Ravi@Example.com".to_string(),
            phone: Some(String::new()),
            subject: None,
            message: " Is the oak desk back in stock? ".to_string(),
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let contact = validate(form()).unwrap();
        assert_eq!(contact.name, "Ravi");
        assert_eq!(contact.email.as_str(), "ravi@example.com");
        assert!(contact.phone.is_none());
        assert_eq!(contact.message, "Is the oak desk back in stock?");
    }

    #[test]
    fn test_validate_limits() {
        let mut f = form();
        f.name = "n".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate(f).is_err());

        let mut f = form();
        f.message = "   ".to_string();
        assert_eq!(validate(f).unwrap_err(), "Message is required");

        let mut f = form();
        f.message = "m".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(validate(f).is_err());

        let mut f = form();
        f.email = "not-an-email".to_string();
        assert_eq!(validate(f).unwrap_err(), "Invalid email address");
    }
}
