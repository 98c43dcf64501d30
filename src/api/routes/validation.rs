//! Request payload validation.
//!
//! [`ValidatedJson`] deserializes a JSON body and runs its `validator`
//! rules, turning failures into field-level messages.

use std::borrow::Cow;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use super::error::ApiError;
use crate::services::FieldError;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Invalid email format.";
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 30;

fn error_with_message(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

/// Rejects empty or whitespace-only text.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error_with_message("required", REQUIRED.to_string()));
    }
    Ok(())
}

pub fn password_length(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < PASSWORD_MIN {
        return Err(error_with_message(
            "min",
            format!("Value is too short. Minimum {PASSWORD_MIN} characters are required."),
        ));
    }
    if len > PASSWORD_MAX {
        return Err(error_with_message(
            "max",
            format!("Value is too long. Maximum {PASSWORD_MAX} characters are allowed."),
        ));
    }
    Ok(())
}

fn message_for(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "required" => REQUIRED.to_string(),
        "email" => INVALID_EMAIL.to_string(),
        other => format!("Invalid value ({other})."),
    }
}

/// One message per field, preferring "required" failures, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let chosen = errs
                .iter()
                .find(|e| e.code == "required")
                .or_else(|| errs.first())?;
            Some(FieldError::new(field.to_string(), message_for(chosen)))
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// JSON body that passed its validation rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Rejected JSON body: {}", rejection.body_text());
            ApiError::bad_request(rejection.body_text())
        })?;

        value
            .validate()
            .map_err(|e| ApiError::validation(field_errors(&e)))?;

        Ok(ValidatedJson(value))
    }
}
