//! Multipart form collection.
//!
//! Buffers a `multipart/form-data` body into its text fields and file
//! parts so handlers can validate the whole form at once.

use std::collections::HashMap;

use axum::extract::Multipart;

use super::error::{ApiError, ApiResult};
use super::validation::REQUIRED;
use crate::services::{FieldError, UploadedFile};

#[derive(Debug, Default)]
pub struct MultipartForm {
    texts: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

/// `images[]` and `images` name the same field.
fn field_key(name: &str) -> &str {
    name.strip_suffix("[]").unwrap_or(name)
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let Some(name) = field.name().map(|n| field_key(n).to_string()) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?;
                    form.files.push((
                        name,
                        UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?;
                    form.texts.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text of a field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Like [`MultipartForm::text`], recording a "required" error when missing.
    pub fn required_text(&self, name: &str, errors: &mut Vec<FieldError>) -> Option<String> {
        let value = self.text(name).map(str::to_string);
        if value.is_none() {
            errors.push(FieldError::new(name, REQUIRED));
        }
        value
    }

    /// Removes and returns every file sent under `name`, in order.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }
}
