use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures::StreamExt;
use sanitize_filename::sanitize;

use crate::pipeline::{GenerationRequest, Upload, OUTCOMES_FIELD, ROSTER_FIELD, SIGNATURE_FIELD};
use crate::ErrorResponse;

/// Largest single part accepted from a client.
pub const MAX_PART_BYTES: usize = 50 * 1024 * 1024;

/// File parts keyed by field name and text parts keyed by field name.
#[derive(Debug, Default)]
pub struct ParsedForm {
    pub files: HashMap<String, Upload>,
    pub fields: HashMap<String, String>,
}

impl ParsedForm {
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn into_generation_request(mut self) -> GenerationRequest {
        GenerationRequest {
            roster: self.take_file(ROSTER_FIELD),
            outcomes: self.take_file(OUTCOMES_FIELD),
            signature: self.take_file(SIGNATURE_FIELD),
            year: self.field("year").unwrap_or_default().to_string(),
            course_name: self.field("courseName").unwrap_or_default().to_string(),
            semester: self.field("semester").map(str::to_string),
            issue_date: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Field '{0}' exceeds the {MAX_PART_BYTES} byte limit")]
    TooLarge(String),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Collect every part. Parts with a filename are files, the rest text.
    pub async fn parse_form(mut multipart: Multipart) -> Result<ParsedForm, MultipartParseError> {
        let mut form = ParsedForm::default();

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
                .to_string();
            let filename = content_disposition.get_filename().map(|f| sanitize(f));

            let mut buffer = Vec::new();
            while let Some(chunk) = field.next().await {
                let data = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
                if buffer.len() + data.len() > MAX_PART_BYTES {
                    return Err(MultipartParseError::TooLarge(name));
                }
                buffer.extend_from_slice(&data);
            }

            match filename {
                Some(filename) => {
                    log::debug!("Received file '{}' ({} bytes) as '{}'", filename, buffer.len(), name);
                    form.files.insert(name, Upload::new(filename, buffer));
                }
                None => {
                    let value = String::from_utf8(buffer)
                        .map_err(|e| MultipartParseError::Utf8Error(e.to_string()))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }
}
