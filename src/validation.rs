use crate::error::AppError;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub type ApiError = Custom<Json<ValidationResponse>>;

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API Validation Error");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(_) => ("database", "Failed to access the database".to_string()),
            AppError::Validation(msg) => ("request", msg.clone()),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for rocket::serde::json::Error<'_> {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let message = match &self {
            rocket::serde::json::Error::Parse(_, err) => format!("Malformed request body: {}", err),
            other => format!("Could not read request body: {}", other),
        };

        AppError::Validation(message).to_validation_response()
    }
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut HashMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = field_errors.iter().map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                });
                out.entry(path).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct ValidationErrorWrapper(pub ValidationErrors);

impl From<ValidationErrorWrapper> for ApiError {
    #[instrument]
    fn from(wrapper: ValidationErrorWrapper) -> Self {
        let mut error_map = HashMap::new();
        collect_errors("", &wrapper.0, &mut error_map);

        Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::new(error_map)),
        )
    }
}

pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_custom(self) -> Result<T, ApiError> {
        let inner = self.into_inner();
        inner
            .validate()
            .map_err(|errors| ApiError::from(ValidationErrorWrapper(errors)))?;
        Ok(inner)
    }
}

impl<T: Validate> JsonValidateExt<T> for Result<Json<T>, rocket::serde::json::Error<'_>> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(ToValidationResponse::to_validation_response)?
            .validate_custom()
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(ToValidationResponse::to_validation_response)
    }
}
