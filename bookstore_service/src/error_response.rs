use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::web::{JsonConfig, PathConfig, QueryConfig};
use actix_web::{HttpRequest, HttpResponse};

use crate::api::ErrorResponse;
use crate::book_service::BookServiceError;

const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

impl BookServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookServiceError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            BookServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            BookServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
            BookServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_body(status: StatusCode, message: String, path: &str) -> ErrorResponse {
    ErrorResponse::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        message,
        path,
    )
}

/// Renders a service error as a response for the request at `path`.
/// Storage failures are logged here and never exposed in the body
pub fn service_error_response(err: BookServiceError, path: &str) -> HttpResponse {
    let status = err.status_code();
    let body = match err {
        BookServiceError::InvalidInput {
            message,
            violations,
        } => {
            tracing::warn!(path = path, "Validation error: {} {:?}", message, violations);
            let body = error_body(status, message, path);
            if violations.is_empty() {
                body
            } else {
                body.with_validation_errors(violations)
            }
        }
        BookServiceError::NotFound(_) | BookServiceError::AlreadyExists(_) => {
            tracing::warn!(path = path, "{}", err);
            error_body(status, err.to_string(), path)
        }
        BookServiceError::Unexpected(err) => {
            tracing::error!(path = path, "Unexpected error occurred {}", err);
            error_body(status, UNEXPECTED_ERROR_MESSAGE.to_string(), path)
        }
    };
    HttpResponse::build(status).json(body)
}

/// Fallback for paths no route matches
pub async fn unknown_route(req: HttpRequest) -> HttpResponse {
    tracing::warn!(path = req.path(), "No route for {} {}", req.method(), req.path());
    let message = format!("No endpoint {} {}", req.method(), req.path());
    HttpResponse::NotFound().json(error_body(StatusCode::NOT_FOUND, message, req.path()))
}

/// Fallback for a known path called with a method it does not support
pub async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    tracing::warn!(path = req.path(), "Method {} not allowed", req.method());
    let message = format!("Method {} is not supported for {}", req.method(), req.path());
    HttpResponse::MethodNotAllowed().json(error_body(
        StatusCode::METHOD_NOT_ALLOWED,
        message,
        req.path(),
    ))
}

fn bad_request<E>(err: E, message: String, req: &HttpRequest) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    tracing::warn!(path = req.path(), "Malformed request: {}", err);
    let body = error_body(StatusCode::BAD_REQUEST, message, req.path());
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Rejects unparsable JSON bodies with an [`ErrorResponse`]
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err: JsonPayloadError, req: &HttpRequest| {
        let message = format!("Malformed request body: {}", err);
        bad_request(err, message, req)
    })
}

/// Rejects path parameters of the wrong type, e.g. a non numeric book id
pub fn path_config() -> PathConfig {
    PathConfig::default().error_handler(|err: PathError, req: &HttpRequest| {
        let message = format!(
            "Invalid value in path '{}'. Expected a numeric book id",
            req.path()
        );
        bad_request(err, message, req)
    })
}

pub fn query_config() -> QueryConfig {
    QueryConfig::default().error_handler(|err: QueryPayloadError, req: &HttpRequest| {
        let message = format!("Invalid query parameters: {}", err);
        bad_request(err, message, req)
    })
}
