use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use crate::JsonResponse;

#[derive(Debug)]
pub enum RequestError {
    BadRequest(String),
    NotFound(&'static str),
    NotAuthorized(&'static str),
    /// A provider credential or setting is missing.
    Configuration(StatusCode, &'static str),
    Generation,
    Upstream(&'static str),
    ServerError,
    DatabaseError(sqlx::Error),
}

/// Failures of the outbound HTTP clients (news provider, summariser, mail relay).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("{0} is not configured")]
    MissingKey(&'static str),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: &str) -> ErrorMessage {
        ErrorMessage {
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RequestError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::Configuration(status, _) => *status,
            RequestError::Generation
            | RequestError::Upstream(_)
            | RequestError::ServerError
            | RequestError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<ErrorMessage> {
        let json = match self {
            RequestError::BadRequest(message) => ErrorMessage::new(message),
            RequestError::NotFound(message)
            | RequestError::NotAuthorized(message)
            | RequestError::Configuration(_, message)
            | RequestError::Upstream(message) => ErrorMessage::new(message),
            RequestError::Generation => ErrorMessage::new("Failed to generate summary"),
            RequestError::ServerError => ErrorMessage::new("Something went wrong!"),
            RequestError::DatabaseError(e) => {
                error!("Database error: {}", e);
                ErrorMessage::new("Something went wrong!")
            }
        };
        (self.status(), Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_keep_their_status() {
        let err = RequestError::Configuration(StatusCode::BAD_REQUEST, "NewsAPI key not configured");
        let (status, Json(body)) = err.to_json_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "NewsAPI key not configured");
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let err = RequestError::from(sqlx::Error::RowNotFound);
        let (status, Json(body)) = err.to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Something went wrong!");
    }
}
