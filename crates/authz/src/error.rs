use bookshelf_http::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingCredentials,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is empty")]
    EmptySubject,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "authentication rejected");
        match err {
            AuthError::MissingCredentials => AppError::unauthorized("Authentication required"),
            AuthError::MalformedHeader => AppError::unauthorized("Malformed Authorization header"),
            AuthError::InvalidToken(_) | AuthError::EmptySubject => {
                AppError::unauthorized("Invalid or expired token")
            }
        }
    }
}
