use tracing::error;

use crate::utils::{DatabaseError, PipelineError};

#[derive(Responder, Debug)]
pub enum Error {
    #[response(status = 404)]
    NotFound(String),
    #[response(status = 400)]
    BadRequest(String),
    #[response(status = 401)]
    MissingAPIKey(String),
    #[response(status = 403)]
    InvalidAPIKey(String),
    #[response(status = 500)]
    InternalServer(String),
    #[response(status = 503)]
    ServiceUnavailable(String),
}

impl From<DatabaseError> for Error {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::DuplicationError { table: _ } => Error::BadRequest(e.to_string()),
            DatabaseError::ViolationError() => Error::BadRequest(e.to_string()),
            DatabaseError::Unavailable(_) => Error::ServiceUnavailable(e.to_string()),
            DatabaseError::Query(_) => {
                error!(error = ?e, "database query failed");
                Error::InternalServer("Database query failed".to_string())
            }
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<PipelineError> for Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::ZeroConcurrency => Error::InternalServer(e.to_string()),
            PipelineError::Database(e) => e.into(),
        }
    }
}
