use log::*;
use thiserror::Error;
use tide::StatusCode;

/**
 * Everything that can go wrong while looking up or voting on a poll
 */
#[derive(Debug, Error)]
pub enum PollError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /**
     * A tally cannot hold another vote
     */
    #[error("tally overflow: {0}")]
    Overflow(String),
}

impl PollError {
    pub fn status(&self) -> StatusCode {
        match self {
            PollError::NotFound(_) => StatusCode::NotFound,
            PollError::InvalidInput(_) => StatusCode::BadRequest,
            PollError::Storage(_) | PollError::Overflow(_) => StatusCode::InternalServerError,
        }
    }

    /**
     * Convert into a tide::Error carrying the right status for the response
     */
    pub fn into_http(self) -> tide::Error {
        let status = self.status();
        match &self {
            PollError::Storage(err) => error!("Storage failure: {:?}", err),
            PollError::Overflow(msg) => error!("Tally overflow: {}", msg),
            _ => {}
        }
        tide::Error::from_str(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            PollError::NotFound("x".into()).status(),
            StatusCode::NotFound
        );
        assert_eq!(
            PollError::InvalidInput("x".into()).status(),
            StatusCode::BadRequest
        );
        assert_eq!(
            PollError::Storage(sqlx::Error::RowNotFound).status(),
            StatusCode::InternalServerError
        );
        assert_eq!(
            PollError::Overflow("x".into()).status(),
            StatusCode::InternalServerError
        );
    }

    #[test]
    fn into_http_keeps_status() {
        let err = PollError::NotFound("poll".into()).into_http();
        assert_eq!(err.status(), StatusCode::NotFound);
    }
}
