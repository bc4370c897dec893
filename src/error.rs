use std::time::Duration;

use thiserror::Error;

use crate::quiz::flow::Step;
use crate::quiz::ident::QuizId;

/// Input rejected by a question step. The session stays where it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name is {len} characters long, at most {max} are allowed")]
    NameTooLong { len: usize, max: usize },

    #[error("{input:?} is not one of the options for {step:?}")]
    NotAnOption { step: Step, input: String },

    #[error("the flow has already finished")]
    Finished,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("quiz id {0} is already taken")]
    DuplicateKey(QuizId),

    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("store is unavailable: {0}")]
    Unavailable(String),

    #[error("stored row is malformed: {0}")]
    Corrupt(String),

    #[error("sqlite: {0}")]
    Backend(#[from] rusqlite::Error),
}

impl StoreError {
    /// Timeouts and unavailability are worth retrying the whole event for.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Unavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_outages_are_transient() {
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StoreError::Unavailable("closed".into()).is_transient());
        assert!(!StoreError::Corrupt("height".into()).is_transient());
        let id = QuizId::parse("quiz_0123456789ab").unwrap();
        assert!(!StoreError::DuplicateKey(id).is_transient());
    }

    #[test]
    fn messages_name_the_problem() {
        let err = ValidationError::NameTooLong { len: 120, max: 100 };
        assert_eq!(
            err.to_string(),
            "name is 120 characters long, at most 100 are allowed"
        );
    }
}
