use thiserror::Error;

use crate::models::RoutingLetter;

pub type BotResult<T> = Result<T, BotError>;

/// Refusal shown for every admin-only operation; deliberately carries no detail.
pub const REFUSAL_MESSAGE: &str = "⛔ You are not an admin.";
pub(crate) const STORAGE_FAILURE_MESSAGE: &str = "⚠️ Something went wrong. Please try again later.";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum BotError {
    /// Malformed input; the message is shown to the user as-is and the state stays put.
    #[error("{0}")]
    Validation(String),
    #[error("not authorized")]
    Unauthorized,
    #[error("no active session")]
    NoActiveSession,
    #[error("test {0} has no questions")]
    EmptyTest(i64),
    #[error("could not reserve a slot in any {0} group")]
    AllocationExhausted(RoutingLetter),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("session storage failure: {0}")]
    Session(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BotError {
    pub fn validation(message: impl Into<String>) -> Self {
        BotError::Validation(message.into())
    }

    pub fn user_message(&self) -> String {
        match self {
            BotError::Validation(message) => message.clone(),
            BotError::Unauthorized => REFUSAL_MESSAGE.to_string(),
            BotError::NoActiveSession => {
                "❌ No question found or the test has already finished.".to_string()
            }
            BotError::EmptyTest(_) => "❌ This test has no questions.".to_string(),
            BotError::AllocationExhausted(letter) => {
                format!("No free slot in the {} groups right now.", letter)
            }
            BotError::Storage(_) | BotError::Session(_) => STORAGE_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Errors the user caused, as opposed to infrastructure failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BotError::Validation(_)
                | BotError::Unauthorized
                | BotError::NoActiveSession
                | BotError::EmptyTest(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.into(),
        }
    }
}
