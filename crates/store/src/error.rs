use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid timestamp for subscriber {subscriber_id}: {millis}")]
    InvalidTimestamp { subscriber_id: String, millis: i64 },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_timestamp(subscriber_id: impl Into<String>, millis: i64) -> Self {
        Self::InvalidTimestamp {
            subscriber_id: subscriber_id.into(),
            millis,
        }
    }
}

impl hourbell_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

hourbell_common::impl_context!();
