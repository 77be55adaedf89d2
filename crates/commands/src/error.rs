use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The subscriber store refused the mutation; the caller decides how to
    /// surface it.
    #[error("subscriber store: {0}")]
    Store(#[from] hourbell_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
