use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad credentials, or a session that is unknown or expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// An authenticated action was attempted without a resolved identity.
    #[error("no signed-in user, please sign in again")]
    NoUser,

    /// The row store rejected a filter, insert or update.
    #[error("{0}")]
    Query(String),

    #[error("upload failed: {0}")]
    Upload(String),

    /// The business unit of the current user is not (yet) known.
    #[error("business unit unavailable: {0}")]
    ProfileResolution(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A stored or submitted row does not match its table's shape.
    #[error("invalid record: {0}")]
    Validation(String),
}

impl Error {
    /// Message suitable for showing to the person who triggered the failure.
    /// Backend messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Error::Query(msg) => msg.clone(),
            Error::Database(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
