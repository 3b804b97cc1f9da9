#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no chat history for user `{0}`")]
    UserNotFound(String),

    #[error("a user id is required when multi-user mode is enabled")]
    UserIdRequired,

    #[error("chat memory can only be released per user in multi-user mode")]
    SingleUserMode,

    #[error("chat template rendering failed: {0}")]
    Template(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("decoding failed: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load {0}")]
    Load(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl From<confy::ConfyError> for SessionError {
    fn from(e: confy::ConfyError) -> Self {
        SessionError::Config(e.to_string())
    }
}
