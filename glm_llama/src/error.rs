// top-level error for the public API

#[derive(Debug, thiserror::Error)]
pub enum LlamaError {
    #[error(transparent)]
    Process(#[from] crate::server::guard::ProcessError),

    #[error(transparent)]
    Client(#[from] crate::client::error::ClientError),

    #[error(transparent)]
    Models(#[from] glm_models::ModelsError),

    #[error(transparent)]
    Session(#[from] glm_session::SessionError),

    #[error("server launch failed: {0}")]
    ServerLaunch(String),

    #[error("quantization failed: {0}")]
    Quantize(String),

    #[error("unusable model artifact {path}: {reason}")]
    Artifact {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("{operation} failed for '{path}'")]
    FileSystem {
        operation: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type LlamaResult<T> = std::result::Result<T, LlamaError>;

impl LlamaError {
    pub fn file_system(
        operation: &'static str,
        path: impl Into<std::path::PathBuf>,
        err: impl Into<std::io::Error>,
    ) -> Self {
        Self::FileSystem {
            operation,
            path: path.into(),
            source: err.into(),
        }
    }

    pub fn artifact(path: impl Into<std::path::PathBuf>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
