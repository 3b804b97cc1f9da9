use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ModelsError {
    #[error("I/O error while trying to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("chat template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Hugging Face hub error: {0}")]
    Hub(String),

    #[error("required file `{file}` not found in {source_name}")]
    MissingFile { file: String, source_name: String },

    #[error("invalid GGUF file: {0}")]
    Gguf(String),
}

impl ModelsError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelsError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<hf_hub::api::sync::ApiError> for ModelsError {
    fn from(e: hf_hub::api::sync::ApiError) -> Self {
        ModelsError::Hub(e.to_string())
    }
}

pub type ModelsResult<T> = std::result::Result<T, ModelsError>;
