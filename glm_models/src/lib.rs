//! # glm_models: Tokenizers, chat templates and GGUF files for GLM models
//!
//! The glm_models crate is a workspace member of the glm chat project.
//!
//! ## Features
//!
//! * Load a Hugging Face `tokenizer.json` from a local directory or a hub repo
//! * Render chat templates from `tokenizer_config.json` with minijinja, with a
//!   built in GLM-4 fallback
//! * Tokenize rendered prompts, recording where image embeddings go
//! * Summarise GGUF headers (architecture, file type, tensor types) without
//!   reading tensor data
//!
//! [`GlmTokenizer`] implements [`glm_session::ChatTokenizer`], so it plugs
//! straight into a `ConversationManager` backend.

// Internal modules
mod chat_template;
mod error;
mod gguf;
mod hub;
mod source;
mod tokenizer;

// Internal imports
#[allow(unused_imports)]
use tracing::{debug, error, info, span, trace, warn, Level};

// Public exports
pub use chat_template::{apply_chat_template, ChatTemplate, GLM4_CHAT_TEMPLATE, IMAGE_PLACEHOLDER};
pub use error::{ModelsError, ModelsResult};
pub use gguf::{GgmlDtype, GgufSummary};
pub use hub::{HubClient, HF_TOKEN_ENV_VAR};
pub use source::ArtifactSource;
pub use tokenizer::{
    GlmTokenizer, TokenizerFiles, OPTIONAL_TOKENIZER_FILES, TOKENIZER_CONFIG_JSON, TOKENIZER_JSON,
};
