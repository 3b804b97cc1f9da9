//! glm_llama: GLM-4 on llama.cpp
//! =============================
//!
//! ## Export
//! - **4-bit only** – [`ExportRequest`] turns a full-precision GGUF checkpoint
//!   into a `Q4_0` model with `llama-quantize`, then writes the tokenizer files
//!   beside it.
//! - **Checked artifacts** – Input and output GGUF headers are read before and
//!   after quantizing. An already quantized input is refused.
//!
//! ## Chat
//! - **[`load_backend`]** – Finds the exported model, loads its tokenizer and
//!   starts a local `llama-server`. The result plugs into
//!   [`glm_session::ConversationManager`].
//! - **Owned process** – The server is killed when the backend is dropped.
//!
//! ## Binaries
//! - **`glm-export`** – One-shot export.
//! - **`glm-chat`** – Terminal chat over a `SessionConfig` TOML file.
//!
//! ---
//!
//! ```rust,no_run
//! use glm_llama::*;
//! use glm_session::{ConversationManager, SessionConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     ExportRequest::builder()
//!         .checkpoint("./glm-4-9b-chat")
//!         .tokenizer_source("THUDM/glm-4-9b-chat-hf")
//!         .destination("glm-4-9b-chat-int4")
//!         .build()
//!         .run()?;
//!
//!     let config = SessionConfig::builder().model_path("glm-4-9b-chat-int4").build();
//!     let backend = load_backend(&config, &RuntimeOptions::default())?;
//!     let mut manager = ConversationManager::new(config, backend)?;
//!     println!("{}", manager.get_response("你好", None, None)?);
//!     Ok(())
//! }
//! ```
//!
//! ```text
//!  glm-export                         glm-chat
//!      │                                  │
//!      ├─→ GgufSummary   (inspect)        ├─→ SessionConfig        (TOML)
//!      ├─→ Quantizer     (llama-quantize) ├─→ load_backend
//!      ├─→ GgufSummary   (verify)         │      ├─→ GlmTokenizer  (template + ids)
//!      └─→ TokenizerFiles (copy)          │      └─→ LlamaServer   (/completion)
//!                                         └─→ ConversationManager
//! ```

// Internal modules
pub mod backend;
pub mod client;
pub mod error;
pub mod export;
pub mod quantize;
pub mod server;

// Internal imports
#[allow(unused_imports)]
use tracing::{debug, error, info, span, trace, warn, Level};

// Public exports
pub use backend::{load_backend, GlmBackend, LlamaGenerator, ModelArtifacts, RuntimeOptions};
pub use client::{
    completion::{completion_request, CompletionRequest, CompletionResponse, ImageData, PromptPiece},
    http::HttpClient,
    ClientError, ServerClient, ServerClientExt,
};
pub use error::{LlamaError, LlamaResult};
pub use export::{materialize_tokenizer, output_file_name, ExportReport, ExportRequest};
pub use quantize::{Quantizer, QUANT_TYPE};
pub use server::{
    guard::{ProcessError, ServerProcessGuard},
    launch::{LaunchOptions, LlamaServer, LoadBudget, RetryDelay, ServerStatus},
    tool_path, LLAMA_QUANTIZE_BIN, LLAMA_SERVER_BIN,
};
