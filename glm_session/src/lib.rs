//! # glm_session: Multi-user chat sessions over a local GLM model
//!
//! The glm_session crate is a workspace member of the glm chat project. It
//! keeps one chat history per user and turns each query into a response by
//! rendering the whole history through the model's chat template.
//!
//! ## Features
//!
//! - One shared history, or one history per user id (for bots that listen to
//!   several friends at once)
//! - Per-user system prompt overrides
//! - Optional image attachments on user turns
//! - All-or-nothing calls: a failed generation leaves the history untouched
//! - The model is reached through two narrow traits, [`ChatTokenizer`] and
//!   [`TextGenerator`], so the bookkeeping can run against any backend
//!
//! ## Use
//!
//! ```rust,ignore
//! use glm_session::*;
//!
//! let config = SessionConfig::builder()
//!     .system_prompt("You are a helpful assistant")
//!     .multi_user_list(vec!["alice".to_string(), "bob".to_string()])
//!     .build();
//! let mut manager = ConversationManager::new(config, backend)?;
//!
//! let reply = manager.get_response("hi", Some("alice"), None)?;
//! assert_eq!(manager.history(Some("alice"))?.len(), 3);
//!
//! manager.release_chat_memory("alice")?;
//! ```

// Internal modules
mod backend;
mod config;
mod error;
mod history;
mod manager;
mod message;
mod registry;

// Internal imports
#[allow(unused_imports)]
use tracing::{debug, error, info, span, trace, warn, Level};

// Public exports
pub use backend::{
    ChatBackend, ChatTokenizer, ImageSlot, ModelBackend, RenderedPrompt, TextGenerator,
    VisionInputs,
};
pub use config::{
    GenerationParams, SessionConfig, DEFAULT_MODEL_PATH, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TOKENIZER_SOURCE, DEFAULT_VISION_TOKENIZER_SOURCE,
};
pub use error::{SessionError, SessionResult};
pub use glm_devices::DeviceTarget;
pub use history::History;
pub use manager::ConversationManager;
pub use message::{ImageAttachment, Message, Role};
pub use registry::SessionRegistry;
