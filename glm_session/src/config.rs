use crate::error::{SessionError, SessionResult};
use glm_devices::DeviceTarget;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};

pub const DEFAULT_MODEL_PATH: &str = "./glm-4-9b-chat-int4";
pub const DEFAULT_TOKENIZER_SOURCE: &str = "THUDM/glm-4-9b-chat-hf";
pub const DEFAULT_VISION_TOKENIZER_SOURCE: &str = "THUDM/glm-4v-9b";
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个人工智能助手，请认真回答下面的问题";

/// Sampling settings passed to the generator on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(default)]
pub struct GenerationParams {
    #[builder(default = 512)]
    pub max_new_tokens: u32,
    #[builder(default = true)]
    pub do_sample: bool,
    #[builder(default = 5)]
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Everything the Conversation Manager and its model loader need.
///
/// Stored as TOML. Missing keys take their defaults, so an empty file is a
/// valid single-user configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(default)]
#[builder(on(String, into))]
pub struct SessionConfig {
    /// Exporter output directory, or the quantized model file itself.
    #[builder(default = DEFAULT_MODEL_PATH.to_string())]
    pub model_path: String,

    /// Local tokenizer directory or Hugging Face repo id.
    pub tokenizer_source: Option<String>,

    #[builder(default)]
    pub vision: bool,

    #[builder(default)]
    pub generation: GenerationParams,

    #[builder(default = DEFAULT_SYSTEM_PROMPT.to_string())]
    pub system_prompt: String,

    #[builder(default)]
    pub device: DeviceTarget,

    /// Non-empty switches the manager to one history per listed user.
    #[builder(default)]
    pub multi_user_list: Vec<String>,

    #[builder(default)]
    pub multi_user_system_prompt: HashMap<String, String>,

    /// Keep at most this many user/assistant pairs per history.
    pub max_history_turns: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    /// Reads the config from a TOML file, writing the defaults there first if
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let config: Self = confy::load_path(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn store<P: AsRef<Path>>(&self, path: P) -> SessionResult<()> {
        confy::store_path(path.as_ref(), self)?;
        Ok(())
    }

    pub fn tokenizer_source(&self) -> &str {
        match &self.tokenizer_source {
            Some(source) => source,
            None if self.vision => DEFAULT_VISION_TOKENIZER_SOURCE,
            None => DEFAULT_TOKENIZER_SOURCE,
        }
    }

    pub fn is_multi_user(&self) -> bool {
        !self.multi_user_list.is_empty()
    }

    /// The system prompt a user's history starts from.
    pub fn system_prompt_for(&self, user_id: &str) -> &str {
        self.multi_user_system_prompt
            .get(user_id)
            .map(String::as_str)
            .unwrap_or(&self.system_prompt)
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.generation.max_new_tokens == 0 {
            return Err(SessionError::Config(
                "generation.max_new_tokens must be at least 1".to_string(),
            ));
        }
        if self.generation.do_sample && self.generation.top_k == 0 {
            return Err(SessionError::Config(
                "generation.top_k must be at least 1 when sampling".to_string(),
            ));
        }
        if self.max_history_turns == Some(0) {
            return Err(SessionError::Config(
                "max_history_turns must be at least 1 when set".to_string(),
            ));
        }
        for user_id in self.multi_user_system_prompt.keys() {
            if !self.multi_user_list.contains(user_id) {
                crate::warn!("System prompt override for `{user_id}` ignored: not in multi_user_list");
            }
        }
        Ok(())
    }
}
