use crate::{
    chat_template::{ChatTemplate, IMAGE_PLACEHOLDER},
    error::{ModelsError, ModelsResult},
    hub::HubClient,
    source::ArtifactSource,
};
use glm_session::{
    ChatTokenizer, ImageSlot, Message, RenderedPrompt, SessionError, SessionResult, VisionInputs,
};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer as HFTokenizer;

pub const TOKENIZER_JSON: &str = "tokenizer.json";
pub const TOKENIZER_CONFIG_JSON: &str = "tokenizer_config.json";
/// Copied next to `tokenizer.json` whenever the source has them.
pub const OPTIONAL_TOKENIZER_FILES: [&str; 3] = [
    TOKENIZER_CONFIG_JSON,
    "special_tokens_map.json",
    "generation_config.json",
];

/// Local paths of a tokenizer's files, downloaded first if the source is a hub repo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenizerFiles {
    pub tokenizer_json: PathBuf,
    /// File name and path of each optional file that exists.
    pub extras: Vec<(String, PathBuf)>,
}

impl TokenizerFiles {
    pub fn resolve(source: &ArtifactSource) -> ModelsResult<Self> {
        match source {
            ArtifactSource::Local(dir) => {
                let tokenizer_json = dir.join(TOKENIZER_JSON);
                if !tokenizer_json.is_file() {
                    return Err(ModelsError::MissingFile {
                        file: TOKENIZER_JSON.to_string(),
                        source_name: dir.display().to_string(),
                    });
                }
                let extras = OPTIONAL_TOKENIZER_FILES
                    .iter()
                    .map(|name| (name.to_string(), dir.join(name)))
                    .filter(|(_, path)| path.is_file())
                    .collect();
                Ok(Self {
                    tokenizer_json,
                    extras,
                })
            }
            ArtifactSource::Hub { repo_id } => {
                let hub = HubClient::new()?;
                let tokenizer_json = hub.fetch(repo_id, TOKENIZER_JSON)?;
                let extras = hub.fetch_optional(repo_id, &OPTIONAL_TOKENIZER_FILES)?;
                Ok(Self {
                    tokenizer_json,
                    extras,
                })
            }
        }
    }

    pub fn tokenizer_config(&self) -> Option<&Path> {
        self.extras
            .iter()
            .find(|(name, _)| name == TOKENIZER_CONFIG_JSON)
            .map(|(_, path)| path.as_path())
    }
}

/// GLM tokenizer: a Hugging Face `tokenizer.json` plus the model's chat template.
pub struct GlmTokenizer {
    tokenizer: HFTokenizer,
    chat_template: ChatTemplate,
}

impl fmt::Debug for GlmTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlmTokenizer")
            .field("vocab_size", &self.tokenizer.get_vocab_size(true))
            .field("chat_template", &self.chat_template)
            .finish()
    }
}

impl GlmTokenizer {
    /// `source` is a local tokenizer directory or a Hugging Face repo id.
    pub fn load(source: &str) -> ModelsResult<Self> {
        let source = ArtifactSource::parse(source);
        crate::info!("Loading tokenizer from {source}");
        let files = TokenizerFiles::resolve(&source)?;
        Self::from_files(&files)
    }

    pub fn from_files(files: &TokenizerFiles) -> ModelsResult<Self> {
        let tokenizer = HFTokenizer::from_file(&files.tokenizer_json)
            .map_err(|e| ModelsError::Tokenizer(e.to_string()))?;
        let chat_template = match files.tokenizer_config() {
            Some(path) => ChatTemplate::from_tokenizer_config_file(path)?,
            None => ChatTemplate::glm4(),
        };
        Ok(Self::new(tokenizer, chat_template))
    }

    pub fn new(tokenizer: HFTokenizer, chat_template: ChatTemplate) -> Self {
        Self {
            tokenizer,
            chat_template,
        }
    }

    pub fn chat_template(&self) -> &ChatTemplate {
        &self.chat_template
    }

    pub fn encode(&self, text: &str) -> ModelsResult<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| ModelsError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn decode_tokens(&self, tokens: &[u32], skip_special_tokens: bool) -> ModelsResult<String> {
        self.tokenizer
            .decode(tokens, skip_special_tokens)
            .map_err(|e| ModelsError::Tokenizer(e.to_string()))
    }

    /// Renders the chat template and tokenizes it. The template already emits
    /// every special token, so none are added here.
    pub fn render_prompt(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
    ) -> ModelsResult<RenderedPrompt> {
        let text = self.chat_template.render(messages, add_generation_prompt)?;
        let images: Vec<_> = messages.iter().filter_map(Message::image).collect();

        if images.is_empty() {
            return Ok(RenderedPrompt::text(self.encode(&text)?));
        }

        let spans: Vec<&str> = text.split(IMAGE_PLACEHOLDER).collect();
        if spans.len() - 1 != images.len() {
            return Err(ModelsError::Tokenizer(format!(
                "rendered prompt has {} image placeholders for {} images",
                spans.len() - 1,
                images.len()
            )));
        }

        let placeholder = self.encode(IMAGE_PLACEHOLDER)?;
        let mut input_ids = Vec::new();
        let mut slots = Vec::with_capacity(images.len());
        for (i, span) in spans.iter().enumerate() {
            if i > 0 {
                slots.push(ImageSlot {
                    token_offset: input_ids.len(),
                    image: images[i - 1].clone(),
                });
                input_ids.extend_from_slice(&placeholder);
            }
            if !span.is_empty() {
                input_ids.extend(self.encode(span)?);
            }
        }
        let position_ids = (0..input_ids.len() as u32).collect();
        Ok(RenderedPrompt {
            input_ids,
            vision: Some(VisionInputs {
                position_ids,
                images: slots,
            }),
        })
    }
}

impl ChatTokenizer for GlmTokenizer {
    fn render(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
    ) -> SessionResult<RenderedPrompt> {
        self.render_prompt(messages, add_generation_prompt)
            .map_err(|e| SessionError::Template(e.to_string()))
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> SessionResult<String> {
        self.decode_tokens(tokens, skip_special_tokens)
            .map_err(|e| SessionError::Decode(e.to_string()))
    }
}
