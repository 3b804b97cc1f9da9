//! The narrow seam between conversation bookkeeping and a concrete model.
//!
//! [`ChatTokenizer`] turns messages into token ids and back; [`TextGenerator`]
//! continues a rendered prompt. Any pair of implementations makes a
//! [`ChatBackend`].

use crate::{config::GenerationParams, error::SessionResult, message::{ImageAttachment, Message}};

/// Token ids for the full conversation, with the extra inputs a vision model needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub input_ids: Vec<u32>,
    /// Present when any message in the conversation carries an image.
    pub vision: Option<VisionInputs>,
}

impl RenderedPrompt {
    pub fn text(input_ids: Vec<u32>) -> Self {
        Self {
            input_ids,
            vision: None,
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisionInputs {
    pub position_ids: Vec<u32>,
    /// Images in conversation order.
    pub images: Vec<ImageSlot>,
}

/// An image and the offset into `input_ids` where its embedding goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    pub token_offset: usize,
    pub image: ImageAttachment,
}

pub trait ChatTokenizer {
    /// Applies the chat template to `messages` and tokenizes the result.
    fn render(&self, messages: &[Message], add_generation_prompt: bool)
        -> SessionResult<RenderedPrompt>;

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> SessionResult<String>;
}

pub trait TextGenerator {
    /// Returns the prompt tokens followed by the newly generated tokens.
    fn generate(&self, prompt: &RenderedPrompt, params: &GenerationParams)
        -> SessionResult<Vec<u32>>;
}

pub trait ChatBackend: ChatTokenizer + TextGenerator {}

impl<T: ChatTokenizer + TextGenerator> ChatBackend for T {}

/// A tokenizer and a generator loaded separately, used as one backend.
#[derive(Debug)]
pub struct ModelBackend<T, G> {
    pub tokenizer: T,
    pub generator: G,
}

impl<T, G> ModelBackend<T, G> {
    pub fn new(tokenizer: T, generator: G) -> Self {
        Self {
            tokenizer,
            generator,
        }
    }
}

impl<T: ChatTokenizer, G> ChatTokenizer for ModelBackend<T, G> {
    fn render(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
    ) -> SessionResult<RenderedPrompt> {
        self.tokenizer.render(messages, add_generation_prompt)
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> SessionResult<String> {
        self.tokenizer.decode(tokens, skip_special_tokens)
    }
}

impl<T, G: TextGenerator> TextGenerator for ModelBackend<T, G> {
    fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> SessionResult<Vec<u32>> {
        self.generator.generate(prompt, params)
    }
}
