mod scenarios;

#[allow(unused_imports)]
use anyhow::{anyhow, bail, Error, Result};
use glm_session::{
    ChatTokenizer, GenerationParams, ImageSlot, Message, RenderedPrompt, SessionError,
    SessionResult, TextGenerator, VisionInputs,
};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    Render,
    Generate,
    ShortOutput,
    Decode,
}

/// One token per message on render. Replies are scripted and encoded one
/// token per char, so decode turns them back into the same text.
#[derive(Default)]
pub struct StubBackend {
    replies: RefCell<VecDeque<String>>,
    fail_next: Cell<Option<Failure>>,
    pub renders: RefCell<Vec<(Vec<Message>, bool)>>,
    pub prompts: RefCell<Vec<(RenderedPrompt, GenerationParams)>>,
    pub decodes: RefCell<Vec<(Vec<u32>, bool)>>,
}

impl StubBackend {
    pub fn with_replies<I: IntoIterator<Item = &'static str>>(replies: I) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(str::to_owned).collect()),
            ..Default::default()
        }
    }

    pub fn fail_next(&self, failure: Failure) {
        self.fail_next.set(Some(failure));
    }

    fn take_failure(&self, stage: Failure) -> bool {
        if self.fail_next.get() == Some(stage) {
            self.fail_next.set(None);
            true
        } else {
            false
        }
    }
}

impl ChatTokenizer for StubBackend {
    fn render(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
    ) -> SessionResult<RenderedPrompt> {
        self.renders
            .borrow_mut()
            .push((messages.to_vec(), add_generation_prompt));
        if self.take_failure(Failure::Render) {
            return Err(SessionError::Template("stub render failure".to_string()));
        }
        let input_ids: Vec<u32> = (0..messages.len() as u32).map(|i| 10_000 + i).collect();
        let images: Vec<ImageSlot> = messages
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                m.image().map(|image| ImageSlot {
                    token_offset: i,
                    image: image.clone(),
                })
            })
            .collect();
        let vision = (!images.is_empty()).then(|| VisionInputs {
            position_ids: (0..input_ids.len() as u32).collect(),
            images,
        });
        Ok(RenderedPrompt { input_ids, vision })
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> SessionResult<String> {
        self.decodes
            .borrow_mut()
            .push((tokens.to_vec(), skip_special_tokens));
        if self.take_failure(Failure::Decode) {
            return Err(SessionError::Decode("stub decode failure".to_string()));
        }
        tokens
            .iter()
            .map(|t| char::from_u32(*t).ok_or_else(|| SessionError::Decode(format!("token {t}"))))
            .collect()
    }
}

impl TextGenerator for StubBackend {
    fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> SessionResult<Vec<u32>> {
        self.prompts.borrow_mut().push((prompt.clone(), *params));
        if self.take_failure(Failure::Generate) {
            return Err(SessionError::Generation("stub generate failure".to_string()));
        }
        if self.take_failure(Failure::ShortOutput) {
            return Ok(prompt.input_ids[..prompt.len() - 1].to_vec());
        }
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string());
        let mut output = prompt.input_ids.clone();
        output.extend(reply.chars().map(u32::from));
        Ok(output)
    }
}
