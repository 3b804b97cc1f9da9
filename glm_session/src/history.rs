use crate::message::{ImageAttachment, Message};

/// Ordered messages of one conversation.
///
/// The first message is always the system message the history was created
/// with. Nothing hands out mutable access to messages already appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new<T: Into<String>>(system_prompt: T) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a history holds at least its system message.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn system_prompt(&self) -> &str {
        self.messages[0].content()
    }

    /// Completed user/assistant pairs after the system message.
    pub fn turns(&self) -> usize {
        (self.messages.len() - 1) / 2
    }

    pub fn push_user<T: Into<String>>(&mut self, content: T, image: Option<ImageAttachment>) {
        let message = match image {
            Some(image) => Message::user_with_image(content, image),
            None => Message::user(content),
        };
        self.messages.push(message);
    }

    pub fn push_assistant<T: Into<String>>(&mut self, content: T) {
        self.messages.push(Message::assistant(content));
    }

    /// Drops everything but the system message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Shortens the history to `len` messages, keeping the system message.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len.max(1));
    }

    /// Drops the oldest user/assistant pairs until at most `max_turns` remain.
    pub fn trim_to_turns(&mut self, max_turns: usize) {
        let body = self.messages.len() - 1;
        let remove = body.saturating_sub(max_turns * 2);
        if remove > 0 {
            self.messages.drain(1..1 + remove);
        }
    }
}
