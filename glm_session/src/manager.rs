use crate::{
    backend::ChatBackend,
    config::{GenerationParams, SessionConfig},
    error::{SessionError, SessionResult},
    history::History,
    message::{ImageAttachment, Message},
    registry::SessionRegistry,
};

/// Holds the loaded model and every user's chat history.
///
/// Calls take `&mut self`, so one manager serves one call at a time. Wrap it in
/// a `Mutex` to share it between threads.
pub struct ConversationManager<B: ChatBackend> {
    config: SessionConfig,
    backend: B,
    registry: SessionRegistry,
}

impl<B: ChatBackend> ConversationManager<B> {
    pub fn new(config: SessionConfig, backend: B) -> SessionResult<Self> {
        config.validate()?;
        let registry = SessionRegistry::from_config(&config);
        match &registry {
            SessionRegistry::Single(_) => crate::info!("Conversation manager ready (single user)"),
            SessionRegistry::Multi(histories) => crate::info!(
                "Conversation manager ready ({} users)",
                histories.len()
            ),
        }
        Ok(Self {
            config,
            backend,
            registry,
        })
    }

    /// Appends `query` to the target history, generates a reply over the
    /// whole conversation and appends it as well.
    ///
    /// If rendering, generation or decoding fails, the history is left exactly
    /// as it was before the call.
    pub fn get_response(
        &mut self,
        query: &str,
        user_id: Option<&str>,
        image: Option<ImageAttachment>,
    ) -> SessionResult<String> {
        let history = self.registry.resolve_mut(user_id)?;
        let checkpoint = history.len();
        history.push_user(query, image);

        let text = match respond(&self.backend, &self.config.generation, history.messages()) {
            Ok(text) => text,
            Err(e) => {
                history.truncate(checkpoint);
                crate::warn!("Response failed, history rolled back: {e}");
                return Err(e);
            }
        };

        history.push_assistant(text.as_str());
        if let Some(reply) = history.messages().last() {
            crate::trace!("Appended {reply}");
        }
        if let Some(max_turns) = self.config.max_history_turns {
            history.trim_to_turns(max_turns);
        }
        Ok(text)
    }

    /// Resets a user's history to their initial system message.
    pub fn release_chat_memory(&mut self, user_id: &str) -> SessionResult<()> {
        let history = self.registry.keyed_mut(user_id)?;
        crate::trace!("Releasing {} messages for `{user_id}`", history.len() - 1);
        history.reset();
        Ok(())
    }

    pub fn history(&self, user_id: Option<&str>) -> SessionResult<&History> {
        self.registry.resolve(user_id)
    }

    pub fn users(&self) -> Vec<&str> {
        self.registry.users()
    }

    pub fn is_multi_user(&self) -> bool {
        self.registry.is_multi_user()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn respond<B: ChatBackend>(
    backend: &B,
    params: &GenerationParams,
    messages: &[Message],
) -> SessionResult<String> {
    let prompt = backend.render(messages, true)?;
    let output = backend.generate(&prompt, params)?;
    let new_tokens = output.get(prompt.len()..).ok_or_else(|| {
        SessionError::Generation(format!(
            "generator returned {} tokens for a {} token prompt",
            output.len(),
            prompt.len()
        ))
    })?;
    crate::debug!(
        prompt_tokens = prompt.len(),
        new_tokens = new_tokens.len(),
        "Generated response"
    );
    backend.decode(new_tokens, true)
}

impl<B: ChatBackend> std::fmt::Debug for ConversationManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
