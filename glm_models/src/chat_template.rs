use crate::error::{ModelsError, ModelsResult};
use glm_session::Message;
use minijinja::{
    context,
    value::{from_args, Value, ValueKind},
    Environment, Error, ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, path::Path};

/// Marks where an image's embedding goes in a GLM-4V prompt.
pub const IMAGE_PLACEHOLDER: &str = "<|begin_of_image|><|endoftext|><|end_of_image|>";

/// Used when `tokenizer_config.json` carries no template.
pub const GLM4_CHAT_TEMPLATE: &str = "[gMASK]<sop>{% for item in messages %}<|{{ item['role'] }}|>\n{% if item['image'] %}<|begin_of_image|><|endoftext|><|end_of_image|>{% endif %}{{ item['content'] }}{% endfor %}{% if add_generation_prompt %}<|assistant|>{% endif %}";

const GLM4_EOS_TOKEN: &str = "<|endoftext|>";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTemplate {
    pub chat_template: String,
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
    pub unk_token: Option<String>,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self::glm4()
    }
}

#[derive(Serialize)]
struct TemplateMessage<'a> {
    role: &'static str,
    content: Cow<'a, str>,
    image: bool,
}

impl ChatTemplate {
    pub fn glm4() -> Self {
        Self {
            chat_template: GLM4_CHAT_TEMPLATE.to_string(),
            bos_token: None,
            eos_token: Some(GLM4_EOS_TOKEN.to_string()),
            unk_token: None,
        }
    }

    pub fn from_tokenizer_config_file<P: AsRef<Path>>(path: P) -> ModelsResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ModelsError::io("read", path, e))?;
        let config: serde_json::Value =
            serde_json::from_str(&raw).map_err(|source| ModelsError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_tokenizer_config(&config))
    }

    /// Reads `chat_template` and the special tokens out of a parsed
    /// `tokenizer_config.json`. Falls back to the GLM-4 template.
    pub fn from_tokenizer_config(config: &serde_json::Value) -> Self {
        let chat_template = match config.get("chat_template") {
            Some(serde_json::Value::String(template)) => Some(template.clone()),
            // Named templates: prefer "default", else the first one.
            Some(serde_json::Value::Array(templates)) => templates
                .iter()
                .find(|t| t.get("name").and_then(|n| n.as_str()) == Some("default"))
                .or_else(|| templates.first())
                .and_then(|t| t.get("template"))
                .and_then(|t| t.as_str())
                .map(str::to_owned),
            _ => None,
        };
        let Some(chat_template) = chat_template else {
            crate::debug!("No chat_template in tokenizer config, using the GLM-4 default");
            return Self {
                eos_token: special_token(config, "eos_token").or(Some(GLM4_EOS_TOKEN.to_string())),
                ..Self::glm4()
            };
        };
        Self {
            chat_template,
            bos_token: special_token(config, "bos_token"),
            eos_token: special_token(config, "eos_token"),
            unk_token: special_token(config, "unk_token"),
        }
    }

    /// Whether the template itself writes [`IMAGE_PLACEHOLDER`] for image turns.
    pub fn emits_image_placeholder(&self) -> bool {
        self.chat_template.contains("<|begin_of_image|>")
    }

    pub fn render(&self, messages: &[Message], add_generation_prompt: bool) -> ModelsResult<String> {
        let prefix_images = !self.emits_image_placeholder();
        let messages: Vec<TemplateMessage<'_>> = messages
            .iter()
            .map(|message| {
                let image = message.image().is_some();
                let content = if image && prefix_images {
                    Cow::Owned(format!("{IMAGE_PLACEHOLDER}{}", message.content()))
                } else {
                    Cow::Borrowed(message.content())
                };
                TemplateMessage {
                    role: message.role().as_str(),
                    content,
                    image,
                }
            })
            .collect();
        apply_chat_template(
            &messages,
            &self.chat_template,
            self.bos_token.as_deref(),
            self.eos_token.as_deref(),
            self.unk_token.as_deref(),
            add_generation_prompt,
        )
    }
}

fn special_token(config: &serde_json::Value, key: &str) -> Option<String> {
    match config.get(key)? {
        serde_json::Value::String(token) => Some(token.clone()),
        // AddedToken form: {"content": "<|endoftext|>", "lstrip": false, ...}
        serde_json::Value::Object(token) => token
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_owned),
        _ => None,
    }
}

pub fn apply_chat_template<M: Serialize>(
    messages: &M,
    chat_template: &str,
    bos_token: Option<&str>,
    eos_token: Option<&str>,
    unk_token: Option<&str>,
    add_generation_prompt: bool,
) -> ModelsResult<String> {
    let mut env = Environment::new();
    env.set_lstrip_blocks(true);
    env.set_trim_blocks(true);
    env.add_template("chat_template", chat_template)?;
    env.add_function("raise_exception", raise_exception);

    env.set_unknown_method_callback(|state, value, method, args| match (value.kind(), method) {
        (ValueKind::String, "strip") => {
            let _: () = from_args(args)?;
            Ok(Value::from(value.as_str().unwrap_or("").trim()))
        }
        (ValueKind::Map, "items") => {
            let _: () = from_args(args)?;
            state.apply_filter("items", &[value.clone()])
        }
        _ => Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("object has no method named {}", method),
        )),
    });

    let tmpl = env.get_template("chat_template")?;
    Ok(tmpl.render(context! {
        messages => messages,
        add_generation_prompt => add_generation_prompt,
        bos_token => bos_token.unwrap_or(""),
        eos_token => eos_token.unwrap_or(""),
        unk_token => unk_token.unwrap_or(""),
    })?)
}

/// Lets templates abort rendering with `raise_exception('...')`.
fn raise_exception(msg: String) -> Result<String, minijinja::Error> {
    Err(minijinja::Error::new(ErrorKind::InvalidOperation, msg))
}
