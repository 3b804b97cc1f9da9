use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// Speaker of a message, using the role names chat templates expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that steer the model. Always the first message of a history.
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded image bytes attached to a user turn.
///
/// The bytes are kept as-is (PNG, JPEG, ...). Decoding is left to the model runtime.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    bytes: Vec<u8>,
    mime_type: Option<String>,
}

impl ImageAttachment {
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B, mime_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.map(str::to_owned),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_from_extension);
        Ok(Self::from_bytes(bytes, mime_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// One turn of a conversation.
///
/// Text and image turns are separate variants, so whether a turn carries an
/// image is decided when the message is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Text {
        role: Role,
        content: String,
    },
    Image {
        role: Role,
        content: String,
        image: ImageAttachment,
    },
}

impl Message {
    pub fn system<T: Into<String>>(content: T) -> Self {
        Message::Text {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user<T: Into<String>>(content: T) -> Self {
        Message::Text {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn user_with_image<T: Into<String>>(content: T, image: ImageAttachment) -> Self {
        Message::Image {
            role: Role::User,
            content: content.into(),
            image,
        }
    }

    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Message::Text {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::Text { role, .. } | Message::Image { role, .. } => *role,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::Text { content, .. } | Message::Image { content, .. } => content,
        }
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        match self {
            Message::Text { .. } => None,
            Message::Image { image, .. } => Some(image),
        }
    }
}

/// One-line summary for logs; content past 300 chars is cut.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = self.content();
        let content = if content.chars().count() > 300 {
            format!("{}...", content.chars().take(300).collect::<String>())
        } else {
            content.to_owned()
        };
        let image = match self.image() {
            Some(image) => format!(" [image: {} bytes]", image.len()),
            None => String::new(),
        };
        write!(f, "{}{image}: {content:?}", self.role())
    }
}
