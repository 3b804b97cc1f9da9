//! `/completion` request and response types.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use bon::Builder;
use glm_session::{GenerationParams, RenderedPrompt};
use serde::{Deserialize, Serialize};
use std::ops::Not;

use super::{ServerClient, ServerClientExt};

/// One element of a mixed prompt: a token id or raw text such as `[img-0]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptPiece {
    Token(u32),
    Text(String),
}

/// Base64 image bytes referenced from the prompt as `[img-<id>]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub data: String,
    pub id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
pub struct CompletionRequest {
    /// Token ids, optionally mixed with image references.
    pub prompt: Vec<PromptPiece>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_predict: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Zero makes sampling greedy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Reuse the KV cache for the prefix shared with the previous request.
    /// Each turn resends the whole conversation, so this skips most of the prompt.
    #[serde(default, skip_serializing_if = "<&bool>::not")]
    #[builder(default)]
    pub cache_prompt: bool,

    /// Ask for the generated token ids as well as the text.
    #[serde(default, skip_serializing_if = "<&bool>::not")]
    #[builder(default)]
    pub return_tokens: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<ImageData>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    #[serde(default)]
    pub content: String,

    /// Generated token ids; present when the request set `return_tokens`.
    #[serde(default)]
    pub tokens: Vec<u32>,

    #[serde(default)]
    pub tokens_predicted: Option<u64>,

    #[serde(default)]
    pub tokens_evaluated: Option<u64>,

    #[serde(default)]
    pub stop_type: Option<String>,
}

/// Builds the `/completion` body for a rendered conversation.
///
/// Image slots become `[img-N]` references placed just before the image's
/// placeholder tokens, with the bytes sent base64-encoded in `image_data`.
pub fn completion_request(prompt: &RenderedPrompt, params: &GenerationParams) -> CompletionRequest {
    let mut pieces = Vec::with_capacity(prompt.len() + 1);
    let mut image_data = None;

    match &prompt.vision {
        Some(vision) if !vision.images.is_empty() => {
            let mut images = Vec::with_capacity(vision.images.len());
            let mut cursor = 0;
            for (id, slot) in vision.images.iter().enumerate() {
                let offset = slot.token_offset.clamp(cursor, prompt.len());
                pieces.extend(prompt.input_ids[cursor..offset].iter().copied().map(PromptPiece::Token));
                pieces.push(PromptPiece::Text(format!("[img-{id}]")));
                images.push(ImageData {
                    data: BASE64_STANDARD.encode(slot.image.bytes()),
                    id: id as i64,
                });
                cursor = offset;
            }
            pieces.extend(prompt.input_ids[cursor..].iter().copied().map(PromptPiece::Token));
            image_data = Some(images);
        }
        _ => pieces.extend(prompt.input_ids.iter().copied().map(PromptPiece::Token)),
    }

    let temperature = if params.do_sample { None } else { Some(0.0) };
    CompletionRequest::builder()
        .prompt(pieces)
        .n_predict(params.max_new_tokens)
        .top_k(params.top_k)
        .maybe_temperature(temperature)
        .cache_prompt(true)
        .return_tokens(true)
        .maybe_image_data(image_data)
        .build()
}

/// Posts `request` to `/completion`.
pub fn complete<C: ServerClient + ?Sized>(
    client: &C,
    request: &CompletionRequest,
) -> super::Result<CompletionResponse> {
    client.post("/completion", request)
}
