//
mod tokenizer;

#[allow(unused_imports)]
use anyhow::{anyhow, bail, Error, Result};
use std::path::Path;

const SPECIAL_TOKENS: [&str; 9] = [
    "[UNK]",
    "[gMASK]",
    "<sop>",
    "<|system|>",
    "<|user|>",
    "<|assistant|>",
    "<|begin_of_image|>",
    "<|endoftext|>",
    "<|end_of_image|>",
];
const WORDS: [&str; 6] = ["S", "hi", "cat", "?", "hello", "world"];

/// Id of a fixture token: specials first, then words.
pub fn id(token: &str) -> u32 {
    SPECIAL_TOKENS
        .iter()
        .chain(WORDS.iter())
        .position(|t| *t == token)
        .map(|i| i as u32)
        .unwrap_or_else(|| panic!("{token} not in fixture vocab"))
}

/// Writes a word-level `tokenizer.json` with the GLM special tokens into `dir`.
pub fn write_fixture_tokenizer(dir: &Path) -> crate::Result<()> {
    let vocab: serde_json::Map<String, serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .chain(WORDS.iter())
        .enumerate()
        .map(|(i, t)| (t.to_string(), serde_json::Value::from(i)))
        .collect();
    let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(i, t)| {
            serde_json::json!({
                "id": i,
                "content": t,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true,
            })
        })
        .collect();
    let tokenizer = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {"type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]"},
    });
    std::fs::write(dir.join("tokenizer.json"), serde_json::to_string(&tokenizer)?)?;
    Ok(())
}
