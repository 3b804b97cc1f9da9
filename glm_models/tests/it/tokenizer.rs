use glm_models::{GlmTokenizer, ModelsError, TokenizerFiles, ArtifactSource, IMAGE_PLACEHOLDER};
use glm_session::{ChatTokenizer, ImageAttachment, Message, SessionError};

use super::*;

fn fixture() -> crate::Result<(tempfile::TempDir, GlmTokenizer)> {
    let dir = tempfile::tempdir()?;
    write_fixture_tokenizer(dir.path())?;
    let source = dir.path().to_str().ok_or(anyhow!("non utf-8 temp dir"))?;
    let tokenizer = GlmTokenizer::load(source)?;
    Ok((dir, tokenizer))
}

#[test]
fn test_render_text_prompt() -> crate::Result<()> {
    let (_dir, tokenizer) = fixture()?;
    let prompt = tokenizer.render(&[Message::system("S"), Message::user("hi")], true)?;
    assert_eq!(
        prompt.input_ids,
        vec![
            id("[gMASK]"),
            id("<sop>"),
            id("<|system|>"),
            id("S"),
            id("<|user|>"),
            id("hi"),
            id("<|assistant|>"),
        ]
    );
    assert!(prompt.vision.is_none());
    Ok(())
}

#[test]
fn test_render_image_prompt() -> crate::Result<()> {
    let (_dir, tokenizer) = fixture()?;
    let image = ImageAttachment::from_bytes(vec![0xff, 0xd8], Some("image/jpeg"));
    let messages = [
        Message::system("S"),
        Message::user_with_image("cat?", image.clone()),
    ];
    let prompt = tokenizer.render(&messages, true)?;
    assert_eq!(
        prompt.input_ids,
        vec![
            id("[gMASK]"),
            id("<sop>"),
            id("<|system|>"),
            id("S"),
            id("<|user|>"),
            id("<|begin_of_image|>"),
            id("<|endoftext|>"),
            id("<|end_of_image|>"),
            id("cat"),
            id("?"),
            id("<|assistant|>"),
        ]
    );
    let vision = prompt.vision.ok_or(anyhow!("no vision inputs"))?;
    assert_eq!(vision.images.len(), 1);
    assert_eq!(vision.images[0].token_offset, 5);
    assert_eq!(vision.images[0].image, image);
    assert_eq!(vision.position_ids, (0..11).collect::<Vec<u32>>());
    Ok(())
}

#[test]
fn test_placeholder_typed_by_user_is_rejected() -> crate::Result<()> {
    let (_dir, tokenizer) = fixture()?;
    let image = ImageAttachment::from_bytes(vec![1], None);
    let messages = [
        Message::system("S"),
        Message::user_with_image(format!("{IMAGE_PLACEHOLDER} twice"), image),
    ];
    assert!(matches!(
        tokenizer.render(&messages, true),
        Err(SessionError::Template(_))
    ));
    Ok(())
}

#[test]
fn test_decode_skips_special_tokens() -> crate::Result<()> {
    let (_dir, tokenizer) = fixture()?;
    let tokens = [id("hello"), id("world"), id("<|endoftext|>")];
    assert_eq!(tokenizer.decode(&tokens, true)?, "hello world");
    assert!(tokenizer.decode(&tokens, false)?.contains("<|endoftext|>"));
    Ok(())
}

#[test]
fn test_tokenizer_config_template_is_used() -> crate::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture_tokenizer(dir.path())?;
    std::fs::write(
        dir.path().join("tokenizer_config.json"),
        serde_json::to_string(&serde_json::json!({
            "chat_template": "{% for m in messages %}<|{{ m.role }}|>{{ m.content }}{% endfor %}",
            "eos_token": "<|endoftext|>",
        }))?,
    )?;
    std::fs::write(dir.path().join("generation_config.json"), "{}")?;

    let files = TokenizerFiles::resolve(&ArtifactSource::Local(dir.path().to_path_buf()))?;
    let extras: Vec<&str> = files.extras.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(extras, vec!["tokenizer_config.json", "generation_config.json"]);

    let tokenizer = GlmTokenizer::from_files(&files)?;
    let prompt = tokenizer.render(&[Message::user("hi")], true)?;
    assert_eq!(prompt.input_ids, vec![id("<|user|>"), id("hi")]);
    Ok(())
}

#[test]
fn test_missing_tokenizer_json() -> crate::Result<()> {
    let dir = tempfile::tempdir()?;
    let result = TokenizerFiles::resolve(&ArtifactSource::Local(dir.path().to_path_buf()));
    assert!(matches!(result, Err(ModelsError::MissingFile { .. })));
    Ok(())
}

#[test]
#[ignore]
fn test_hub_tokenizer() -> crate::Result<()> {
    let tokenizer = GlmTokenizer::load("THUDM/glm-4-9b-chat-hf")?;
    let prompt = tokenizer.render(&[Message::system("S"), Message::user("hi")], true)?;
    assert!(!prompt.is_empty());
    let text = tokenizer.decode(&prompt.input_ids, true)?;
    assert!(text.contains("hi"));
    Ok(())
}
