use super::*;
use glm_llama::*;
use glm_session::{ConversationManager, SessionConfig};
use serial_test::serial;

#[test]
fn missing_model_fails_before_launch() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = SessionConfig::builder()
        .model_path(tmp.path().join("nothing-here").to_string_lossy())
        .build();
    let result = load_backend(&config, &RuntimeOptions::default());
    assert!(matches!(result, Err(LlamaError::Artifact { .. })));
    Ok(())
}

#[test]
fn vision_without_projector_fails() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    write_gguf(&tmp.path().join("model/glm-4v-9b-q4_0.gguf"), "chatglm", &[Q4_0])?;
    let config = SessionConfig::builder()
        .model_path(tmp.path().to_string_lossy())
        .vision(true)
        .build();
    let result = load_backend(&config, &RuntimeOptions::default());
    assert!(matches!(result, Err(LlamaError::Artifact { .. })));
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> crate::Result<()> {
    let mut config = SessionConfig::default();
    config.generation.max_new_tokens = 0;
    let result = load_backend(&config, &RuntimeOptions::default());
    assert!(matches!(result, Err(LlamaError::Session(_))));
    Ok(())
}

#[test]
fn exporter_layout_is_found() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    write_gguf(&tmp.path().join("model/glm-4-9b-chat-q4_0.gguf"), "chatglm", &[Q4_0])?;
    write_tokenizer_dir(&tmp.path().join("tokenizer"))?;

    let artifacts = ModelArtifacts::locate(tmp.path(), false)?;
    assert_eq!(artifacts.model, tmp.path().join("model/glm-4-9b-chat-q4_0.gguf"));
    assert_eq!(artifacts.tokenizer_dir, Some(tmp.path().join("tokenizer")));
    Ok(())
}

/// Needs `LLAMA_CPP_BIN_DIR` (holding llama-server) and `GLM_MODEL_PATH`
/// (a glm-export output directory).
#[test]
#[ignore]
#[serial]
fn real_chat() -> crate::Result<()> {
    let bin_dir = std::env::var("LLAMA_CPP_BIN_DIR")?;
    let model_path = std::env::var("GLM_MODEL_PATH")?;
    let config = SessionConfig::builder()
        .model_path(model_path)
        .multi_user_list(vec!["alice".to_string(), "bob".to_string()])
        .build();
    let runtime = RuntimeOptions::builder().bin_dir(bin_dir).build();

    let backend = load_backend(&config, &runtime)?;
    let mut manager = ConversationManager::new(config, backend)?;
    let reply = manager.get_response("你好，我叫小明", Some("alice"), None)?;
    assert!(!reply.is_empty());
    assert_eq!(manager.history(Some("alice"))?.len(), 3);
    assert_eq!(manager.history(Some("bob"))?.len(), 1);

    manager.release_chat_memory("alice")?;
    assert_eq!(manager.history(Some("alice"))?.len(), 1);
    Ok(())
}
