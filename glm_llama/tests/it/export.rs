use super::*;
use glm_llama::*;
use serial_test::serial;

fn request(checkpoint: &Path, tokenizer: &Path, destination: &Path, bin_dir: &Path) -> ExportRequest {
    ExportRequest::builder()
        .checkpoint(checkpoint.to_string_lossy())
        .tokenizer_source(tokenizer.to_string_lossy())
        .destination(destination)
        .quantizer(Quantizer::builder().bin_dir(bin_dir).build())
        .build()
}

#[cfg(unix)]
#[test]
fn exports_model_and_tokenizer() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint_dir = tmp.path().join("glm-4-9b-chat");
    write_gguf(&checkpoint_dir.join("glm-4-9b-chat-f16.gguf"), "chatglm", &[F16, F16, F32])?;
    write_gguf(&checkpoint_dir.join("mmproj-glm-4v-f16.gguf"), "clip", &[F16])?;
    write_gguf(&checkpoint_dir.join("old-q4_0.gguf"), "chatglm", &[Q4_0, Q4_0, F32])?;
    let tokenizer = tmp.path().join("tok");
    write_tokenizer_dir(&tokenizer)?;
    let bin_dir = tmp.path().join("bin");
    fake_quantizer(&bin_dir, r#"cp "$1" "$2""#)?;
    let destination = tmp.path().join("glm-4-9b-chat-int4");

    let report = request(&checkpoint_dir, &tokenizer, &destination, &bin_dir).run()?;

    assert_eq!(report.source, checkpoint_dir.join("glm-4-9b-chat-f16.gguf"));
    assert_eq!(report.model_path, destination.join("model/glm-4-9b-chat-q4_0.gguf"));
    assert!(report.model_path.is_file());
    assert_eq!(report.tensor_count, 3);
    assert_eq!(report.architecture.as_deref(), Some("chatglm"));
    assert_eq!(report.tokenizer_files, vec!["tokenizer.json", "tokenizer_config.json"]);
    assert_eq!(
        std::fs::read_to_string(destination.join("tokenizer/tokenizer_config.json"))?,
        r#"{"eos_token":"<|endoftext|>"}"#
    );
    assert!(!destination.join("tokenizer/special_tokens_map.json").exists());
    assert!(report.to_string().contains("3 tensors"));
    Ok(())
}

#[test]
fn refuses_quantized_checkpoint() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint = tmp.path().join("glm-q4_0.gguf");
    write_gguf(&checkpoint, "chatglm", &[Q4_0, Q4_0, F32])?;
    let destination = tmp.path().join("out");

    let result = request(&checkpoint, tmp.path(), &destination, tmp.path()).run();
    match result {
        Err(LlamaError::Artifact { reason, .. }) => assert!(reason.contains("Q4_0")),
        other => bail!("expected Artifact error, got {other:?}"),
    }
    assert!(!destination.exists());
    Ok(())
}

#[test]
fn directory_needs_exactly_one_checkpoint() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint_dir = tmp.path().join("ckpt");
    write_gguf(&checkpoint_dir.join("a-f16.gguf"), "chatglm", &[F16])?;
    write_gguf(&checkpoint_dir.join("b-f32.gguf"), "chatglm", &[F32])?;
    let destination = tmp.path().join("out");

    let result = request(&checkpoint_dir, tmp.path(), &destination, tmp.path()).run();
    assert!(matches!(result, Err(LlamaError::Artifact { .. })));

    // An unconverted safetensors checkpoint holds no .gguf at all.
    let hf_dir = tmp.path().join("glm-4-9b-chat");
    std::fs::create_dir_all(&hf_dir)?;
    std::fs::write(hf_dir.join("model-00001-of-00010.safetensors"), b"{}")?;
    std::fs::write(hf_dir.join("config.json"), b"{}")?;
    match request(&hf_dir, tmp.path(), &destination, tmp.path()).run() {
        Err(LlamaError::Artifact { path, reason }) => {
            assert_eq!(path, hf_dir);
            assert!(reason.contains("convert_hf_to_gguf.py"), "{reason}");
        }
        other => bail!("expected Artifact error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_quantizer_aborts_before_tokenizer() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint = tmp.path().join("glm-f16.gguf");
    write_gguf(&checkpoint, "chatglm", &[F16])?;
    let tokenizer = tmp.path().join("tok");
    write_tokenizer_dir(&tokenizer)?;
    let destination = tmp.path().join("out");

    let result = request(&checkpoint, &tokenizer, &destination, &tmp.path().join("no-bin")).run();
    assert!(matches!(result, Err(LlamaError::Quantize(_))));
    assert!(!destination.join("tokenizer").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn failing_quantizer_is_fatal() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint = tmp.path().join("glm-f16.gguf");
    write_gguf(&checkpoint, "chatglm", &[F16])?;
    let tokenizer = tmp.path().join("tok");
    write_tokenizer_dir(&tokenizer)?;
    let bin_dir = tmp.path().join("bin");
    fake_quantizer(&bin_dir, "exit 1")?;
    let destination = tmp.path().join("out");

    match request(&checkpoint, &tokenizer, &destination, &bin_dir).run() {
        Err(LlamaError::Quantize(msg)) => assert!(msg.contains("exited")),
        other => bail!("expected Quantize error, got {other:?}"),
    }
    assert!(!destination.join("tokenizer").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn unreadable_output_is_fatal() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint = tmp.path().join("glm-f16.gguf");
    write_gguf(&checkpoint, "chatglm", &[F16])?;
    let bin_dir = tmp.path().join("bin");
    fake_quantizer(&bin_dir, r#"printf GGUF > "$2""#)?;
    let destination = tmp.path().join("out");

    let result = request(&checkpoint, tmp.path(), &destination, &bin_dir).run();
    assert!(matches!(
        result,
        Err(LlamaError::Models(glm_models::ModelsError::Gguf(_)))
    ));
    // Partial artifacts stay.
    assert!(destination.join("model/glm-q4_0.gguf").is_file());
    Ok(())
}

#[cfg(unix)]
#[test]
fn missing_tokenizer_json_is_fatal() -> crate::Result<()> {
    let tmp = tempfile::tempdir()?;
    let checkpoint = tmp.path().join("glm-f16.gguf");
    write_gguf(&checkpoint, "chatglm", &[F16])?;
    let bin_dir = tmp.path().join("bin");
    fake_quantizer(&bin_dir, r#"cp "$1" "$2""#)?;
    let empty = tmp.path().join("no-tokenizer");
    std::fs::create_dir_all(&empty)?;

    let result = request(&checkpoint, &empty, &tmp.path().join("out"), &bin_dir).run();
    assert!(matches!(
        result,
        Err(LlamaError::Models(glm_models::ModelsError::MissingFile { .. }))
    ));
    Ok(())
}

/// Needs `LLAMA_CPP_BIN_DIR` (holding llama-quantize) and `GLM_CHECKPOINT`
/// (an F16 GLM-4 gguf).
#[test]
#[ignore]
#[serial]
fn real_quantize() -> crate::Result<()> {
    let bin_dir = std::env::var("LLAMA_CPP_BIN_DIR")?;
    let checkpoint = std::env::var("GLM_CHECKPOINT")?;
    let tmp = tempfile::tempdir()?;

    let report = ExportRequest::builder()
        .checkpoint(checkpoint)
        .tokenizer_source("THUDM/glm-4-9b-chat-hf")
        .destination(tmp.path())
        .quantizer(Quantizer::builder().bin_dir(bin_dir).build())
        .build()
        .run()?;
    println!("{report}");

    let summary = glm_models::GgufSummary::read_path(&report.model_path)?;
    assert_eq!(summary.dominant_type(), Some(glm_models::GgmlDtype::Q4_0));
    Ok(())
}
