//! One-shot 4-bit export: full-precision GGUF checkpoint in, Q4_0 GGUF plus
//! tokenizer files out.
//!
//! ```text
//! <destination>/
//!     model/<stem>-q4_0.gguf
//!     tokenizer/tokenizer.json (+ tokenizer_config.json, ... when present)
//! ```
//!
//! Any failure aborts the export. Files already written are left in place.

use std::path::{Path, PathBuf};

use glm_models::{ArtifactSource, GgufSummary, HubClient, TokenizerFiles, TOKENIZER_JSON};

use crate::{
    error::{LlamaError, LlamaResult},
    quantize::Quantizer,
};

pub const MODEL_DIR: &str = "model";
pub const TOKENIZER_DIR: &str = "tokenizer";
pub const OUTPUT_SUFFIX: &str = "-q4_0.gguf";

#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct ExportRequest {
    /// A full-precision `.gguf` file, a directory holding exactly one, or a
    /// Hugging Face repo id.
    pub checkpoint: String,

    /// File to fetch when `checkpoint` is a repo id.
    pub checkpoint_file: Option<String>,

    /// Local tokenizer directory or Hugging Face repo id.
    pub tokenizer_source: String,

    #[builder(into)]
    pub destination: PathBuf,

    #[builder(default)]
    pub quantizer: Quantizer,
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub source: PathBuf,
    pub model_path: PathBuf,
    pub tokenizer_dir: PathBuf,
    pub tokenizer_files: Vec<String>,
    pub architecture: Option<String>,
    pub tensor_count: u64,
}

impl std::fmt::Display for ExportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "source:     {}", self.source.display())?;
        writeln!(f, "model:      {}", self.model_path.display())?;
        writeln!(f, "tokenizer:  {} ({})", self.tokenizer_dir.display(), self.tokenizer_files.join(", "))?;
        write!(
            f,
            "arch:       {} ({} tensors)",
            self.architecture.as_deref().unwrap_or("unknown"),
            self.tensor_count
        )
    }
}

impl ExportRequest {
    pub fn run(&self) -> LlamaResult<ExportReport> {
        let source = self.resolve_checkpoint()?;
        let input = GgufSummary::read_path(&source)?;
        crate::info!("Checkpoint {}: {input}", source.display());
        if !input.is_full_precision() {
            let found = input
                .dominant_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "no tensors".to_string());
            return Err(LlamaError::artifact(
                &source,
                format!("expected an F32/F16/BF16 checkpoint, found {found}"),
            ));
        }

        let model_dir = self.destination.join(MODEL_DIR);
        create_dir(&model_dir)?;
        let model_path = model_dir.join(output_file_name(&source));
        self.quantizer.run(&source, &model_path)?;

        let output = GgufSummary::read_path(&model_path)?;
        if output.tensor_count != input.tensor_count {
            return Err(LlamaError::artifact(
                &model_path,
                format!(
                    "quantized model has {} tensors, checkpoint has {}",
                    output.tensor_count, input.tensor_count
                ),
            ));
        }
        crate::info!("Wrote {}: {output}", model_path.display());

        let tokenizer_dir = self.destination.join(TOKENIZER_DIR);
        let tokenizer_files = materialize_tokenizer(&self.tokenizer_source, &tokenizer_dir)?;

        Ok(ExportReport {
            source,
            model_path,
            tokenizer_dir,
            tokenizer_files,
            architecture: output.architecture.or(input.architecture),
            tensor_count: output.tensor_count,
        })
    }

    fn resolve_checkpoint(&self) -> LlamaResult<PathBuf> {
        match ArtifactSource::parse(&self.checkpoint) {
            ArtifactSource::Local(path) if path.is_file() => Ok(path),
            ArtifactSource::Local(path) if path.is_dir() => checkpoint_in_dir(&path),
            ArtifactSource::Local(path) => Err(LlamaError::artifact(path, "no such file or directory")),
            ArtifactSource::Hub { repo_id } => {
                let Some(file) = &self.checkpoint_file else {
                    return Err(LlamaError::artifact(
                        &repo_id,
                        "a checkpoint file name is required for hub checkpoints",
                    ));
                };
                Ok(HubClient::new()?.fetch(&repo_id, file)?)
            }
        }
    }
}

/// The single full-precision `.gguf` in `dir`. Vision projectors are skipped.
fn checkpoint_in_dir(dir: &Path) -> LlamaResult<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| LlamaError::file_system("read dir", dir, e))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| LlamaError::file_system("read dir entry", dir, e))?
            .path();
        let is_gguf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"));
        let is_projector = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_ascii_lowercase().starts_with("mmproj"));
        if !path.is_file() || !is_gguf || is_projector {
            continue;
        }
        match GgufSummary::read_path(&path) {
            Ok(summary) if summary.is_full_precision() => candidates.push(path),
            Ok(_) => crate::debug!("Skipping quantized {}", path.display()),
            Err(e) => crate::warn!("Skipping unreadable {}: {e}", path.display()),
        }
    }
    candidates.sort();
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(LlamaError::artifact(
            dir,
            "no full-precision .gguf checkpoint found; convert a safetensors \
             checkpoint first with llama.cpp's convert_hf_to_gguf.py --outtype f16",
        )),
        n => Err(LlamaError::artifact(
            dir,
            format!("found {n} full-precision .gguf files; pass one explicitly"),
        )),
    }
}

/// `glm-4-9b-chat-f16.gguf` becomes `glm-4-9b-chat-q4_0.gguf`.
pub fn output_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    let lower = stem.to_ascii_lowercase();
    let stem = ["-f32", "-f16", "-bf16", ".f32", ".f16", ".bf16"]
        .iter()
        .find(|suffix| lower.ends_with(*suffix))
        .map(|suffix| &stem[..stem.len() - suffix.len()])
        .unwrap_or(&stem);
    format!("{stem}{OUTPUT_SUFFIX}")
}

/// Copies the tokenizer files into `dir`, returning the names written.
pub fn materialize_tokenizer(source: &str, dir: &Path) -> LlamaResult<Vec<String>> {
    let files = TokenizerFiles::resolve(&ArtifactSource::parse(source))?;
    create_dir(dir)?;

    let mut written = Vec::with_capacity(files.extras.len() + 1);
    copy_file(&files.tokenizer_json, &dir.join(TOKENIZER_JSON))?;
    written.push(TOKENIZER_JSON.to_string());
    for (name, path) in &files.extras {
        copy_file(path, &dir.join(name))?;
        written.push(name.clone());
    }
    crate::info!("Tokenizer written to {} ({})", dir.display(), written.join(", "));
    Ok(written)
}

fn create_dir(dir: &Path) -> LlamaResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| LlamaError::file_system("create dir", dir, e))
}

fn copy_file(from: &Path, to: &Path) -> LlamaResult<()> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| LlamaError::file_system("copy", from, e))
}
