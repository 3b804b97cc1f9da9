//! The llama.cpp-backed [`ChatBackend`](glm_session::ChatBackend): a
//! [`GlmTokenizer`] for templating paired with a [`LlamaGenerator`] that
//! continues the prompt on a local `llama-server`.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use glm_models::{GgufSummary, GlmTokenizer, TOKENIZER_JSON};
use glm_session::{
    GenerationParams, ModelBackend, RenderedPrompt, SessionConfig, SessionError, SessionResult,
    TextGenerator,
};

use crate::{
    client::completion::completion_request,
    error::{LlamaError, LlamaResult},
    export::{MODEL_DIR, TOKENIZER_DIR},
    server::launch::{LaunchOptions, LlamaServer, LoadBudget},
};

pub type GlmBackend = ModelBackend<GlmTokenizer, LlamaGenerator>;

/// Process settings for the inference server. Model and device choices live
/// in [`SessionConfig`].
#[derive(Debug, Clone, bon::Builder)]
pub struct RuntimeOptions {
    /// Directory holding `llama-server`. Unset means look it up on `PATH`.
    #[builder(into)]
    pub bin_dir: Option<PathBuf>,
    pub ctx_size: Option<u32>,
    pub threads: Option<u32>,
    #[builder(default, into)]
    pub load_budget: LoadBudget,
    pub request_timeout: Option<Duration>,
    #[builder(default)]
    pub inherit_output: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Files found under a configured `model_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub model: PathBuf,
    /// Vision projector, `mmproj*.gguf` beside the model.
    pub mmproj: Option<PathBuf>,
    /// `tokenizer/` written next to the model by the exporter.
    pub tokenizer_dir: Option<PathBuf>,
}

impl ModelArtifacts {
    /// `model_path` is a `.gguf` file, or a directory holding one directly or
    /// under `model/` (the exporter's layout).
    pub fn locate(model_path: &Path, vision: bool) -> LlamaResult<Self> {
        let (model, root) = if model_path.is_file() {
            (model_path.to_path_buf(), parent_dir(model_path))
        } else if model_path.is_dir() {
            let nested = model_path.join(MODEL_DIR);
            let model = match single_model_in(model_path)? {
                Some(model) => model,
                None if nested.is_dir() => single_model_in(&nested)?.ok_or_else(|| {
                    LlamaError::artifact(model_path, "no .gguf model found")
                })?,
                None => return Err(LlamaError::artifact(model_path, "no .gguf model found")),
            };
            (model, model_path.to_path_buf())
        } else {
            return Err(LlamaError::artifact(model_path, "no such file or directory"));
        };

        let model_dir = parent_dir(&model);
        let mut mmproj = find_projector(&model_dir)?;
        if mmproj.is_none() && model_dir != root {
            mmproj = find_projector(&root)?;
        }
        if vision && mmproj.is_none() {
            return Err(LlamaError::artifact(
                model_dir,
                "vision mode needs an mmproj*.gguf projector next to the model",
            ));
        }

        let tokenizer_dir = [root.join(TOKENIZER_DIR), model_dir.join(TOKENIZER_DIR)]
            .into_iter()
            .find(|dir| dir.join(TOKENIZER_JSON).is_file());

        Ok(Self {
            model,
            mmproj: if vision { mmproj } else { None },
            tokenizer_dir,
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn gguf_files(dir: &Path) -> LlamaResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| LlamaError::file_system("read dir", dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| LlamaError::file_system("read dir entry", dir, e))?
            .path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_projector(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().starts_with("mmproj"))
}

fn single_model_in(dir: &Path) -> LlamaResult<Option<PathBuf>> {
    let mut models: Vec<_> = gguf_files(dir)?
        .into_iter()
        .filter(|p| !is_projector(p))
        .collect();
    match models.len() {
        0 => Ok(None),
        1 => Ok(models.pop()),
        n => Err(LlamaError::artifact(
            dir,
            format!("found {n} .gguf models; set model_path to one of them"),
        )),
    }
}

fn find_projector(dir: &Path) -> LlamaResult<Option<PathBuf>> {
    Ok(gguf_files(dir)?.into_iter().find(|p| is_projector(p)))
}

/// Continues prompts on a running `llama-server`.
#[derive(Debug)]
pub struct LlamaGenerator {
    pub server: LlamaServer,
}

impl LlamaGenerator {
    pub fn new(server: LlamaServer) -> Self {
        Self { server }
    }
}

impl TextGenerator for LlamaGenerator {
    fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> SessionResult<Vec<u32>> {
        let request = completion_request(prompt, params);
        let response = self
            .server
            .completion(&request)
            .map_err(|e| SessionError::Generation(e.to_string()))?;
        if response.tokens.is_empty() && !response.content.is_empty() {
            return Err(SessionError::Generation(
                "server returned text without token ids".to_string(),
            ));
        }
        crate::trace!(
            "Completion stopped on {:?} after {} tokens",
            response.stop_type,
            response.tokens.len()
        );

        let mut sequence = Vec::with_capacity(prompt.len() + response.tokens.len());
        sequence.extend_from_slice(&prompt.input_ids);
        sequence.extend(response.tokens);
        Ok(sequence)
    }
}

/// Loads the tokenizer, validates the quantized model and starts the server.
///
/// The tokenizer comes from `config.tokenizer_source` when set, then from the
/// exporter's `tokenizer/` directory beside the model, then from the default
/// hub repo.
pub fn load_backend(config: &SessionConfig, runtime: &RuntimeOptions) -> LlamaResult<GlmBackend> {
    config.validate()?;
    let artifacts = ModelArtifacts::locate(Path::new(&config.model_path), config.vision)?;

    let summary = GgufSummary::read_path(&artifacts.model)?;
    crate::info!("Model {}: {summary}", artifacts.model.display());
    if summary.is_full_precision() {
        crate::warn!(
            "{} is not quantized; run glm-export first to get the 4-bit model",
            artifacts.model.display()
        );
    }

    let tokenizer_source = match (&config.tokenizer_source, &artifacts.tokenizer_dir) {
        (Some(source), _) => source.clone(),
        (None, Some(dir)) => dir.to_string_lossy().into_owned(),
        (None, None) => config.tokenizer_source().to_string(),
    };
    let tokenizer = GlmTokenizer::load(&tokenizer_source)?;

    let options = LaunchOptions::builder()
        .model(artifacts.model)
        .maybe_mmproj(artifacts.mmproj)
        .maybe_bin_dir(runtime.bin_dir.clone())
        .device(config.device)
        .maybe_ctx_size(runtime.ctx_size)
        .maybe_threads(runtime.threads)
        .load_budget(runtime.load_budget)
        .maybe_request_timeout(runtime.request_timeout)
        .inherit_output(runtime.inherit_output)
        .build();
    let server = LlamaServer::launch(options)?;

    Ok(ModelBackend::new(tokenizer, LlamaGenerator::new(server)))
}
