use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    error::{LlamaError, LlamaResult},
    server::{tool_path, LLAMA_QUANTIZE_BIN},
};

/// The only quantization the exporter produces: 4-bit, block size 32.
pub const QUANT_TYPE: &str = "Q4_0";

/// Drives llama.cpp's `llama-quantize`.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct Quantizer {
    /// Directory holding `llama-quantize`. Unset means look it up on `PATH`.
    #[builder(into)]
    pub bin_dir: Option<PathBuf>,
    pub threads: Option<u32>,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Quantizer {
    pub fn bin(&self) -> PathBuf {
        tool_path(self.bin_dir.as_deref(), LLAMA_QUANTIZE_BIN)
    }

    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(self.bin());
        cmd.arg(input).arg(output).arg(QUANT_TYPE);
        if let Some(threads) = self.threads {
            cmd.arg(threads.to_string());
        }
        cmd
    }

    /// Runs `llama-quantize <input> <output> Q4_0 [threads]` to completion.
    pub fn run(&self, input: &Path, output: &Path) -> LlamaResult<()> {
        let mut cmd = self.command(input, output);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        crate::info!("Running {:?}", cmd);
        let status = cmd.status().map_err(|e| {
            LlamaError::Quantize(format!("could not run {}: {e}", self.bin().display()))
        })?;
        if !status.success() {
            return Err(LlamaError::Quantize(format!(
                "{} exited with {status}",
                self.bin().display()
            )));
        }
        Ok(())
    }
}
