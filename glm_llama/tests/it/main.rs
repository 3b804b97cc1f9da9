//
mod backend;
mod export;

#[allow(unused_imports)]
use anyhow::{anyhow, bail, Error, Result};
use std::path::{Path, PathBuf};

pub const F32: u32 = 0;
pub const F16: u32 = 1;
pub const Q4_0: u32 = 2;

/// Writes a GGUF v3 header with `general.architecture` and one 2-d tensor per
/// entry of `tensor_types`. No tensor data follows.
pub fn write_gguf(path: &Path, architecture: &str, tensor_types: &[u32]) -> crate::Result<()> {
    fn string(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u64).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"GGUF");
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&(tensor_types.len() as u64).to_le_bytes());
    out.extend_from_slice(&1u64.to_le_bytes());
    string(&mut out, "general.architecture");
    out.extend_from_slice(&8u32.to_le_bytes());
    string(&mut out, architecture);
    for (i, dtype) in tensor_types.iter().enumerate() {
        string(&mut out, &format!("blk.{i}.weight"));
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&64u64.to_le_bytes());
        out.extend_from_slice(&64u64.to_le_bytes());
        out.extend_from_slice(&dtype.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// A tokenizer directory with `tokenizer.json` and `tokenizer_config.json`.
pub fn write_tokenizer_dir(dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("tokenizer.json"), r#"{"version":"1.0"}"#)?;
    std::fs::write(dir.join("tokenizer_config.json"), r#"{"eos_token":"<|endoftext|>"}"#)?;
    Ok(())
}

/// Drops an executable `llama-quantize` shell script into `dir`.
#[cfg(unix)]
pub fn fake_quantizer(dir: &Path, body: &str) -> crate::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(glm_llama::LLAMA_QUANTIZE_BIN);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}
