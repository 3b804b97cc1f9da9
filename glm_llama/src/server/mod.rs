pub mod guard;
pub mod launch;

use std::path::{Path, PathBuf};

pub const LLAMA_SERVER_BIN: &str = "llama-server";
pub const LLAMA_QUANTIZE_BIN: &str = "llama-quantize";

/// Path of a llama.cpp tool: inside `bin_dir` when given, otherwise the bare
/// name so `PATH` lookup applies.
pub fn tool_path(bin_dir: Option<&Path>, name: &str) -> PathBuf {
    let file_name = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    match bin_dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
