//! glm-export: quantize a GLM-4 checkpoint to 4 bits
//! ================================================
//!
//! Reads a full-precision GGUF checkpoint, runs `llama-quantize ... Q4_0` on
//! it and writes the result together with the tokenizer files:
//!
//! ```text
//! <destination>/model/<stem>-q4_0.gguf
//! <destination>/tokenizer/tokenizer.json, tokenizer_config.json, ...
//! ```
//!
//! The checkpoint must already be GGUF (F32, F16 or BF16). A Hugging Face
//! safetensors directory such as `./glm-4-9b-chat` is converted in place
//! first with llama.cpp's converter, which drops the `.gguf` beside the
//! safetensors shards:
//!
//! ```text
//! $ python convert_hf_to_gguf.py ./glm-4-9b-chat --outtype f16
//! ```
//!
//! ## Typical usage
//! ```text
//! # Defaults: ./glm-4-9b-chat (after conversion) -> ./glm-4-9b-chat-int4
//! $ glm-export
//!
//! # Checkpoint from the hub, llama.cpp built in a custom location
//! $ glm-export --checkpoint someone/glm-4-9b-chat-GGUF \
//!       --checkpoint-file glm-4-9b-chat-f16.gguf \
//!       --bin-dir ~/llama.cpp/build/bin
//! ```
//!
//! Any failure aborts with a non-zero exit. Partial output is left in place.

use std::path::PathBuf;

use clap::Parser;
use glm_devices::{LoggingConfig, LoggingConfigTrait};
use glm_llama::*;

#[derive(Debug, Parser)]
#[command(name = "glm-export", version)]
struct Cli {
    /// Full-precision .gguf file, a directory holding one, or a hub repo id.
    /// Safetensors checkpoints must first go through llama.cpp's
    /// `convert_hf_to_gguf.py ./glm-4-9b-chat --outtype f16`
    #[arg(long, default_value = "./glm-4-9b-chat")]
    checkpoint: String,

    /// File to fetch when --checkpoint is a hub repo id
    #[arg(long, value_name = "FILE")]
    checkpoint_file: Option<String>,

    /// Tokenizer directory or hub repo id
    #[arg(long, default_value = "THUDM/glm-4-9b-chat-hf")]
    tokenizer: String,

    /// Output root
    #[arg(long, default_value = "glm-4-9b-chat-int4")]
    destination: PathBuf,

    /// Directory holding llama-quantize (default: PATH lookup)
    #[arg(long, value_name = "PATH")]
    bin_dir: Option<PathBuf>,

    /// Threads for llama-quantize
    #[arg(long)]
    threads: Option<u32>,

    /// Log at DEBUG
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new().logger_name("glm_export");
    if cli.verbose {
        logging = logging.log_level_debug();
    }
    logging.load_logger()?;

    let quantizer = Quantizer::builder()
        .maybe_bin_dir(cli.bin_dir)
        .maybe_threads(cli.threads)
        .build();

    let report = ExportRequest::builder()
        .checkpoint(cli.checkpoint)
        .maybe_checkpoint_file(cli.checkpoint_file)
        .tokenizer_source(cli.tokenizer)
        .destination(cli.destination)
        .quantizer(quantizer)
        .build()
        .run()?;

    println!("{report}");
    Ok(())
}
