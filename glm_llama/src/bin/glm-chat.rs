//! glm-chat: terminal chat over a local 4-bit GLM-4
//! ===============================================
//!
//! Loads a `SessionConfig` TOML file (written with defaults when missing),
//! starts `llama-server` on the exported model and reads queries from stdin.
//!
//! ## Input lines
//! | Line                          | Effect                                         |
//! |-------------------------------|------------------------------------------------|
//! | `query`                       | Ask in single-user mode                        |
//! | `user_id<TAB>query`           | Ask as `user_id` in multi-user mode            |
//! | `[user_id<TAB>]/image P query`| Same, with the image at path `P` attached      |
//! | `/release user_id`            | Forget everything `user_id` said               |
//! | `/quit`                       | Exit                                           |
//!
//! A failed call prints the error and leaves that user's history unchanged.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use glm_devices::{LoggingConfig, LoggingConfigTrait};
use glm_llama::*;
use glm_session::{ConversationManager, ImageAttachment, SessionConfig};

#[derive(Debug, Parser)]
#[command(name = "glm-chat", version)]
struct Cli {
    /// SessionConfig TOML file
    #[arg(long, short = 'c', default_value = "glm-chat.toml")]
    config: PathBuf,

    /// Directory holding llama-server (default: PATH lookup)
    #[arg(long, value_name = "PATH")]
    bin_dir: Option<PathBuf>,

    #[arg(long)]
    ctx_size: Option<u32>,

    #[arg(long)]
    threads: Option<u32>,

    #[arg(long, default_value_t = 120)]
    load_budget_secs: u64,

    /// Pass llama-server's own output through
    #[arg(long)]
    server_output: bool,

    /// Log at DEBUG
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Empty,
    Quit,
    Release(String),
    Ask {
        user_id: Option<String>,
        query: String,
        image: Option<PathBuf>,
    },
}

fn parse_line(line: &str, multi_user: bool) -> Result<Line, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Line::Empty);
    }
    let trimmed = line.trim();
    if trimmed == "/quit" || trimmed == "/exit" {
        return Ok(Line::Quit);
    }
    if let Some(rest) = trimmed.strip_prefix("/release") {
        let user_id = rest.trim();
        if user_id.is_empty() {
            return Err("usage: /release <user_id>".to_string());
        }
        return Ok(Line::Release(user_id.to_string()));
    }

    let (user_id, body) = if multi_user {
        match line.split_once('\t') {
            Some((user_id, body)) if !user_id.trim().is_empty() => {
                (Some(user_id.trim().to_string()), body.trim())
            }
            _ => return Err("expected user_id<TAB>query".to_string()),
        }
    } else {
        (None, trimmed)
    };

    let (image, query) = match body.strip_prefix("/image") {
        Some(rest) => {
            let rest = rest.trim_start();
            let (path, query) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if path.is_empty() {
                return Err("usage: /image <path> <query>".to_string());
            }
            (Some(PathBuf::from(path)), query.trim())
        }
        None => (None, body),
    };
    if query.is_empty() {
        return Err("empty query".to_string());
    }

    Ok(Line::Ask {
        user_id,
        query: query.to_string(),
        image,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new().logger_name("glm_chat");
    if cli.verbose {
        logging = logging.log_level_debug();
    }
    logging.load_logger()?;

    let config = SessionConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let runtime = RuntimeOptions::builder()
        .maybe_bin_dir(cli.bin_dir)
        .maybe_ctx_size(cli.ctx_size)
        .maybe_threads(cli.threads)
        .load_budget(Duration::from_secs(cli.load_budget_secs))
        .inherit_output(cli.server_output)
        .build();

    let backend = load_backend(&config, &runtime)?;
    let mut manager = ConversationManager::new(config, backend)?;
    let multi_user = manager.is_multi_user();
    if multi_user {
        eprintln!("users: {}", manager.users().join(", "));
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_line(&line, multi_user) {
            Ok(Line::Empty) => continue,
            Ok(Line::Quit) => break,
            Ok(Line::Release(user_id)) => match manager.release_chat_memory(&user_id) {
                Ok(()) => eprintln!("released {user_id}"),
                Err(e) => eprintln!("error: {e}"),
            },
            Ok(Line::Ask {
                user_id,
                query,
                image,
            }) => {
                let image = match image.map(ImageAttachment::from_path).transpose() {
                    Ok(image) => image,
                    Err(e) => {
                        eprintln!("error: {e}");
                        continue;
                    }
                };
                match manager.get_response(&query, user_id.as_deref(), image) {
                    Ok(reply) => {
                        writeln!(stdout, "{reply}")?;
                        stdout.flush()?;
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(usage) => eprintln!("{usage}"),
        }
    }
    Ok(())
}
