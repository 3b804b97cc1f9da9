//! Launching `llama-server` and waiting for its model to load.
//!
//! The server is started on a free local port and polled on `/health`:
//! 503 means the weights are still loading, 200 means ready. A child that
//! exits during start-up, or a load that outlasts its [`LoadBudget`], fails
//! the launch and the process is killed.

use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Command, Stdio},
    thread::sleep,
    time::{Duration, Instant},
};

use glm_devices::DeviceTarget;

use super::{guard::ServerProcessGuard, tool_path, LLAMA_SERVER_BIN};
use crate::{
    client::{
        completion::{complete, CompletionRequest, CompletionResponse},
        http::{HttpClient, HOST},
        ClientError, ServerClient, ServerClientExt,
    },
    error::{LlamaError, LlamaResult},
};

/// Observable state of a llama.cpp server obtained via `/health`.
#[derive(PartialEq, Eq, Debug)]
pub enum ServerStatus {
    Ready,
    /// HTTP 503: the server is still mapping weights into memory.
    Loading,
    /// Unreachable or answering with an unexpected error.
    Offline(String),
}

/// Maximum time to wait for the model to load after the binary has started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct LoadBudget(pub Duration);

impl Default for LoadBudget {
    fn default() -> Self {
        LoadBudget(Duration::from_secs(120))
    }
}

impl From<Duration> for LoadBudget {
    fn from(value: Duration) -> Self {
        LoadBudget(value)
    }
}

/// Pause between `/health` probes during start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RetryDelay(pub Duration);

impl Default for RetryDelay {
    fn default() -> Self {
        RetryDelay(Duration::from_millis(250))
    }
}

impl From<Duration> for RetryDelay {
    fn from(value: Duration) -> Self {
        RetryDelay(value)
    }
}

#[derive(Debug, Clone, bon::Builder)]
pub struct LaunchOptions {
    #[builder(into)]
    pub model: PathBuf,

    /// Vision projector (`mmproj-*.gguf`) for GLM-4V.
    #[builder(into)]
    pub mmproj: Option<PathBuf>,

    /// Directory holding `llama-server`. Unset means look it up on `PATH`.
    #[builder(into)]
    pub bin_dir: Option<PathBuf>,

    #[builder(default)]
    pub device: DeviceTarget,

    pub ctx_size: Option<u32>,

    pub threads: Option<u32>,

    /// Fixed port. Unset picks a free one.
    pub port: Option<u16>,

    #[builder(default, into)]
    pub load_budget: LoadBudget,

    #[builder(default, into)]
    pub retry_delay: RetryDelay,

    /// Per-request HTTP timeout.
    pub request_timeout: Option<Duration>,

    /// Pass the server's stdout and stderr through instead of discarding them.
    #[builder(default)]
    pub inherit_output: bool,
}

impl LaunchOptions {
    pub fn server_bin(&self) -> PathBuf {
        tool_path(self.bin_dir.as_deref(), LLAMA_SERVER_BIN)
    }

    pub fn args(&self, port: u16) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            self.model.clone().into(),
            "--host".into(),
            HOST.into(),
            "--port".into(),
            port.to_string().into(),
            "--n-gpu-layers".into(),
            self.device.gpu_layers().to_string().into(),
        ];
        if let Some(mmproj) = &self.mmproj {
            args.push("--mmproj".into());
            args.push(mmproj.clone().into());
        }
        if let Some(ctx_size) = self.ctx_size {
            args.push("--ctx-size".into());
            args.push(ctx_size.to_string().into());
        }
        if let Some(threads) = self.threads {
            args.push("--threads".into());
            args.push(threads.to_string().into());
        }
        args
    }
}

/// A running `llama-server`. Dropping it stops the process.
#[derive(Debug)]
pub struct LlamaServer {
    pub client: Box<dyn ServerClient>,
    pub model: PathBuf,
    // Dropped last so in-flight clients are gone before the kill.
    guard: ServerProcessGuard,
}

impl LlamaServer {
    pub fn launch(options: LaunchOptions) -> LlamaResult<Self> {
        let client = HttpClient::new(None, options.port, options.request_timeout)?;
        let port = client.port;

        let mut cmd = Command::new(options.server_bin());
        cmd.args(options.args(port));
        if let Some(visible) = options.device.cuda_visible_devices() {
            cmd.env("CUDA_VISIBLE_DEVICES", visible);
        }
        if options.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd.stdin(Stdio::null());

        let guard = ServerProcessGuard::spawn(cmd)?;
        let client: Box<dyn ServerClient> = Box::new(client);
        Self::start_up_loop(&*client, &guard, options.load_budget, options.retry_delay)?;

        let server = Self {
            client,
            model: options.model,
            guard,
        };
        crate::info!(
            "llama-server ready at {} (PID {}) with {}",
            server.client.base_url(),
            server.guard.pid(),
            server.model.display()
        );
        Ok(server)
    }

    fn start_up_loop(
        client: &dyn ServerClient,
        guard: &ServerProcessGuard,
        load_budget: LoadBudget,
        retry_delay: RetryDelay,
    ) -> LlamaResult<()> {
        let deadline = Instant::now() + load_budget.0;
        loop {
            if let Some(status) = guard.try_exit_status()? {
                return Err(LlamaError::ServerLaunch(format!(
                    "server exited during start-up with {status}"
                )));
            }
            match Self::server_status(client) {
                ServerStatus::Ready => return Ok(()),
                ServerStatus::Loading => crate::trace!("Model still loading"),
                // The listener may not be bound yet.
                ServerStatus::Offline(msg) => crate::trace!("Server not answering yet: {msg}"),
            }
            if Instant::now() >= deadline {
                guard.stop()?;
                return Err(LlamaError::ServerLaunch(format!(
                    "Timed out after {:?} waiting for model to load",
                    load_budget.0
                )));
            }
            sleep(retry_delay.0);
        }
    }

    /// One `/health` probe.
    pub fn server_status(client: &dyn ServerClient) -> ServerStatus {
        match client.get::<serde_json::Value>("/health") {
            Ok(_) => ServerStatus::Ready,
            Err(ClientError::Remote { code: 503, .. }) => ServerStatus::Loading,
            Err(e) => ServerStatus::Offline(e.to_string()),
        }
    }

    pub fn status(&self) -> ServerStatus {
        Self::server_status(&*self.client)
    }

    pub fn completion(&self, request: &CompletionRequest) -> LlamaResult<CompletionResponse> {
        Ok(complete(&*self.client, request)?)
    }

    pub fn pid(&self) -> u32 {
        self.guard.pid()
    }

    /// Stops the process now rather than on drop. Idempotent.
    pub fn stop(&self) -> LlamaResult<()> {
        self.guard.stop()?;
        Ok(())
    }
}
