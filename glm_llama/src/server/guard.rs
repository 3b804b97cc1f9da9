//! Owns a spawned `llama-server` child and kills it when dropped.

use std::{
    process::{Child, Command},
    sync::Mutex,
    time::Duration,
};

use wait_timeout::ChildExt;

/// How long to wait for the child to be reaped after `kill`.
pub const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// OS rejected a spawn, kill, wait or similar operation.
    #[error("failed to {action} process: {source}")]
    CommandFailed {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} exceeded {elapsed:?}; PID {pid} still running")]
    TerminationTimeout {
        operation: &'static str,
        elapsed: Duration,
        pid: u32,
    },
}

pub type Result<T> = std::result::Result<T, ProcessError>;

#[derive(Debug)]
pub struct ServerProcessGuard {
    /// `None` once reaped.
    child: Mutex<Option<Child>>,
    pid: u32,
}

impl ServerProcessGuard {
    pub fn spawn(mut cmd: Command) -> Result<Self> {
        crate::info!("Starting server process: {:?}", cmd);
        let child = cmd.spawn().map_err(|e| ProcessError::CommandFailed {
            action: "spawn",
            source: e,
        })?;
        let pid = child.id();
        Ok(Self {
            child: Mutex::new(Some(child)),
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the child has already exited on its own.
    pub fn try_exit_status(&self) -> Result<Option<std::process::ExitStatus>> {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        let Some(child) = slot.as_mut() else {
            return Ok(None);
        };
        child.try_wait().map_err(|e| ProcessError::CommandFailed {
            action: "get exit status",
            source: e,
        })
    }

    /// Kills the child and waits for it. Idempotent.
    pub fn stop(&self) -> Result<()> {
        let Some(mut child) = self
            .child
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            return Ok(());
        };

        if child
            .try_wait()
            .map_err(|e| ProcessError::CommandFailed {
                action: "get exit status",
                source: e,
            })?
            .is_some()
        {
            return Ok(());
        }

        if let Err(e) = child.kill() {
            // Already gone between try_wait and kill.
            if e.kind() != std::io::ErrorKind::InvalidInput {
                return Err(ProcessError::CommandFailed {
                    action: "kill",
                    source: e,
                });
            }
        }

        match child
            .wait_timeout(FORCE_KILL_TIMEOUT)
            .map_err(|e| ProcessError::CommandFailed {
                action: "wait after kill",
                source: e,
            })? {
            Some(status) => {
                crate::info!("Server process {} stopped; exit status {status}", self.pid);
                Ok(())
            }
            None => Err(ProcessError::TerminationTimeout {
                operation: "kill",
                elapsed: FORCE_KILL_TIMEOUT,
                pid: self.pid,
            }),
        }
    }
}

impl Drop for ServerProcessGuard {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            crate::error!("Failed to stop server process: {}", e);
        }
    }
}
