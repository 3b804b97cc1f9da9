//! Blocking HTTP transport for `llama-server`, backed by a single [`ureq`] agent.
//!
//! When no port is given the client asks the OS for a free one, then releases
//! it so the server about to be launched can bind it.

use std::{
    io,
    io::Read,
    net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener},
    time::Duration,
};

use ureq::Agent;

pub use super::ServerClient;
use super::error::*;

/// Default request timeout (connect + read + write). Generating 512 tokens
/// from a 9B model on CPU can take minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

pub const HOST: &str = "127.0.0.1";

#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    base_url: String,
    timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl HttpClient {
    pub fn new(host: Option<&str>, port: Option<u16>, timeout: Option<Duration>) -> Result<Self> {
        let host = host.unwrap_or(HOST).to_string();
        let port = match port {
            Some(port) => port,
            None => ephemeral_port()?,
        };
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);

        let agent = Agent::new_with_config(
            Agent::config_builder()
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build(),
        );

        let client = Self {
            base_url: format!("http://{host}:{port}"),
            host,
            agent,
            port,
            timeout,
        };
        crate::trace!("Client created: {client}");
        Ok(client)
    }

    /// `path` must start with `/`. A `None` body means GET.
    fn send(&self, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>> {
        debug_assert!(path.starts_with('/'));
        let url = format!("{}{}", self.base_url, path);

        let response = match body {
            None => self.agent.get(&url).call(),
            Some(b) if !b.is_empty() => self
                .agent
                .post(&url)
                .content_type("application/json")
                .send(b),
            Some(_) => self
                .agent
                .post(&url)
                .content_type("application/json")
                .send_empty(),
        };

        match response {
            Ok(resp) if (200..300).contains(&resp.status().as_u16()) => {
                let mut body = Vec::new();
                resp.into_body().into_reader().read_to_end(&mut body)?;
                Ok(body)
            }

            Ok(resp) => {
                let code = resp.status().as_u16();
                let reason = resp
                    .status()
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string();
                let mut body = String::new();
                let _ = resp.into_body().into_reader().read_to_string(&mut body);
                Err(ClientError::Remote {
                    code,
                    message: remote_message(&body).unwrap_or(reason),
                })
            }

            Err(ureq::Error::StatusCode(code)) => Err(ClientError::Remote {
                code,
                message: format!("HTTP {code}"),
            }),

            Err(ureq::Error::Timeout(_)) => Err(ClientError::Timeout(self.timeout)),

            Err(ureq::Error::Io(e)) => Err(ClientError::Io(e)),

            Err(ureq::Error::Protocol(p)) => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("protocol error: {p}"),
            ))),

            Err(ureq::Error::BadUri(u)) => Err(ClientError::Setup {
                reason: format!("bad URI: {u}"),
            }),

            Err(other) => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("ureq error: {other}"),
            ))),
        }
    }
}

fn ephemeral_port() -> Result<u16> {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .map_err(|e| ClientError::Setup {
            reason: format!("failed to obtain an ephemeral port: {e}"),
        })?;
    let port = listener
        .local_addr()
        .map_err(|e| ClientError::Setup {
            reason: format!("could not read local address: {e}"),
        })?
        .port();
    drop(listener);
    Ok(port)
}

/// llama-server reports failures as `{"error": {"code": 400, "message": "..."}}`.
fn remote_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

impl std::fmt::Display for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HttpClient({:#?})", self.base_url)
    }
}

impl ServerClient for HttpClient {
    fn get_raw(&self, path: &str) -> Result<Vec<u8>> {
        self.send(path, None)
    }

    fn post_raw(&self, path: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.send(path, Some(body))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
