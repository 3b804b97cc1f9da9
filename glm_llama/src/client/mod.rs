pub mod completion;
pub mod error;
pub mod http;

pub use error::*;

/// Raw request transport to a running `llama-server`.
pub trait ServerClient: std::fmt::Display + std::fmt::Debug + Send + Sync {
    fn get_raw(&self, path: &str) -> Result<Vec<u8>>;
    fn post_raw(&self, path: &str, body: &[u8]) -> Result<Vec<u8>>;
    /// Prefix shared by every request, e.g. `http://127.0.0.1:8080`.
    fn base_url(&self) -> &str;
}

pub trait ServerClientExt: ServerClient {
    fn get<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R> {
        let bytes = self.get_raw(path)?;
        serde_json::from_slice(&bytes).map_err(|e| e.into())
    }

    fn post<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let body_bytes = serde_json::to_vec(body)?;
        let response_bytes = self.post_raw(path, &body_bytes)?;
        serde_json::from_slice(&response_bytes).map_err(|e| e.into())
    }
}

impl<T: ServerClient + ?Sized> ServerClientExt for T {}
