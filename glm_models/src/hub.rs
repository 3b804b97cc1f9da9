use crate::error::ModelsResult;
use dotenvy::dotenv;
use hf_hub::{
    api::sync::{Api, ApiBuilder, ApiRepo},
    Repo, RepoType,
};
use std::path::PathBuf;

pub const HF_TOKEN_ENV_VAR: &str = "HF_TOKEN";

/// Blocking Hugging Face hub client. Files land in the standard hub cache.
#[derive(Debug)]
pub struct HubClient {
    api: Api,
}

impl HubClient {
    pub fn new() -> ModelsResult<Self> {
        dotenv().ok();
        let token = match dotenvy::var(HF_TOKEN_ENV_VAR) {
            Ok(token) => Some(token),
            Err(_) => {
                crate::trace!("{HF_TOKEN_ENV_VAR} not found in dotenv, nor was it set manually");
                None
            }
        };
        let api = ApiBuilder::new()
            .with_progress(true)
            .with_token(token)
            .build()?;
        Ok(Self { api })
    }

    fn repo(&self, repo_id: &str) -> ApiRepo {
        self.api
            .repo(Repo::new(repo_id.to_owned(), RepoType::Model))
    }

    pub fn fetch(&self, repo_id: &str, file_name: &str) -> ModelsResult<PathBuf> {
        crate::info!("Fetching {file_name} from {repo_id}");
        Ok(self.repo(repo_id).get(file_name)?)
    }

    /// Fetches each listed file that the repo actually has.
    pub fn fetch_optional(
        &self,
        repo_id: &str,
        file_names: &[&str],
    ) -> ModelsResult<Vec<(String, PathBuf)>> {
        let repo = self.repo(repo_id);
        let info = repo.info()?;
        let mut fetched = Vec::new();
        for file_name in file_names {
            if info.siblings.iter().any(|s| s.rfilename == *file_name) {
                fetched.push((file_name.to_string(), repo.get(file_name)?));
            } else {
                crate::debug!("{repo_id} has no {file_name}");
            }
        }
        Ok(fetched)
    }
}
