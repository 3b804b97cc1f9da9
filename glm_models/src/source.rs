use std::{fmt, path::PathBuf};

/// Where a tokenizer or checkpoint comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    Local(PathBuf),
    /// A Hugging Face model repo, e.g. `THUDM/glm-4-9b-chat-hf`.
    Hub { repo_id: String },
}

impl ArtifactSource {
    /// An existing path is always local. Otherwise `owner/name` (one slash, not
    /// starting with `.` or `/`) is taken as a repo id, anything else as a
    /// local path that does not exist yet.
    pub fn parse(source: &str) -> Self {
        let path = PathBuf::from(source);
        if path.exists() {
            return ArtifactSource::Local(path);
        }
        let looks_like_repo = !source.starts_with('.')
            && !source.starts_with('/')
            && !source.contains('\\')
            && source.split('/').count() == 2
            && source.split('/').all(|part| !part.is_empty());
        if looks_like_repo {
            ArtifactSource::Hub {
                repo_id: source.to_owned(),
            }
        } else {
            ArtifactSource::Local(path)
        }
    }

    pub fn is_hub(&self) -> bool {
        matches!(self, ArtifactSource::Hub { .. })
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Local(path) => write!(f, "{}", path.display()),
            ArtifactSource::Hub { repo_id } => write!(f, "hf://{repo_id}"),
        }
    }
}
