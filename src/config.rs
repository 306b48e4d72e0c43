use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const API_KEY_ENV: &str = "FLICKR_API_KEY";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsFile {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "SECRET", default)]
    pub secret: Option<String>,
}

// The secret is never sent: the endpoints used here only need the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    // FLICKR_API_KEY overrides the key from the file and is enough on its own.
    pub fn resolve(path: Option<&Path>) -> Result<Credentials, ScraperError> {
        let env_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self::resolve_with(path, &Self::candidate_paths(), env_key)
    }

    pub fn resolve_with(
        path: Option<&Path>,
        candidates: &[PathBuf],
        env_key: Option<String>,
    ) -> Result<Credentials, ScraperError> {
        let located = match path {
            Some(path) => Some(path.to_path_buf()),
            None => candidates.iter().find(|candidate| candidate.exists()).cloned(),
        };

        let file = match located {
            Some(path) => Some(Self::read(&path)?),
            None => None,
        };

        match (file, env_key) {
            (Some(file), env_key) => Ok(Credentials {
                api_key: env_key.unwrap_or(file.key),
                api_secret: file.secret,
            }),
            (None, Some(api_key)) => Ok(Credentials {
                api_key,
                api_secret: None,
            }),
            (None, None) => Err(ScraperError::MissingCredentials(
                candidates
                    .iter()
                    .map(|candidate| candidate.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    pub fn read(path: &Path) -> Result<CredentialsFile, ScraperError> {
        let content = fs::read_to_string(path)
            .map_err(|_| ScraperError::CredentialsRead(path.to_path_buf()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<CredentialsFile, ScraperError> {
        serde_json::from_str(content).map_err(|err| ScraperError::CredentialsParse(err.to_string()))
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CREDENTIALS_FILE)];
        if let Some(dirs) = ProjectDirs::from("", "", "flickr-scraper") {
            paths.push(dirs.config_dir().join(CREDENTIALS_FILE));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_credentials_file() {
        let file = ConfigLoader::parse(r#"{"KEY": "abc", "SECRET": "def"}"#).unwrap();
        assert_eq!(file.key, "abc");
        assert_eq!(file.secret.as_deref(), Some("def"));
    }

    #[test]
    fn secret_is_optional() {
        let file = ConfigLoader::parse(r#"{"KEY": "abc"}"#).unwrap();
        assert!(file.secret.is_none());
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let err = ConfigLoader::parse(r#"{"SECRET": "def"}"#).unwrap_err();
        assert_matches!(err, ScraperError::CredentialsParse(_));
    }
}
