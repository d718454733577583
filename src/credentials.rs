//! Scrape-service tokens stored on disk and the per-session LLM token.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppError, Result};

#[derive(Deserialize)]
struct TokenFile {
    api_key: String,
}

/// Token file name -> API key. Loaded once at startup and never mutated.
#[derive(Clone, Debug, Default)]
pub struct CredentialSet {
    tokens: BTreeMap<String, String>,
}

impl CredentialSet {
    pub fn names(&self) -> Vec<String> {
        self.tokens.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, String)> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        CredentialSet {
            tokens: iter.into_iter().collect(),
        }
    }
}

/// Reads every `*.json` file in `dir` and takes its `api_key` field.
///
/// Any unreadable or malformed file aborts the whole load.
pub fn load_scrape_tokens(dir: &Path) -> Result<CredentialSet> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::CredentialError(format!("Cannot read token directory {}: {}", dir.display(), e))
    })?;

    let mut tokens = BTreeMap::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }

        let raw = fs::read_to_string(&path)
            .map_err(|e| AppError::CredentialError(format!("{}: {}", name, e)))?;
        let file: TokenFile = serde_json::from_str(&raw)
            .map_err(|e| AppError::CredentialError(format!("{}: {}", name, e)))?;

        debug!(file = name, "Loaded scrape token");
        tokens.insert(name.to_string(), file.api_key);
    }

    info!(count = tokens.len(), dir = %dir.display(), "Scrape tokens loaded");
    Ok(CredentialSet { tokens })
}

/// Uploaded LLM token text, trimmed. Blank content counts as no token.
pub fn llm_token_from_upload(content: Option<&str>) -> Option<String> {
    content
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("post-digest-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_json_tokens_keyed_by_filename() {
        let dir = scratch_dir();
        fs::write(dir.join("akun1.json"), r#"{"api_key": "apify_api_one"}"#).unwrap();
        fs::write(dir.join("akun2.json"), r#"{"api_key": "apify_api_two", "note": "x"}"#).unwrap();
        fs::write(dir.join("readme.txt"), "ignored").unwrap();

        let set = load_scrape_tokens(&dir).unwrap();
        assert_eq!(set.names(), vec!["akun1.json", "akun2.json"]);
        assert_eq!(set.get("akun2.json"), Some("apify_api_two"));
        assert_eq!(set.get("readme.txt"), None);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn empty_directory_gives_empty_set() {
        let dir = scratch_dir();
        let set = load_scrape_tokens(&dir).unwrap();
        assert!(set.is_empty());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_directory_fails() {
        let dir = std::env::temp_dir().join("post-digest-does-not-exist-7f3a");
        assert!(matches!(load_scrape_tokens(&dir), Err(AppError::CredentialError(_))));
    }

    #[test]
    fn missing_api_key_aborts_load() {
        let dir = scratch_dir();
        fs::write(dir.join("good.json"), r#"{"api_key": "k"}"#).unwrap();
        fs::write(dir.join("bad.json"), r#"{"token": "k"}"#).unwrap();

        let err = load_scrape_tokens(&dir).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn malformed_json_aborts_load() {
        let dir = scratch_dir();
        fs::write(dir.join("broken.json"), "{not json").unwrap();
        assert!(load_scrape_tokens(&dir).is_err());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn llm_token_is_trimmed() {
        assert_eq!(llm_token_from_upload(Some("  sk-abc\n")), Some("sk-abc".to_string()));
        assert_eq!(llm_token_from_upload(Some(" \n\t")), None);
        assert_eq!(llm_token_from_upload(None), None);
    }
}
