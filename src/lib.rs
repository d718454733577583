pub mod analysis;
pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod records;
pub mod scraper;

use std::sync::{Arc, Mutex, PoisonError};
use config::Config;
use credentials::{llm_token_from_upload, CredentialSet};
use error::{AppError, Result};
use llm::ChatClient;
use records::PostTable;
use scraper::ApifyClient;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialSet>,
    /// Table from the most recent run, kept for export.
    pub latest: Arc<Mutex<Option<PostTable>>>,
    /// Held for the duration of a run.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, credentials: CredentialSet) -> Self {
        AppState {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            latest: Arc::new(Mutex::new(None)),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn latest_table(&self) -> Option<PostTable> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store_latest(&self, table: Option<PostTable>) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = table;
    }

    /// Resolves the selected scrape token and the uploaded LLM token.
    pub fn session(&self, credential: &str, llm_upload: Option<&str>) -> Result<Session> {
        let scrape_token = self
            .credentials
            .get(credential)
            .ok_or_else(|| AppError::NotFound(format!("Unknown credential: {}", credential)))?;

        Ok(Session {
            scrape_token: scrape_token.to_string(),
            llm_token: llm_token_from_upload(llm_upload),
        })
    }
}

/// Credentials for a single run.
#[derive(Clone)]
pub struct Session {
    pub scrape_token: String,
    pub llm_token: Option<String>,
}

impl Session {
    pub fn scrape_client(&self, config: &Config) -> ApifyClient {
        ApifyClient::new(&config.apify_base_url, &self.scrape_token, config.scrape.clone())
    }

    pub fn chat_client(&self, config: &Config) -> Option<ChatClient> {
        self.llm_token
            .as_deref()
            .map(|key| ChatClient::new(&config.openai_base_url, key, &config.llm_model))
    }
}
