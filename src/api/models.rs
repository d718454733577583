use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::records::PostRecord;

#[derive(Deserialize)]
pub struct RunRequest {
    /// Name of a loaded scrape token file.
    pub credential: String,
    /// Raw content of the uploaded LLM token file.
    #[serde(default)]
    pub llm_token: Option<String>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub status: String,
    pub has_data: bool,
    pub row_count: usize,
    pub rows: Vec<PostRecord>,
    pub analysis: String,
    pub finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CredentialList {
    pub names: Vec<String>,
}
