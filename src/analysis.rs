//! Editorial analysis of a scraped post table.

use tracing::{info, warn};

use crate::error::Result;
use crate::llm::Completion;
use crate::records::PostTable;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Returned instead of an analysis when no LLM token was uploaded.
pub const NO_TOKEN_MESSAGE: &str = "Token GPT belum diunggah, tidak dapat melakukan analisis.";

const INSTRUCTIONS: [&str; 6] = [
    "Identifikasi topik utama yang sering muncul.",
    "Tentukan kategori berita (serius, hoaks, satire, dll.).",
    "Berikan ide artikel menarik berdasarkan postingan yang relevan.",
    "Jelaskan alasan pemilihan topik serta sumber datanya.",
    "Sertakan contoh judul, ringkasan, dan struktur penulisan artikel.",
    "Tampilkan URL dan waktu kejadian yang mendukung setiap topik tersebut, dan tempelkan di poin ke 4.",
];

pub fn build_prompt(table: &PostTable) -> String {
    let texts = table.joined_text();
    let rendered = table.render();

    let mut prompt = String::with_capacity(texts.len() + rendered.len() + 600);
    prompt.push_str("Analisislah postingan dari berbagai halaman Facebook berikut:\n");
    prompt.push_str(&texts);
    prompt.push_str("\n\nData pendukung:\n");
    prompt.push_str(&rendered);
    prompt.push_str("\n\n");
    for (i, line) in INSTRUCTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, line));
    }
    prompt
}

/// Asks the model for an analysis of `table`, or returns the placeholder
/// when there is no completion backend. The reply is passed through as is.
pub async fn analyze<C: Completion>(table: &PostTable, completer: Option<&C>) -> Result<String> {
    let Some(completer) = completer else {
        warn!("No LLM token uploaded, skipping analysis");
        return Ok(NO_TOKEN_MESSAGE.to_string());
    };

    let prompt = build_prompt(table);
    info!(rows = table.len(), prompt_len = prompt.len(), "Requesting analysis");
    completer.complete(SYSTEM_PROMPT, &prompt).await
}
