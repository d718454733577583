use std::time::Instant;

use tracing::info;

use crate::analysis::analyze;
use crate::error::Result;
use crate::llm::Completion;
use crate::records::{normalize, PostTable};
use crate::scraper::PostSource;

pub const NO_DATA_MESSAGE: &str = "Tidak ada data yang diperoleh dari proses scraping.";

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub table: PostTable,
    pub analysis: String,
}

impl RunOutcome {
    pub fn has_data(&self) -> bool {
        !self.table.is_empty()
    }
}

/// Scrape, normalize, then analyze. An empty scrape stops before the
/// analysis step and reports [`NO_DATA_MESSAGE`].
pub async fn scrape_and_analyze<S, C>(source: &S, completer: Option<&C>) -> Result<RunOutcome>
where
    S: PostSource,
    C: Completion,
{
    let start = Instant::now();
    let items = source.fetch_posts().await?;
    let table = normalize(items);

    if table.is_empty() {
        info!("Scrape returned no items");
        return Ok(RunOutcome {
            table,
            analysis: NO_DATA_MESSAGE.to_string(),
        });
    }

    let analysis = analyze(&table, completer).await?;
    info!(rows = table.len(), elapsed = ?start.elapsed(), "Run complete");
    Ok(RunOutcome { table, analysis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NO_TOKEN_MESSAGE;
    use crate::error::AppError;
    use crate::records::{RawItem, MISSING};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource(&'static str);

    impl PostSource for FixedSource {
        async fn fetch_posts(&self) -> Result<Vec<RawItem>> {
            Ok(serde_json::from_str(self.0)?)
        }
    }

    struct BrokenSource;

    impl PostSource for BrokenSource {
        async fn fetch_posts(&self) -> Result<Vec<RawItem>> {
            Err(AppError::FetchError("401 Unauthorized".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingCompleter {
        calls: AtomicUsize,
    }

    impl Completion for CountingCompleter {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("ringkasan".to_string())
        }
    }

    #[tokio::test]
    async fn empty_scrape_skips_completion() {
        let completer = CountingCompleter::default();
        let outcome = scrape_and_analyze(&FixedSource("[]"), Some(&completer)).await.unwrap();

        assert!(outcome.table.is_empty());
        assert!(!outcome.has_data());
        assert_eq!(outcome.analysis, NO_DATA_MESSAGE);
        assert_eq!(completer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mixed_items_are_defaulted_and_ordered() {
        let source = FixedSource(
            r#"[
                {"pageName": "B", "time": "bad-date", "url": "u2"},
                {"pageName": "A", "text": "hello", "time": "2024-01-02T10:00:00Z", "url": "u1"}
            ]"#,
        );
        let completer = CountingCompleter::default();
        let outcome = scrape_and_analyze(&source, Some(&completer)).await.unwrap();

        let rows = outcome.table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].page_name.as_deref(), Some("A"));
        assert_eq!(rows[1].text.as_deref(), Some(MISSING));
        assert_eq!(rows[1].time, None);
        assert_eq!(outcome.analysis, "ringkasan");
        assert_eq!(completer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_token_still_returns_table() {
        let source = FixedSource(r#"[{"pageName": "A", "text": "x", "time": "2024-01-02", "url": "u"}]"#);
        let outcome = scrape_and_analyze::<_, CountingCompleter>(&source, None).await.unwrap();

        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.analysis, NO_TOKEN_MESSAGE);
    }

    #[tokio::test]
    async fn scrape_failure_aborts_run() {
        let completer = CountingCompleter::default();
        let err = scrape_and_analyze(&BrokenSource, Some(&completer)).await.unwrap_err();

        assert!(matches!(err, AppError::FetchError(_)));
        assert_eq!(completer.calls.load(Ordering::SeqCst), 0);
    }
}
