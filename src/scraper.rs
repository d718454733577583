use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use once_cell::sync::Lazy;
use futures::{stream, Stream, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::config::ScrapeSettings;
use crate::error::{AppError, Result};
use crate::records::RawItem;

// Create a static client to reuse connections. No request timeout, runs
// can take minutes.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Seconds the platform may hold a status request open.
const WAIT_FOR_FINISH_SECS: u32 = 60;

/// Anything that can produce raw post items for one run.
pub trait PostSource {
    async fn fetch_posts(&self) -> Result<Vec<RawItem>>;
}

#[derive(Serialize)]
struct StartUrl<'a> {
    url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorInput<'a> {
    only_posts_newer_than: &'a str,
    results_limit: u32,
    start_urls: Vec<StartUrl<'a>>,
}

impl<'a> ActorInput<'a> {
    fn from_settings(settings: &'a ScrapeSettings) -> Self {
        ActorInput {
            only_posts_newer_than: &settings.newer_than,
            results_limit: settings.results_limit,
            start_urls: settings.start_urls.iter().map(|url| StartUrl { url }).collect(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRun {
    pub id: String,
    pub status: String,
    pub default_dataset_id: String,
}

impl ActorRun {
    fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "SUCCEEDED" | "FAILED" | "TIMED-OUT" | "ABORTED")
    }
}

/// Client for the hosted actor platform, bound to one API token.
pub struct ApifyClient {
    base_url: String,
    token: String,
    settings: ScrapeSettings,
    page_size: usize,
}

impl ApifyClient {
    pub fn new(base_url: &str, token: &str, settings: ScrapeSettings) -> Self {
        ApifyClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            settings,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Starts the actor and blocks until the run reaches a terminal state.
    #[instrument(skip(self), fields(actor = %self.settings.actor_id))]
    pub async fn call_actor(&self) -> Result<ActorRun> {
        let input = ActorInput::from_settings(&self.settings);
        let url = format!("{}/v2/acts/{}/runs", self.base_url, self.settings.actor_id);

        info!(sources = self.settings.start_urls.len(), limit = self.settings.results_limit, "Starting actor run");
        let response = CLIENT
            .post(&url)
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await?
            .error_for_status()?;
        let mut run = response.json::<Envelope<ActorRun>>().await?.data;

        while !run.is_finished() {
            debug!(run_id = %run.id, status = %run.status, "Waiting for actor run");
            run = self.run_status(&run.id).await?;
        }

        if run.status != "SUCCEEDED" {
            warn!(run_id = %run.id, status = %run.status, "Actor run did not succeed");
            return Err(AppError::ScrapeError(format!("Actor run {} finished with status {}", run.id, run.status)));
        }

        info!(run_id = %run.id, dataset = %run.default_dataset_id, "Actor run finished");
        Ok(run)
    }

    async fn run_status(&self, run_id: &str) -> Result<ActorRun> {
        let url = format!("{}/v2/actor-runs/{}", self.base_url, run_id);
        let response = CLIENT
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Envelope<ActorRun>>().await?.data)
    }

    async fn dataset_page(&self, dataset_id: &str, offset: usize) -> Result<Vec<RawItem>> {
        let url = format!("{}/v2/datasets/{}/items", self.base_url, dataset_id);
        let response = CLIENT
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("offset", offset), ("limit", self.page_size)])
            .send()
            .await?
            .error_for_status()?;
        let page = response.json::<Vec<RawItem>>().await?;
        debug!(dataset = dataset_id, offset, count = page.len(), "Fetched dataset page");
        Ok(page)
    }

    /// Items of a dataset, fetched page by page as the stream is polled.
    pub fn dataset_items<'a>(&'a self, dataset_id: &'a str) -> impl Stream<Item = Result<RawItem>> + 'a {
        stream::try_unfold(Some(0usize), move |offset| async move {
            let Some(offset) = offset else {
                return Ok::<_, AppError>(None);
            };
            let page = self.dataset_page(dataset_id, offset).await?;
            let next = (page.len() >= self.page_size).then_some(offset + page.len());
            Ok(Some((stream::iter(page.into_iter().map(Ok::<RawItem, AppError>)), next)))
        })
        .try_flatten()
    }
}

impl PostSource for ApifyClient {
    async fn fetch_posts(&self) -> Result<Vec<RawItem>> {
        let run = self.call_actor().await?;
        let items: Vec<RawItem> = self.dataset_items(&run.default_dataset_id).try_collect().await?;
        info!(count = items.len(), "Collected dataset items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_input_uses_platform_field_names() {
        let settings = ScrapeSettings::default();
        let input = serde_json::to_value(ActorInput::from_settings(&settings)).unwrap();

        assert_eq!(input["onlyPostsNewerThan"], "1 days");
        assert_eq!(input["resultsLimit"], 100);
        assert_eq!(input["startUrls"].as_array().unwrap().len(), 4);
        assert_eq!(input["startUrls"][0]["url"], "https://www.facebook.com/lingkarsemarangofficial");
    }

    #[test]
    fn terminal_statuses() {
        let run = |status: &str| ActorRun {
            id: "r".into(),
            status: status.into(),
            default_dataset_id: "d".into(),
        };
        assert!(run("SUCCEEDED").is_finished());
        assert!(run("TIMED-OUT").is_finished());
        assert!(!run("RUNNING").is_finished());
        assert!(!run("READY").is_finished());
    }

    #[test]
    fn page_size_is_at_least_one() {
        let client = ApifyClient::new("http://x/", "t", ScrapeSettings::default()).with_page_size(0);
        assert_eq!(client.page_size, 1);
        assert_eq!(client.base_url, "http://x");
    }
}
