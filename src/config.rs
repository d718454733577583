use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use crate::error::{AppError, Result};

const DEFAULT_TOKEN_DIR: &str = "./Token Apify";
const DEFAULT_APIFY_BASE: &str = "https://api.apify.com";
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ACTOR_ID: &str = "KoJrdxJCTtpon81KY";

const DEFAULT_START_URLS: [&str; 4] = [
    "https://www.facebook.com/lingkarsemarangofficial",
    "https://www.facebook.com/semarangsekarang",
    "https://www.facebook.com/mediainfosemarang",
    "https://www.facebook.com/rasika105.6FM",
];

/// What the hosted actor is asked to collect on every run.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeSettings {
    pub actor_id: String,
    pub start_urls: Vec<String>,
    /// Relative window understood by the actor, e.g. `"1 days"`.
    pub newer_than: String,
    pub results_limit: u32,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        ScrapeSettings {
            actor_id: DEFAULT_ACTOR_ID.to_string(),
            start_urls: DEFAULT_START_URLS.iter().map(|u| u.to_string()).collect(),
            newer_than: "1 days".to_string(),
            results_limit: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub token_dir: PathBuf,
    pub apify_base_url: String,
    pub openai_base_url: String,
    pub llm_model: String,
    pub scrape: ScrapeSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        let token_dir = env::var("APIFY_TOKEN_DIR").unwrap_or_else(|_| DEFAULT_TOKEN_DIR.to_string());
        let apify_base_url = env::var("APIFY_API_BASE").unwrap_or_else(|_| DEFAULT_APIFY_BASE.to_string());
        let openai_base_url = env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_OPENAI_BASE.to_string());
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let mut scrape = ScrapeSettings::default();
        if let Ok(actor_id) = env::var("APIFY_ACTOR_ID") {
            scrape.actor_id = actor_id;
        }
        if let Ok(urls) = env::var("SCRAPE_START_URLS") {
            scrape.start_urls = parse_url_list(&urls)?;
        }
        if let Ok(window) = env::var("SCRAPE_NEWER_THAN") {
            scrape.newer_than = window;
        }
        if let Ok(limit) = env::var("SCRAPE_RESULTS_LIMIT") {
            scrape.results_limit = limit
                .parse::<u32>()
                .map_err(|e| AppError::ConfigError(format!("Invalid results limit: {}", e)))?;
        }

        Ok(Config {
            server_addr,
            token_dir: PathBuf::from(token_dir),
            apify_base_url: trim_base(apify_base_url),
            openai_base_url: trim_base(openai_base_url),
            llm_model,
            scrape,
        })
    }
}

/// Splits a comma separated list of source URLs, ignoring blanks.
pub fn parse_url_list(raw: &str) -> Result<Vec<String>> {
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(AppError::ConfigError("SCRAPE_START_URLS contains no URLs".to_string()));
    }
    Ok(urls)
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_target_four_pages() {
        let settings = ScrapeSettings::default();
        assert_eq!(settings.start_urls.len(), 4);
        assert_eq!(settings.newer_than, "1 days");
        assert_eq!(settings.results_limit, 100);
        assert_eq!(settings.actor_id, "KoJrdxJCTtpon81KY");
    }

    #[test]
    fn url_list_skips_blanks() {
        let urls = parse_url_list(" https://a.example , ,https://b.example,").unwrap();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn empty_url_list_is_rejected() {
        assert!(matches!(parse_url_list(" , "), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn base_urls_lose_trailing_slash() {
        assert_eq!(trim_base("http://localhost:9000/".to_string()), "http://localhost:9000");
    }
}
