//! Web search for lyrics pages.
//!
//! Uses SerpAPI when a key is available and DuckDuckGo's HTML endpoint otherwise.

use crate::config::{SearchProvider, SearchSettings};
use crate::error::{Result, ShabdaError};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

const SERPAPI_BASE: &str = "https://serpapi.com";
const DUCKDUCKGO_BASE: &str = "https://html.duckduckgo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search client.
pub struct WebSearch {
    client: reqwest::Client,
    provider: SearchProvider,
    api_key: Option<String>,
    base_url: String,
}

impl WebSearch {
    /// Create a search client from settings.
    ///
    /// SerpAPI without a key quietly becomes DuckDuckGo.
    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        let api_key = settings.resolved_api_key();
        let provider = match (settings.provider, &api_key) {
            (SearchProvider::SerpApi, None) => {
                warn!("No SerpAPI key configured, searching DuckDuckGo instead");
                SearchProvider::DuckDuckGo
            }
            (provider, _) => provider,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(USER_AGENT)
            .build()?;

        let base_url = match provider {
            SearchProvider::SerpApi => SERPAPI_BASE,
            SearchProvider::DuckDuckGo => DUCKDUCKGO_BASE,
        };

        Ok(Self {
            client,
            provider,
            api_key,
            base_url: base_url.to_string(),
        })
    }

    /// Point the client at a different host (used against mock servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> SearchProvider {
        self.provider
    }

    /// Search the web and return up to `max_results` hits.
    #[instrument(skip(self), fields(provider = %self.provider))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        info!("Searching for '{}'", query);

        let hits = match self.provider {
            SearchProvider::SerpApi => self.search_serpapi(query, max_results).await?,
            SearchProvider::DuckDuckGo => self.search_duckduckgo(query, max_results).await?,
        };

        info!("Search returned {} results", hits.len());
        Ok(hits)
    }

    async fn search_serpapi(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ShabdaError::Search("SerpAPI key is not set".to_string()))?;

        let num = max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", api_key),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShabdaError::Search(format!(
                "SerpAPI returned HTTP {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        parse_serpapi_results(&body, max_results)
    }

    async fn search_duckduckgo(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShabdaError::Search(format!(
                "DuckDuckGo returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(parse_duckduckgo_results(&html, max_results))
    }
}

/// Parse SerpAPI's `organic_results`.
pub fn parse_serpapi_results(body: &serde_json::Value, max_results: usize) -> Result<Vec<SearchHit>> {
    if let Some(error) = body["error"].as_str() {
        return Err(ShabdaError::Search(error.to_string()));
    }

    let hits = body["organic_results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    let url = r["link"].as_str()?;
                    Some(SearchHit {
                        title: r["title"].as_str().unwrap_or_default().to_string(),
                        url: url.to_string(),
                        snippet: r["snippet"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .take(max_results)
                .collect()
        })
        .unwrap_or_default();

    Ok(hits)
}

/// Parse DuckDuckGo's HTML result page.
pub fn parse_duckduckgo_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let url = link.value().attr("href")?.to_string();
            let title = link.text().collect::<String>().trim().to_string();
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            if title.is_empty() {
                return None;
            }
            Some(SearchHit {
                title,
                url: resolve_duckduckgo_href(&url),
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded url>`.
fn resolve_duckduckgo_href(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    url::Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.to_string())
        })
        .unwrap_or(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_serpapi_results() {
        let body = json!({
            "organic_results": [
                {"title": "Zingaat Lyrics", "link": "https://example.com/zingaat", "snippet": "झिंग झिंग"},
                {"title": "No link"},
                {"title": "Second", "link": "https://example.com/2"}
            ]
        });

        let hits = parse_serpapi_results(&body, 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://example.com/zingaat");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_serpapi_error() {
        let body = json!({"error": "Invalid API key."});
        assert!(matches!(
            parse_serpapi_results(&body, 5),
            Err(ShabdaError::Search(_))
        ));
    }

    #[test]
    fn test_parse_duckduckgo_results() {
        let html = r#"
            <div class="result">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Flyrics.example%2Fzingaat&rut=abc">Zingaat Lyrics</a>
              <a class="result__snippet">Marathi lyrics of Zingaat</a>
            </div>
            <div class="result">
              <a class="result__a" href="https://other.example/page">Other</a>
            </div>
        "#;

        let hits = parse_duckduckgo_results(html, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://lyrics.example/zingaat");
        assert_eq!(hits[0].snippet, "Marathi lyrics of Zingaat");
        assert_eq!(hits[1].url, "https://other.example/page");

        assert_eq!(parse_duckduckgo_results(html, 1).len(), 1);
    }

    #[test]
    fn test_serpapi_without_key_uses_duckduckgo() {
        let settings = SearchSettings {
            api_key: Some(String::new()),
            ..SearchSettings::default()
        };
        // An empty configured key still defers to the environment
        if std::env::var("SERP_API_KEY").is_err() {
            let search = WebSearch::from_settings(&settings).unwrap();
            assert_eq!(search.provider(), SearchProvider::DuckDuckGo);
        }
    }

    #[tokio::test]
    async fn test_serpapi_search_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "zingaat lyrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic_results": [
                    {"title": "Zingaat", "link": "https://example.com/z", "snippet": "lyrics"}
                ]
            })))
            .mount(&server)
            .await;

        let settings = SearchSettings {
            api_key: Some("test-key".to_string()),
            ..SearchSettings::default()
        };
        let search = WebSearch::from_settings(&settings)
            .unwrap()
            .with_base_url(&server.uri());

        let hits = search.search("zingaat lyrics", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Zingaat");
    }
}
