//! ACM Digital Library lookup: search page scrape for the DOI, then the
//! CSL-JSON export endpoint for the record.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{CitationLookup, CitationRecord, LookupResult};
use crate::CoreError;

pub const DEFAULT_SEARCH_URL: &str = "https://dl.acm.org/action/doSearch";
pub const DEFAULT_EXPORT_URL: &str = "https://dl.acm.org/action/exportCiteProcCitation";
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static DOI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"org/(\S+)").unwrap());

pub struct AcmDigitalLibrary {
    pub search_url: String,
    pub export_url: String,
    /// Pause before every search, to stay polite to the service.
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for AcmDigitalLibrary {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            export_url: DEFAULT_EXPORT_URL.to_string(),
            delay: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// DOI of the first search hit: the text after `org/` in the first
/// `div.issue-item__content`.
pub fn extract_doi(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.issue-item__content").unwrap();
    let text: String = document.select(&selector).next()?.text().collect();
    DOI_LINK
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// The single record inside `items[0]` of an export response.
pub fn parse_export(data: &serde_json::Value) -> Option<CitationRecord> {
    let item = data["items"].as_array()?.first()?.as_object()?;
    let record = item.values().next()?;
    CitationRecord::from_csl(record)
}

fn check_status(status: reqwest::StatusCode) -> Result<(), CoreError> {
    if status.as_u16() == 429 {
        return Err(CoreError::Lookup("rate limited (429)".into()));
    }
    if !status.is_success() {
        return Err(CoreError::Lookup(format!("HTTP {}", status)));
    }
    Ok(())
}

impl AcmDigitalLibrary {
    async fn search_and_export(
        &self,
        query: &str,
        client: &reqwest::Client,
    ) -> Result<Option<CitationRecord>, CoreError> {
        let url = format!("{}?AllField={}", self.search_url, urlencoding::encode(query));
        let resp = client.get(&url).timeout(self.timeout).send().await?;
        check_status(resp.status())?;
        let html = resp.text().await?;

        let Some(doi) = extract_doi(&html) else {
            tracing::debug!(query, "no search hit");
            return Ok(None);
        };
        tracing::debug!(query, doi = %doi, "search hit");

        let resp = client
            .post(&self.export_url)
            .timeout(self.timeout)
            .form(&[
                ("dois", doi.as_str()),
                ("targetFile", "custom-bibtex"),
                ("format", "bibTex"),
            ])
            .send()
            .await?;
        check_status(resp.status())?;
        let data: serde_json::Value = resp.json().await?;

        let record = parse_export(&data);
        if record.is_none() {
            tracing::warn!(doi = %doi, "export response without a usable record");
        }
        Ok(record)
    }
}

impl CitationLookup for AcmDigitalLibrary {
    fn name(&self) -> &str {
        "ACM Digital Library"
    }

    fn lookup<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.search_and_export(query, client).await {
                Ok(Some(record)) => LookupResult::Found(record),
                Ok(None) => LookupResult::NotFound,
                Err(e) => {
                    tracing::warn!(service = self.name(), query, error = %e, "lookup failed");
                    LookupResult::TransportError(e.to_string())
                }
            }
        })
    }
}
