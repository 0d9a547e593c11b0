//! Mock lookup service for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CitationLookup, CitationRecord, LookupResult};

/// A configurable mock response for [`MockLookup`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    Found(CitationRecord),
    NotFound,
    TransportError(String),
}

impl From<MockResponse> for LookupResult {
    fn from(response: MockResponse) -> Self {
        match response {
            MockResponse::Found(record) => LookupResult::Found(record),
            MockResponse::NotFound => LookupResult::NotFound,
            MockResponse::TransportError(msg) => LookupResult::TransportError(msg),
        }
    }
}

/// A hand-rolled [`CitationLookup`] for tests.
///
/// Returns either a fixed response, or a sequence of responses (one per call,
/// repeating the last when exhausted). Counts calls and records queries.
pub struct MockLookup {
    name: &'static str,
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    queries: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockLookup {
    /// A mock that always returns `response`.
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            responses: Mutex::new(Vec::new()),
            fallback: response,
            queries: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// A mock that returns `responses` in order, repeating the last one.
    pub fn with_sequence(name: &'static str, mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses[0].clone();
        Self {
            name,
            responses: Mutex::new(responses),
            fallback,
            queries: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `lookup()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl CitationLookup for MockLookup {
    fn name(&self) -> &str {
        self.name
    }

    fn lookup<'a>(
        &'a self,
        query: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        let response = self.next_response();
        Box::pin(async move { response.into() })
    }
}
