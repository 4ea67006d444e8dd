//! In-memory transport serving canned responses

use super::http::{HttpResponse, HttpTransport};
use crate::error::NetworkError;
use std::sync::Mutex;

struct Route {
    url: String,
    query: Vec<(String, String)>,
    response: Result<HttpResponse, NetworkError>,
}

impl Route {
    fn matches(&self, url: &str, query: &[(&str, &str)]) -> bool {
        self.url == url
            && self
                .query
                .iter()
                .all(|(k, v)| query.iter().any(|(qk, qv)| qk == k && qv == v))
    }
}

/// Answers requests from a route table. Routes are matched in insertion
/// order on the exact URL plus any required query pairs; anything unrouted
/// is a 404. Every request is recorded.
#[derive(Default)]
pub struct CannedTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<String>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`
    pub fn route(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let url = url.into();
        let response = Ok(HttpResponse::ok(url.clone(), body));
        self.push(url, &[], response)
    }

    /// Serve `body` for `url` only when the query carries every given pair
    pub fn route_query(
        self,
        url: impl Into<String>,
        query: &[(&str, &str)],
        body: impl Into<Vec<u8>>,
    ) -> Self {
        let url = url.into();
        let response = Ok(HttpResponse::ok(url.clone(), body));
        self.push(url, query, response)
    }

    /// Answer `url` with a bare status code
    pub fn route_status(self, url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        let response = Ok(HttpResponse::status(url.clone(), status));
        self.push(url, &[], response)
    }

    /// Fail every request to `url` at the transport level
    pub fn route_error(self, url: impl Into<String>, error: NetworkError) -> Self {
        self.push(url.into(), &[], Err(error))
    }

    fn push(
        mut self,
        url: String,
        query: &[(&str, &str)],
        response: Result<HttpResponse, NetworkError>,
    ) -> Self {
        self.routes.push(Route {
            url,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response,
        });
        self
    }

    /// URLs requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl HttpTransport for CannedTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, NetworkError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        self.routes
            .iter()
            .find(|route| route.matches(url, query))
            .map(|route| route.response.clone())
            .unwrap_or_else(|| Ok(HttpResponse::status(url, 404)))
    }
}
