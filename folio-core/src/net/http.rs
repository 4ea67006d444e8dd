//! Blocking HTTP transport and the retrying client built on it

use super::retry::{retry_with_backoff, RetryObserver, RetryPolicy, Sleeper, ThreadSleeper};
use crate::error::NetworkError;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Largest body read from any response
const MAX_BODY_BYTES: u64 = 20 * 1024 * 1024;

/// A raw HTTP response. Transports return every status; classification
/// happens in [`HttpClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self {
            status,
            url: url.into(),
            body: Vec::new(),
        }
    }
}

/// One GET request, no retry. Implementations must be usable from several
/// worker threads at once.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, NetworkError>;
}

/// Production transport over a shared `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            agent,
            user_agent: user_agent.into(),
        }
    }

    fn read_body(response: ureq::Response, url: &str) -> Result<Vec<u8>, NetworkError> {
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|error| {
                if is_io_timeout(&error) {
                    NetworkError::Timeout(format!("{url}: {error}"))
                } else {
                    NetworkError::Transport(format!("{url}: failed to read response: {error}"))
                }
            })?;
        Ok(body)
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, NetworkError> {
        let mut request = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .set("Accept", "application/json, image/*;q=0.9, */*;q=0.8");
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => {
                let status = response.status();
                let final_url = response.get_url().to_string();
                let body = Self::read_body(response, url)?;
                Ok(HttpResponse {
                    status,
                    url: final_url,
                    body,
                })
            }
            Err(ureq::Error::Status(code, response)) => {
                let final_url = response.get_url().to_string();
                Ok(HttpResponse {
                    status: code,
                    url: final_url,
                    body: Self::read_body(response, url).unwrap_or_default(),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                let message = format!("{url}: {transport}");
                let lowered = message.to_ascii_lowercase();
                if lowered.contains("timed out") || lowered.contains("timeout") {
                    Err(NetworkError::Timeout(message))
                } else {
                    Err(NetworkError::Transport(message))
                }
            }
        }
    }
}

fn is_io_timeout(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    ) || error.to_string().to_ascii_lowercase().contains("timed out")
}

/// Map a response status to an error; 2xx and 3xx pass
pub fn classify_status(response: &HttpResponse) -> Result<(), NetworkError> {
    match response.status {
        404 => Err(NetworkError::NotFound(response.url.clone())),
        code if code >= 400 => Err(NetworkError::Status {
            code,
            url: response.url.clone(),
        }),
        _ => Ok(()),
    }
}

/// Resilient request client: transport + retry policy + sleeper
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    observer: Option<Arc<dyn RetryObserver>>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            sleeper: Arc::new(ThreadSleeper),
            observer: None,
        }
    }

    /// Replace the sleeper (tests use one that records instead of sleeping)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET with retry; non-success statuses become errors
    pub fn request(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, NetworkError> {
        retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            self.observer.as_deref(),
            |attempt| {
                debug!(url, attempt, "GET");
                let response = self.transport.get(url, query)?;
                classify_status(&response)?;
                Ok(response)
            },
        )
    }

    /// GET and decode a JSON body
    pub fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, NetworkError> {
        let response = self.request(url, query)?;
        serde_json::from_slice(&response.body)
            .map_err(|e| NetworkError::Malformed(format!("{}: {}", url, e)))
    }

    /// GET raw bytes
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        self.request(url, &[]).map(|r| r.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    /// Replays a fixed sequence of responses
    struct Scripted {
        responses: Mutex<Vec<Result<HttpResponse, NetworkError>>>,
        calls: Mutex<u32>,
    }

    impl HttpTransport for Scripted {
        fn get(&self, _url: &str, _query: &[(&str, &str)]) -> Result<HttpResponse, NetworkError> {
            *self.calls.lock().unwrap() += 1;
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn client(responses: Vec<Result<HttpResponse, NetworkError>>) -> (HttpClient, Arc<Scripted>) {
        let transport = Arc::new(Scripted {
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        });
        let client = HttpClient::new(transport.clone(), RetryPolicy::default())
            .with_sleeper(Arc::new(NoSleep));
        (client, transport)
    }

    #[test]
    fn test_retries_server_errors_then_parses_json() {
        let (client, transport) = client(vec![
            Ok(HttpResponse::status("u", 502)),
            Err(NetworkError::Transport("reset".into())),
            Ok(HttpResponse::ok("u", r#"{"ok": true}"#)),
        ]);
        let value = client.get_json("u", &[]).unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
        assert_eq!(*transport.calls.lock().unwrap(), 3);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let (client, transport) = client(vec![Ok(HttpResponse::status("u", 404))]);
        let error = client.get_json("u", &[]).unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(*transport.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_malformed_json_is_not_retried() {
        let (client, transport) = client(vec![Ok(HttpResponse::ok("u", "<html>"))]);
        let error = client.get_json("u", &[]).unwrap_err();
        assert!(matches!(error, NetworkError::Malformed(_)));
        assert_eq!(*transport.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(&HttpResponse::status("u", 200)).is_ok());
        assert_eq!(
            classify_status(&HttpResponse::status("u", 400)),
            Err(NetworkError::Status {
                code: 400,
                url: "u".into()
            })
        );
    }
}
