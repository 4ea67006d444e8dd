//! Resilient request client

mod canned;
mod http;
mod retry;

pub use canned::CannedTransport;
pub use http::{classify_status, HttpClient, HttpResponse, HttpTransport, UreqTransport};
pub use retry::{retry_with_backoff, RetryObserver, RetryPolicy, Sleeper, ThreadSleeper};
