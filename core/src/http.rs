//! HTTP request and response values flowing through the pipeline.
//!
//! # Design
//! These types describe requests and responses as plain data. Descriptors
//! build an `HttpRequest`, configuration hooks transform it, and either a
//! `Transport` or the mock simulator turns it into a `NetworkResponse`. None
//! of these types perform I/O themselves.
//!
//! Bodies use `Bytes` so responses can be handed from the transport through
//! the hooks and into the decoder without copying.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

/// Timeout applied to requests unless a `prepare` hook changes it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete HTTP request, ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace every header named `name` (case-insensitive) with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Request timeout truncated to whole seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Protocol-level response metadata (status line and headers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What one execution attempt produced: the request that was sent, the
/// response metadata and the body. Any part may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkResponse {
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
    pub data: Option<Bytes>,
}

impl NetworkResponse {
    /// The response reported when no request could be built.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        request: Option<HttpRequest>,
        response: Option<HttpResponse>,
        data: Option<Bytes>,
    ) -> Self {
        Self {
            request,
            response,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, Url::parse("http://localhost:3000/json").unwrap())
    }

    #[test]
    fn new_request_uses_default_timeout() {
        let req = request();
        assert_eq!(req.timeout, DEFAULT_TIMEOUT);
        assert_eq!(req.timeout_secs(), 60);
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut req = request();
        req.headers.push(("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        };
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn set_header_replaces_existing_values() {
        let mut req = request();
        req.headers.push(("accept".to_string(), "text/plain".to_string()));
        req.headers.push(("Accept".to_string(), "text/html".to_string()));
        req.set_header("ACCEPT", "application/json");
        assert_eq!(req.headers, vec![("ACCEPT".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn timeout_secs_truncates() {
        let mut req = request();
        req.timeout = Duration::from_millis(5_900);
        assert_eq!(req.timeout_secs(), 5);
    }

    #[test]
    fn display_shows_method_and_url() {
        assert_eq!(request().to_string(), "GET http://localhost:3000/json");
    }

    #[test]
    fn empty_network_response_has_no_parts() {
        let resp = NetworkResponse::empty();
        assert!(resp.request.is_none());
        assert!(resp.response.is_none());
        assert!(resp.data.is_none());
    }
}
