//! The transport contract and the stock `reqwest` implementation.
//!
//! # Design
//! The pipeline never performs socket I/O itself. A `Transport` takes a
//! prepared `HttpRequest` and yields response metadata plus an optional
//! body. Cancellation is not part of the contract: the pipeline cancels by
//! dropping the in-flight `send` future.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// What a transport hands back for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub response: HttpResponse,
    pub data: Option<Bytes>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}

/// Settings for `ReqwestTransport`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportSettings {
    pub user_agent: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub accept_invalid_certs: bool,
}

impl TransportSettings {
    /// Read settings from `NETKIT_*` environment variables. Unset or
    /// unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            user_agent: lookup("NETKIT_USER_AGENT"),
            connect_timeout_secs: lookup("NETKIT_CONNECT_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
            accept_invalid_certs: lookup("NETKIT_ACCEPT_INVALID_CERTS")
                .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes")),
        }
    }
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let mut builder = Client::builder().danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(secs) = settings.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::from_client(Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let mut builder = self
            .client
            .request(method.into(), url)
            .headers(header_map(&headers)?)
            .timeout(timeout);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let data = response.bytes().await?;

        Ok(TransportResponse {
            response: HttpResponse { status, headers },
            data: if data.is_empty() { None } else { Some(data) },
        })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(TransportError::other)?;
        let value = HeaderValue::from_str(value).map_err(TransportError::other)?;
        map.append(name, value);
    }
    Ok(map)
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Connect => reqwest::Method::CONNECT,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}
