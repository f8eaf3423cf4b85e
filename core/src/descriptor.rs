//! Request descriptors: what one logical endpoint call looks like.
//!
//! # Design
//! `Requestable` is the capability set a caller implements (typically on an
//! enum with one variant per endpoint). Only `path`, `base_url` and
//! `configuration` are required; method, params and encoding have defaults.
//! `RequestDescriptor` is a ready-made owned implementation for callers that
//! do not want their own type.
//!
//! `RequestableExt` adds the execution entry points to every `Requestable`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::adapters::{ResponseFuture, ResponseStream};
use crate::config::Configuration;
use crate::error::{BuildError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::params::{default_encoding, ParameterEncoding, Params};
use crate::pipeline::{self, Completion, RequestHandle};

pub trait Requestable {
    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn path(&self) -> String;

    fn base_url(&self) -> &str;

    fn params(&self) -> Params {
        Params::new()
    }

    fn param_encoding(&self) -> Arc<dyn ParameterEncoding> {
        default_encoding(self.method())
    }

    fn configuration(&self) -> Arc<Configuration>;

    /// Build the concrete request: base URL, then `path` appended as path
    /// segments, then parameter encoding.
    fn as_request(&self) -> Result<HttpRequest, BuildError> {
        let base = self.base_url();
        let mut url = Url::parse(base).map_err(|source| BuildError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;

        let path = self.path();
        let path = path.trim_start_matches('/');
        if !path.is_empty() {
            url.path_segments_mut()
                .map_err(|_| BuildError::CannotBeABase(base.to_string()))?
                .pop_if_empty()
                .extend(path.split('/'));
        }

        let request = HttpRequest::new(self.method(), url);
        self.param_encoding().encode(request, &self.params())
    }
}

/// Execution entry points for every `Requestable`.
pub trait RequestableExt: Requestable {
    /// Run the request and hand the result to `complete` on the
    /// configuration's callback queue. Returns a handle only for requests
    /// that reached the real transport.
    fn execute<T, F>(&self, complete: F) -> Option<RequestHandle>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        pipeline::execute(self, Completion::new(complete))
    }

    /// Run the request as a single-resolution future. Dropping the future
    /// cancels the request.
    fn fetch<T>(&self) -> ResponseFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        ResponseFuture::start(self)
    }

    /// Run the request as a stream yielding at most one item. Dropping the
    /// stream cancels the request.
    fn stream<T>(&self) -> ResponseStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        ResponseStream::start(self)
    }
}

impl<R: Requestable + ?Sized> RequestableExt for R {}

/// An owned, immutable descriptor.
#[derive(Clone)]
pub struct RequestDescriptor {
    method: HttpMethod,
    base_url: String,
    path: String,
    params: Params,
    encoding: Option<Arc<dyn ParameterEncoding>>,
    configuration: Arc<Configuration>,
}

impl RequestDescriptor {
    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        configuration: Arc<Configuration>,
    ) -> Self {
        Self {
            method: HttpMethod::Get,
            base_url: base_url.into(),
            path: path.into(),
            params: Params::new(),
            encoding: None,
            configuration,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl ParameterEncoding + 'static) -> Self {
        self.encoding = Some(Arc::new(encoding));
        self
    }
}

impl Requestable for RequestDescriptor {
    fn method(&self) -> HttpMethod {
        self.method
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn params(&self) -> Params {
        self.params.clone()
    }

    fn param_encoding(&self) -> Arc<dyn ParameterEncoding> {
        match &self.encoding {
            Some(encoding) => Arc::clone(encoding),
            None => default_encoding(self.method),
        }
    }

    fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.configuration)
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
