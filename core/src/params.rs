//! Parameter encoding: turning a `Params` map into query strings or bodies.
//!
//! # Design
//! `ParameterEncoding` is the seam: descriptors pick an encoder, and the
//! encoder rewrites the concrete request. The two stock encoders cover
//! form/query encoding and JSON bodies. Custom encoders may fail, which
//! surfaces as `NetworkError::Build` before anything is sent.
//!
//! Nested values flatten the conventional way: `key[sub]=v` for objects and
//! `key[]=v` for arrays. Keys are emitted in sorted order so the output is
//! stable regardless of how the map was built.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::BuildError;
use crate::http::{HttpMethod, HttpRequest};

/// Request parameters: string keys, mixed scalar or nested values.
pub type Params = serde_json::Map<String, Value>;

/// Encodes `params` into `request`.
pub trait ParameterEncoding: Send + Sync + fmt::Debug {
    fn encode(&self, request: HttpRequest, params: &Params) -> Result<HttpRequest, BuildError>;
}

/// URL encoding for GET, JSON bodies for everything else.
pub fn default_encoding(method: HttpMethod) -> Arc<dyn ParameterEncoding> {
    match method {
        HttpMethod::Get => Arc::new(UrlEncoding::default()),
        _ => Arc::new(JsonEncoding::default()),
    }
}

/// Where `UrlEncoding` places the encoded string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
    /// Query string for GET, HEAD and DELETE; body otherwise.
    #[default]
    MethodDependent,
    QueryString,
    HttpBody,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayEncoding {
    /// `key[]=a&key[]=b`
    #[default]
    Brackets,
    /// `key=a&key=b`
    NoBrackets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolEncoding {
    /// `1` / `0`
    #[default]
    Numeric,
    /// `true` / `false`
    Literal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlEncoding {
    pub destination: Destination,
    pub array_encoding: ArrayEncoding,
    pub bool_encoding: BoolEncoding,
}

impl UrlEncoding {
    pub fn query_string() -> Self {
        Self {
            destination: Destination::QueryString,
            ..Self::default()
        }
    }

    pub fn http_body() -> Self {
        Self {
            destination: Destination::HttpBody,
            ..Self::default()
        }
    }

    fn encodes_in_url(&self, method: HttpMethod) -> bool {
        match self.destination {
            Destination::QueryString => true,
            Destination::HttpBody => false,
            Destination::MethodDependent => {
                matches!(method, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
            }
        }
    }

    /// Flatten `params` into `key=value` pairs joined by `&`.
    pub fn query(&self, params: &Params) -> String {
        let mut pairs = Vec::new();
        // `preserve_order` may be enabled elsewhere in the dependency graph.
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        for key in keys {
            self.components(key, &params[key.as_str()], &mut pairs);
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    fn components(&self, key: &str, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for nested in keys {
                    self.components(&format!("{key}[{nested}]"), &map[nested.as_str()], out);
                }
            }
            Value::Array(items) => {
                let key = match self.array_encoding {
                    ArrayEncoding::Brackets => format!("{key}[]"),
                    ArrayEncoding::NoBrackets => key.to_string(),
                };
                for item in items {
                    self.components(&key, item, out);
                }
            }
            Value::Bool(flag) => {
                let encoded = match (self.bool_encoding, *flag) {
                    (BoolEncoding::Numeric, true) => "1",
                    (BoolEncoding::Numeric, false) => "0",
                    (BoolEncoding::Literal, true) => "true",
                    (BoolEncoding::Literal, false) => "false",
                };
                out.push((key.to_string(), encoded.to_string()));
            }
            Value::Number(number) => out.push((key.to_string(), number.to_string())),
            Value::String(text) => out.push((key.to_string(), text.clone())),
            Value::Null => out.push((key.to_string(), String::new())),
        }
    }
}

impl ParameterEncoding for UrlEncoding {
    fn encode(&self, mut request: HttpRequest, params: &Params) -> Result<HttpRequest, BuildError> {
        if params.is_empty() {
            return Ok(request);
        }

        let encoded = self.query(params);
        if self.encodes_in_url(request.method) {
            let query = match request.url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            request.url.set_query(Some(&query));
        } else {
            if request.header("content-type").is_none() {
                request.set_header(
                    "Content-Type",
                    "application/x-www-form-urlencoded; charset=utf-8",
                );
            }
            request.body = Some(Bytes::from(encoded));
        }
        Ok(request)
    }
}

/// Serialises params as a JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEncoding {
    pub pretty: bool,
}

impl JsonEncoding {
    pub fn pretty_printed() -> Self {
        Self { pretty: true }
    }
}

impl ParameterEncoding for JsonEncoding {
    fn encode(&self, mut request: HttpRequest, params: &Params) -> Result<HttpRequest, BuildError> {
        let body = if self.pretty {
            serde_json::to_vec_pretty(params)?
        } else {
            serde_json::to_vec(params)?
        };
        if request.header("content-type").is_none() {
            request.set_header("Content-Type", "application/json");
        }
        request.body = Some(Bytes::from(body));
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use url::Url;

    fn request(method: HttpMethod, url: &str) -> HttpRequest {
        HttpRequest::new(method, Url::parse(url).unwrap())
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn get_params_go_to_query_in_key_order() {
        let req = request(HttpMethod::Get, "http://localhost/search");
        let encoded = UrlEncoding::default()
            .encode(req, &params(json!({"q": "rust", "page": 2})))
            .unwrap();
        assert_eq!(encoded.url.as_str(), "http://localhost/search?page=2&q=rust");
        assert!(encoded.body.is_none());
    }

    #[test]
    fn existing_query_is_preserved() {
        let req = request(HttpMethod::Get, "http://localhost/search?lang=en");
        let encoded = UrlEncoding::default().encode(req, &params(json!({"q": "a b"}))).unwrap();
        assert_eq!(encoded.url.query(), Some("lang=en&q=a+b"));
    }

    #[test]
    fn nested_values_flatten_with_brackets() {
        let query = UrlEncoding::default().query(&params(json!({
            "filter": {"tag": "x", "active": true},
            "ids": [1, 2],
            "none": null
        })));
        assert_eq!(
            query,
            "filter%5Bactive%5D=1&filter%5Btag%5D=x&ids%5B%5D=1&ids%5B%5D=2&none="
        );
    }

    #[test]
    fn array_and_bool_options() {
        let encoding = UrlEncoding {
            array_encoding: ArrayEncoding::NoBrackets,
            bool_encoding: BoolEncoding::Literal,
            ..UrlEncoding::default()
        };
        let query = encoding.query(&params(json!({"ids": [1, 2], "on": false})));
        assert_eq!(query, "ids=1&ids=2&on=false");
    }

    #[test]
    fn post_url_encoding_writes_form_body() {
        let req = request(HttpMethod::Post, "http://localhost/form");
        let encoded = UrlEncoding::default().encode(req, &params(json!({"a": "1"}))).unwrap();
        assert_eq!(encoded.url.query(), None);
        assert_eq!(encoded.body.as_deref(), Some(&b"a=1"[..]));
        assert_eq!(
            encoded.header("content-type"),
            Some("application/x-www-form-urlencoded; charset=utf-8")
        );
    }

    #[test]
    fn forced_query_string_on_post() {
        let req = request(HttpMethod::Post, "http://localhost/form");
        let encoded = UrlEncoding::query_string().encode(req, &params(json!({"a": "1"}))).unwrap();
        assert_eq!(encoded.url.query(), Some("a=1"));
        assert!(encoded.body.is_none());
    }

    #[test]
    fn empty_params_leave_request_untouched() {
        let req = request(HttpMethod::Post, "http://localhost/form");
        let encoded = UrlEncoding::http_body().encode(req.clone(), &Params::new()).unwrap();
        assert_eq!(encoded, req);
    }

    #[test]
    fn json_encoding_sets_body_and_content_type() {
        let req = request(HttpMethod::Post, "http://localhost/items");
        let encoded = JsonEncoding::default()
            .encode(req, &params(json!({"title": "Buy milk", "tags": ["a"]})))
            .unwrap();
        assert_eq!(encoded.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_slice(encoded.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Buy milk", "tags": ["a"]}));
    }

    #[test]
    fn json_encoding_keeps_caller_content_type() {
        let mut req = request(HttpMethod::Put, "http://localhost/items/1");
        req.set_header("Content-Type", "application/vnd.api+json");
        let encoded = JsonEncoding::default().encode(req, &Params::new()).unwrap();
        assert_eq!(encoded.header("content-type"), Some("application/vnd.api+json"));
        assert_eq!(encoded.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn default_encoding_depends_on_method() {
        let get = format!("{:?}", default_encoding(HttpMethod::Get));
        let post = format!("{:?}", default_encoding(HttpMethod::Post));
        assert!(get.starts_with("UrlEncoding"));
        assert!(post.starts_with("JsonEncoding"));
    }

    proptest! {
        #[test]
        fn flat_string_params_survive_query_round_trip(
            entries in proptest::collection::btree_map("[a-z]{1,8}", ".{0,12}", 0..6)
        ) {
            let map: Params = entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let query = UrlEncoding::default().query(&map);
            let decoded: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
            let expected: Vec<(String, String)> = entries.into_iter().collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}
