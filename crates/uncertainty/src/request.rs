//! Read-only request view used by predicates and behaviours.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::http::Extensions;
use hyper::{HeaderMap, Method, Request, Uri, Version};
use std::collections::HashMap;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Identity attached to a request by the host's authentication layer.
///
/// Hosts insert an `Identity` into the request extensions; requests without
/// one are treated as anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    User {
        username: String,
    },
}

impl Identity {
    pub fn user(username: impl Into<String>) -> Self {
        Identity::User {
            username: username.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::User { username } => Some(username),
            Identity::Anonymous => None,
        }
    }
}

/// Request context for rule evaluation
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    identity: Identity,
    extensions: Extensions,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = uri.query().map(parse_urlencoded).unwrap_or_default();
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query,
            form: HashMap::new(),
            identity: Identity::Anonymous,
            extensions: Extensions::new(),
        }
    }

    /// Create from hyper request parts and the collected body
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let identity = parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_default();

        let mut context = Self::new(parts.method, parts.uri);
        context.version = parts.version;
        context.headers = parts.headers;
        context.body = body;
        context.identity = identity;
        context.extensions = parts.extensions;
        context.refresh_form();
        context
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self.refresh_form();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.refresh_form();
        self
    }

    /// Set a url-encoded form body along with its content type.
    pub fn with_form_body(self, body: impl Into<Bytes>) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED))
            .with_body(body)
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Extensions of the inbound request, handed on unchanged downstream.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn form_param(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Query parameters take precedence over form parameters.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query_param(name).or_else(|| self.form_param(name))
    }

    /// Rebuild a request suitable for the downstream service.
    pub fn to_request(&self) -> Request<Full<Bytes>> {
        let mut request = Request::new(Full::new(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        *request.extensions_mut() = self.extensions.clone();
        if self.identity.is_authenticated() || self.extensions.get::<Identity>().is_some() {
            request.extensions_mut().insert(self.identity.clone());
        }
        request
    }

    fn refresh_form(&mut self) {
        let is_form = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with(FORM_URLENCODED))
            .unwrap_or(false);

        self.form = match (is_form, std::str::from_utf8(&self.body)) {
            (true, Ok(body)) => parse_urlencoded(body),
            _ => HashMap::new(),
        };
    }
}

/// Parse `a=1&b=two&flag` into a map. Keys without a value map to an empty
/// string; repeated keys keep the last value.
fn parse_urlencoded(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}
