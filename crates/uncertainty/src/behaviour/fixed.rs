//! Synthetic responses that replace the downstream response.

use super::{Behaviour, Forward};
use crate::error::{BehaviourError, ConfigError};
use crate::request::RequestContext;
use crate::response::{HttpResponse, ResponseBuilder};
use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

type Encoder = Arc<dyn Fn() -> serde_json::Result<Vec<u8>> + Send + Sync>;

#[derive(Clone)]
enum Payload {
    Static(Bytes),
    /// Encoded on every invocation so failures surface per request.
    Json(Encoder),
}

/// A response built from configuration alone. Never calls `forward`.
#[derive(Clone)]
pub struct FixedResponse {
    status: StatusCode,
    payload: Payload,
    content_type: HeaderValue,
    headers: HeaderMap,
}

impl FixedResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        FixedResponse {
            status,
            payload: Payload::Static(body.into()),
            content_type: HeaderValue::from_static(TEXT_HTML),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.payload = Payload::Static(body.into());
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Result<Self, ConfigError> {
        self.content_type = header_value(CONTENT_TYPE.as_str(), content_type)?;
        Ok(self)
    }

    /// Add a header. Headers added here win over the content type.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
        let header_name = HeaderName::from_str(name).map_err(|e| ConfigError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let header_value = header_value(name, value)?;
        self.headers.append(header_name, header_value);
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn render_body(&self) -> Result<Bytes, BehaviourError> {
        match &self.payload {
            Payload::Static(body) => Ok(body.clone()),
            Payload::Json(encode) => Ok(Bytes::from(encode()?)),
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl fmt::Debug for FixedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.payload {
            Payload::Static(body) => format!("{} bytes", body.len()),
            Payload::Json(_) => "json".to_string(),
        };
        f.debug_struct("FixedResponse")
            .field("status", &self.status.as_u16())
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

#[async_trait]
impl Behaviour for FixedResponse {
    async fn invoke(
        &self,
        _forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        let body = self.render_body()?;
        debug!(
            "Serving synthetic {} response for {} {}",
            self.status,
            request.method(),
            request.path()
        );
        Ok(ResponseBuilder::new(self.status)
            .header(CONTENT_TYPE, self.content_type.clone())
            .merge_headers(&self.headers)
            .body(body)
            .build())
    }
}

/// 200 OK with an HTML body.
pub fn html(body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(StatusCode::OK, body)
}

pub fn bad_request(body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(StatusCode::BAD_REQUEST, body)
}

pub fn forbidden(body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(StatusCode::FORBIDDEN, body)
}

/// 405 advertising the permitted methods in the `Allow` header.
pub fn not_allowed<I, M>(permitted: I) -> Result<FixedResponse, ConfigError>
where
    I: IntoIterator<Item = M>,
    M: AsRef<str>,
{
    let allow = permitted
        .into_iter()
        .map(|m| m.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    FixedResponse::new(StatusCode::METHOD_NOT_ALLOWED, Bytes::new())
        .with_header(ALLOW.as_str(), &allow)
}

pub fn not_found(body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(StatusCode::NOT_FOUND, body)
}

pub fn server_error(body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(StatusCode::INTERNAL_SERVER_ERROR, body)
}

pub fn status(code: StatusCode, body: impl Into<Bytes>) -> FixedResponse {
    FixedResponse::new(code, body)
}

/// 200 OK with `value` encoded as JSON.
pub fn json<T>(value: T) -> FixedResponse
where
    T: Serialize + Send + Sync + 'static,
{
    let encoder: Encoder = Arc::new(move || serde_json::to_vec(&value));
    FixedResponse {
        status: StatusCode::OK,
        payload: Payload::Json(encoder),
        content_type: HeaderValue::from_static(APPLICATION_JSON),
        headers: HeaderMap::new(),
    }
}
