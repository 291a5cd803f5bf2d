use super::{full_body, HttpResponse};
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use hyper::{HeaderMap, Response, StatusCode};

/// Assembles synthetic responses. `Content-Length` always reflects the body.
pub struct ResponseBuilder {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        ResponseBuilder {
            status: status_code,
            body: Bytes::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Names present in `headers` replace any earlier values; repeated
    /// values under one name are all kept.
    pub fn merge_headers(mut self, headers: &HeaderMap) -> Self {
        for name in headers.keys() {
            self.headers.remove(name);
        }
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    pub fn build(mut self) -> HttpResponse {
        self.headers.remove(TRANSFER_ENCODING);
        self.headers
            .insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));

        let mut response = Response::new(full_body(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
