//! Response types produced by behaviours.

mod builder;

use crate::error::BoxError;
use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;

pub use builder::ResponseBuilder;

/// Body of every response leaving the engine. Streaming, so behaviours can
/// rewrap the forwarded body frame by frame.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

pub type HttpResponse = hyper::Response<ResponseBody>;

/// Box a complete in-memory payload.
pub fn full_body(payload: impl Into<Bytes>) -> ResponseBody {
    Full::new(payload.into())
        .map_err(|never: Infallible| match never {})
        .boxed_unsync()
}

/// Collect a response body into memory.
pub async fn collect_body(body: ResponseBody) -> Result<Bytes, BoxError> {
    Ok(body.collect().await?.to_bytes())
}
