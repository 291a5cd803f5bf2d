//! Stream behaviours - alter how the forwarded body is delivered.
//!
//! Both behaviours call `forward` and rewrap the response body frame by
//! frame. Status and headers are kept, except `Content-Length`, which no
//! longer holds once the body may be cut short.

use super::delay::seconds_to_duration;
use super::{Behaviour, Forward};
use crate::error::{BehaviourError, BoxError, ConfigError};
use crate::request::RequestContext;
use crate::response::{HttpResponse, ResponseBody};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, Stream, StreamExt};
use http_body_util::{BodyExt, BodyStream, StreamBody};
use hyper::body::Frame;
use hyper::header::CONTENT_LENGTH;
use hyper::Response;
use std::time::Duration;
use tracing::debug;

fn rewrap_body<S, F>(response: HttpResponse, wrap: F) -> HttpResponse
where
    F: FnOnce(BodyStream<ResponseBody>) -> S,
    S: Stream<Item = Result<Frame<Bytes>, BoxError>> + Send + 'static,
{
    let (mut parts, body) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let stream = wrap(BodyStream::new(body));
    Response::from_parts(parts, StreamBody::new(stream).boxed_unsync())
}

/// Delays every frame of the forwarded body.
#[derive(Debug, Clone)]
pub struct Slowdown {
    delay: Duration,
}

impl Slowdown {
    pub fn new(seconds: f64) -> Result<Self, ConfigError> {
        Ok(Slowdown {
            delay: seconds_to_duration(seconds)?,
        })
    }
}

#[async_trait]
impl Behaviour for Slowdown {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        let response = forward
            .forward(request)
            .await
            .map_err(BehaviourError::Downstream)?;

        debug!("Slowing down response body by {:?} per frame", self.delay);
        let delay = self.delay;
        Ok(rewrap_body(response, move |frames| {
            frames.then(move |frame| async move {
                tokio::time::sleep(delay).await;
                frame
            })
        }))
    }
}

/// Ends the forwarded body early: before each frame, stops with the
/// configured probability.
#[derive(Debug, Clone)]
pub struct RandomStop {
    probability: f64,
}

impl RandomStop {
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability(probability));
        }
        Ok(RandomStop { probability })
    }
}

#[async_trait]
impl Behaviour for RandomStop {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        let response = forward
            .forward(request)
            .await
            .map_err(BehaviourError::Downstream)?;

        let probability = self.probability;
        Ok(rewrap_body(response, move |frames| {
            frames.take_while(move |_| {
                let stop = rand::random::<f64>() < probability;
                if stop {
                    debug!("Stopping response body early");
                }
                future::ready(!stop)
            })
        }))
    }
}

/// Delay each body frame of the forwarded response by `seconds`.
pub fn slowdown(seconds: f64) -> Result<Slowdown, ConfigError> {
    Slowdown::new(seconds)
}

/// Cut the forwarded body short with `probability` per frame.
pub fn random_stop(probability: f64) -> Result<RandomStop, ConfigError> {
    RandomStop::new(probability)
}
