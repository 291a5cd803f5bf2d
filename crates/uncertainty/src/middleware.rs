//! Tower middleware that runs the configured rule tree for every request.
//!
//! ```no_run
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::{Request, Response};
//! use std::convert::Infallible;
//! use tower::ServiceBuilder;
//! use uncertainty::behaviour::server_error;
//! use uncertainty::{Settings, UncertaintyLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(UncertaintyLayer::new(Settings::new(server_error("down"))))
//!     .service_fn(|_req: Request<Full<Bytes>>| async {
//!         Ok::<_, Infallible>(Response::new(Full::new(Bytes::from("up"))))
//!     });
//! # let _ = service;
//! ```

use crate::behaviour::Forward;
use crate::config::Settings;
use crate::error::{BehaviourError, BoxError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response};
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use tracing::trace;

/// Wraps a service in an [`UncertaintyService`].
#[derive(Debug, Clone)]
pub struct UncertaintyLayer {
    settings: Settings,
}

impl UncertaintyLayer {
    pub fn new(settings: Settings) -> Self {
        UncertaintyLayer { settings }
    }
}

impl<S> Layer<S> for UncertaintyLayer {
    type Service = UncertaintyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UncertaintyService::new(inner, self.settings.clone())
    }
}

/// Invokes the root behaviour once per request, forwarding to `inner` when
/// the tree passes the request through. Without a root behaviour every
/// request goes straight to `inner`.
///
/// The inbound body is collected before the tree runs so that form
/// parameters are visible to predicates. Request extensions are handed on to
/// `inner` untouched. `inner` must be `Clone + Send`; it need not be `Sync`.
#[derive(Debug, Clone)]
pub struct UncertaintyService<S> {
    inner: S,
    settings: Settings,
}

impl<S> UncertaintyService<S> {
    pub fn new(inner: S, settings: Settings) -> Self {
        UncertaintyService { inner, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for UncertaintyService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    ReqBody: Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = HttpResponse;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<HttpResponse, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is driven to readiness by `oneshot` when forwarding
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let forward = ServiceForward {
            inner: Mutex::new(self.inner.clone()),
        };
        let settings = self.settings.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = body
                .collect()
                .await
                .map_err(Into::<BoxError>::into)?
                .to_bytes();
            let context = RequestContext::from_parts(parts, body);

            match settings.root() {
                Some(root) => {
                    trace!("Evaluating rule tree for {} {}", context.method(), context.path());
                    root.invoke(&forward, &context)
                        .await
                        .map_err(BehaviourError::into_boxed)
                }
                None => forward.forward(&context).await,
            }
        })
    }
}

/// Forwards to the wrapped service. Locked so the service only needs to be
/// `Send`, which admits `BoxCloneService`.
struct ServiceForward<S> {
    inner: Mutex<S>,
}

#[async_trait]
impl<S, ResBody> Forward for ServiceForward<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    async fn forward(&self, request: &RequestContext) -> Result<HttpResponse, BoxError> {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let response = service
            .oneshot(request.to_request())
            .await
            .map_err(Into::<BoxError>::into)?;
        Ok(response.map(|body| body.map_err(Into::<BoxError>::into).boxed_unsync()))
    }
}
