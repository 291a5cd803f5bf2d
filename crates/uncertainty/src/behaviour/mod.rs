//! Behaviours: the decision units of a rule tree.
//!
//! A behaviour turns a request into a response, either by calling the
//! downstream handler through [`Forward`] or by producing a response itself.
//!
//! # Supported Behaviours
//!
//! - `pass_through` / `default` - Forward the request unchanged
//! - `html`, `ok`, `bad_request`, `forbidden`, `not_allowed`, `not_found`,
//!   `server_error`, `status`, `json` - Synthetic responses
//! - `delay` / `delay_request` - Sleep after or before an inner behaviour
//! - `random_choice` - Weighted random pick among behaviours
//! - `conditional` / `multi_conditional` - Predicate-driven dispatch
//! - `slowdown` / `random_stop` - Alter delivery of the forwarded body

mod choice;
mod conditional;
mod delay;
mod fixed;
mod stream;

use crate::error::{BehaviourError, BoxError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use choice::{random_choice, Choice, WeightedChoice};
pub use conditional::{conditional, multi_conditional, Conditional, MultiConditional};
pub use delay::{delay, delay_request, DelayPhase, Delayed};
pub use fixed::{
    bad_request, forbidden, html, json, not_allowed, not_found, server_error, status,
    FixedResponse,
};
pub use stream::{random_stop, slowdown, RandomStop, Slowdown};

pub use self::conditional as cond;
pub use self::html as ok;
pub use self::multi_conditional as case;
pub use self::multi_conditional as multi_cond;
pub use self::pass_through as default;

/// The downstream handler that produces the normal response for a request.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, request: &RequestContext) -> Result<HttpResponse, BoxError>;
}

/// Produces a response for a request, possibly through `forward`.
#[async_trait]
pub trait Behaviour: fmt::Debug + Send + Sync {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError>;
}

/// Shared handle to a behaviour in a rule tree.
#[derive(Clone)]
pub struct BehaviourRef(Arc<dyn Behaviour>);

impl BehaviourRef {
    pub fn new<B: Behaviour + 'static>(behaviour: B) -> Self {
        BehaviourRef(Arc::new(behaviour))
    }

    pub async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        self.0.invoke(forward, request).await
    }
}

impl<B: Behaviour + 'static> From<B> for BehaviourRef {
    fn from(behaviour: B) -> Self {
        BehaviourRef::new(behaviour)
    }
}

impl fmt::Debug for BehaviourRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns whatever the downstream handler returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl Behaviour for PassThrough {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        forward
            .forward(request)
            .await
            .map_err(BehaviourError::Downstream)
    }
}

pub fn pass_through() -> PassThrough {
    PassThrough
}
