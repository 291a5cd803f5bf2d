//! Predicate-driven dispatch.

use super::{Behaviour, BehaviourRef, Forward, PassThrough};
use crate::error::BehaviourError;
use crate::predicate::Condition;
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use tracing::debug;

/// Runs `behaviour` when the predicate holds, `alternative` otherwise.
#[derive(Debug, Clone)]
pub struct Conditional {
    predicate: Condition,
    behaviour: BehaviourRef,
    alternative: BehaviourRef,
}

impl Conditional {
    pub fn new(predicate: impl Into<Condition>, behaviour: impl Into<BehaviourRef>) -> Self {
        Conditional {
            predicate: predicate.into(),
            behaviour: behaviour.into(),
            alternative: BehaviourRef::new(PassThrough),
        }
    }

    /// Replace the default pass-through alternative.
    pub fn otherwise(mut self, alternative: impl Into<BehaviourRef>) -> Self {
        self.alternative = alternative.into();
        self
    }
}

#[async_trait]
impl Behaviour for Conditional {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        if self.predicate.evaluate(request) {
            debug!("Condition {:?} matched", self.predicate);
            self.behaviour.invoke(forward, request).await
        } else {
            self.alternative.invoke(forward, request).await
        }
    }
}

/// Ordered, first-match-wins dispatch with a default.
#[derive(Debug, Clone)]
pub struct MultiConditional {
    cases: Vec<(Condition, BehaviourRef)>,
    default: BehaviourRef,
}

impl MultiConditional {
    pub fn new<I, P, B>(cases: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<Condition>,
        B: Into<BehaviourRef>,
    {
        MultiConditional {
            cases: cases
                .into_iter()
                .map(|(p, b)| (p.into(), b.into()))
                .collect(),
            default: BehaviourRef::new(PassThrough),
        }
    }

    /// Replace the default pass-through used when nothing matches.
    pub fn with_default(mut self, default: impl Into<BehaviourRef>) -> Self {
        self.default = default.into();
        self
    }
}

#[async_trait]
impl Behaviour for MultiConditional {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        let matched = self
            .cases
            .iter()
            .enumerate()
            .find(|(_, (predicate, _))| predicate.evaluate(request));

        match matched {
            Some((index, (predicate, behaviour))) => {
                debug!("Case {} ({:?}) matched", index + 1, predicate);
                behaviour.invoke(forward, request).await
            }
            None => {
                debug!("No case matched, using default");
                self.default.invoke(forward, request).await
            }
        }
    }
}

pub fn conditional(
    predicate: impl Into<Condition>,
    behaviour: impl Into<BehaviourRef>,
) -> Conditional {
    Conditional::new(predicate, behaviour)
}

pub fn multi_conditional<I, P, B>(cases: I) -> MultiConditional
where
    I: IntoIterator<Item = (P, B)>,
    P: Into<Condition>,
    B: Into<BehaviourRef>,
{
    MultiConditional::new(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::testing::*;
    use crate::behaviour::{case, cond, multi_cond};
    use crate::predicate::{always, has_param, is_get, is_post, not_};

    #[tokio::test]
    async fn test_conditional_match_and_fallback() {
        let hit = Probe::new(503);
        let behaviour = conditional(is_post(), hit.clone());
        let forward = RecordingForward::default();

        let response = behaviour.invoke(&forward, &get("/")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(forward.calls(), 1);
        assert_eq!(hit.calls(), 0);

        let post = RequestContext::new(hyper::Method::POST, hyper::Uri::from_static("/"));
        let response = behaviour.invoke(&forward, &post).await.unwrap();
        assert_eq!(response.status().as_u16(), 503);
        assert_eq!(forward.calls(), 1);
        assert_eq!(hit.calls(), 1);
    }

    #[tokio::test]
    async fn test_conditional_otherwise() {
        let hit = Probe::new(201);
        let miss = Probe::new(404);
        let behaviour = cond(has_param("beta"), hit.clone()).otherwise(miss.clone());
        let forward = RecordingForward::default();

        behaviour.invoke(&forward, &get("/?beta")).await.unwrap();
        behaviour.invoke(&forward, &get("/")).await.unwrap();
        assert_eq!(hit.calls(), 1);
        assert_eq!(miss.calls(), 1);
        assert_eq!(forward.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let first = Probe::new(201);
        let second = Probe::new(202);
        let behaviour = multi_conditional([
            (is_get(), BehaviourRef::from(first.clone())),
            (always(), BehaviourRef::from(second.clone())),
        ]);

        for _ in 0..10 {
            let response = behaviour
                .invoke(&RecordingForward::default(), &get("/"))
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 201);
        }
        assert_eq!(first.calls(), 10);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_later_case_when_earlier_fails() {
        let first = Probe::new(201);
        let second = Probe::new(202);
        let behaviour = multi_cond([
            (is_post(), BehaviourRef::from(first.clone())),
            (is_get(), BehaviourRef::from(second.clone())),
        ]);

        let response = behaviour
            .invoke(&RecordingForward::default(), &get("/"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 202);
        assert_eq!(first.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_when_nothing_matches() {
        let never = Probe::new(500);
        let fallback = Probe::new(204);
        let behaviour =
            case([(not_(always()), never.clone())]).with_default(fallback.clone());

        for _ in 0..5 {
            let response = behaviour
                .invoke(&RecordingForward::default(), &get("/"))
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 204);
        }
        assert_eq!(never.calls(), 0);
        assert_eq!(fallback.calls(), 5);
    }

    #[tokio::test]
    async fn test_default_defaults_to_pass_through() {
        let forward = RecordingForward::default();
        let behaviour = multi_conditional(Vec::<(Condition, BehaviourRef)>::new());

        let response = behaviour.invoke(&forward, &get("/")).await.unwrap();
        assert_eq!(response.headers().get(DOWNSTREAM).unwrap(), "true");
        assert_eq!(forward.calls(), 1);
    }
}
