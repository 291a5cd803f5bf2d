//! Delay behaviours - add latency before or after an inner behaviour.

use super::{Behaviour, BehaviourRef, Forward};
use crate::error::{BehaviourError, ConfigError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// When the delay is applied relative to the inner behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPhase {
    /// Sleep, then run the inner behaviour.
    BeforeInner,
    /// Run the inner behaviour, then sleep before returning its response.
    AfterInner,
}

/// Wraps a behaviour with a fixed delay. Only the current task sleeps.
#[derive(Debug, Clone)]
pub struct Delayed {
    inner: BehaviourRef,
    duration: Duration,
    phase: DelayPhase,
}

impl Delayed {
    pub fn new(
        inner: impl Into<BehaviourRef>,
        seconds: f64,
        phase: DelayPhase,
    ) -> Result<Self, ConfigError> {
        Ok(Delayed {
            inner: inner.into(),
            duration: seconds_to_duration(seconds)?,
            phase,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn phase(&self) -> DelayPhase {
        self.phase
    }
}

/// Non-negative seconds that fit in a `Duration`.
pub(super) fn seconds_to_duration(seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidDelay(seconds))
}

#[async_trait]
impl Behaviour for Delayed {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        match self.phase {
            DelayPhase::BeforeInner => {
                debug!("Delaying request by {:?} before handling", self.duration);
                tokio::time::sleep(self.duration).await;
                self.inner.invoke(forward, request).await
            }
            DelayPhase::AfterInner => {
                let response = self.inner.invoke(forward, request).await?;
                debug!("Delaying response by {:?}", self.duration);
                tokio::time::sleep(self.duration).await;
                Ok(response)
            }
        }
    }
}

/// Run `inner`, then wait `seconds` before returning its response.
pub fn delay(inner: impl Into<BehaviourRef>, seconds: f64) -> Result<Delayed, ConfigError> {
    Delayed::new(inner, seconds, DelayPhase::AfterInner)
}

/// Wait `seconds`, then run `inner`.
pub fn delay_request(inner: impl Into<BehaviourRef>, seconds: f64) -> Result<Delayed, ConfigError> {
    Delayed::new(inner, seconds, DelayPhase::BeforeInner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::testing::*;
    use crate::behaviour::{not_found, pass_through};
    use tokio::time::Instant;

    const SLACK: Duration = Duration::from_millis(10);

    #[tokio::test(start_paused = true)]
    async fn test_delay_runs_inner_first() {
        let forward = RecordingForward::default();
        let behaviour = delay(pass_through(), 1.0).unwrap();

        let start = Instant::now();
        behaviour.invoke(&forward, &get("/")).await.unwrap();
        let finished = Instant::now();

        let called = forward.timestamps()[0];
        assert!(called.duration_since(start) < SLACK);
        assert!(finished.duration_since(called) >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_request_sleeps_first() {
        let forward = RecordingForward::default();
        let behaviour = delay_request(pass_through(), 1.0).unwrap();

        let start = Instant::now();
        behaviour.invoke(&forward, &get("/")).await.unwrap();
        let finished = Instant::now();

        let called = forward.timestamps()[0];
        assert!(called.duration_since(start) >= Duration::from_secs(1));
        assert!(finished.duration_since(called) < SLACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_delays_do_not_serialize() {
        let forward = RecordingForward::default();
        let behaviour = delay_request(pass_through(), 1.0).unwrap();
        let request = get("/");

        let start = Instant::now();
        let (a, b) = tokio::join!(
            behaviour.invoke(&forward, &request),
            behaviour.invoke(&forward, &request)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(forward.calls(), 2);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_around_fixed_response_never_forwards() {
        let forward = RecordingForward::default();
        let behaviour = delay(not_found("missing"), 0.25).unwrap();

        let response = behaviour.invoke(&forward, &get("/")).await.unwrap();
        assert_eq!(response.status(), hyper::StatusCode::NOT_FOUND);
        assert_eq!(forward.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay() {
        let behaviour = delay(pass_through(), 0.0).unwrap();
        assert_eq!(behaviour.duration(), Duration::ZERO);
        assert_eq!(behaviour.phase(), DelayPhase::AfterInner);
        behaviour
            .invoke(&RecordingForward::default(), &get("/"))
            .await
            .unwrap();
    }

    #[test]
    fn test_invalid_delays_rejected() {
        for seconds in [-1.0, f64::NAN, f64::INFINITY, 1e30] {
            assert!(matches!(
                delay(pass_through(), seconds),
                Err(ConfigError::InvalidDelay(_))
            ));
            assert!(matches!(
                delay_request(pass_through(), seconds),
                Err(ConfigError::InvalidDelay(_))
            ));
        }
    }

    #[test]
    fn test_out_of_range_delay_message() {
        let err = delay(pass_through(), 1e30).unwrap_err();
        assert!(err.to_string().contains("within the supported range"));
    }

    #[test]
    fn test_fractional_seconds() {
        let behaviour = delay_request(pass_through(), 0.5).unwrap();
        assert_eq!(behaviour.duration(), Duration::from_millis(500));
        assert_eq!(behaviour.phase(), DelayPhase::BeforeInner);
    }
}
