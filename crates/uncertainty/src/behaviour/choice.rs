//! Weighted random choice among behaviours.
//!
//! Weights are normalized once, at construction:
//!
//! 1. Explicit weights must be finite, non-negative and sum to at most one.
//! 2. Unweighted choices share the remaining probability evenly. There must
//!    be some probability left for them to share.
//! 3. If every choice is weighted and the weights sum to less than one, the
//!    remainder passes the request through untouched.
//!
//! Each invocation draws a fresh uniform number in `[0, 1)` and walks the
//! cumulative weights in configured order.

use super::{Behaviour, BehaviourRef, Forward, PassThrough};
use crate::error::{BehaviourError, ConfigError};
use crate::request::RequestContext;
use crate::response::HttpResponse;
use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

/// Absorbs floating-point error when checking that weights sum to one.
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// One option of a [`WeightedChoice`].
#[derive(Debug, Clone)]
pub struct Choice {
    behaviour: BehaviourRef,
    weight: Option<f64>,
}

impl Choice {
    /// Chosen with the given probability. A weight of zero is never chosen.
    pub fn weighted(behaviour: impl Into<BehaviourRef>, weight: f64) -> Self {
        Choice {
            behaviour: behaviour.into(),
            weight: Some(weight),
        }
    }

    /// Shares the probability left over by weighted choices.
    pub fn even(behaviour: impl Into<BehaviourRef>) -> Self {
        Choice {
            behaviour: behaviour.into(),
            weight: None,
        }
    }
}

impl From<BehaviourRef> for Choice {
    fn from(behaviour: BehaviourRef) -> Self {
        Choice::even(behaviour)
    }
}

impl From<(BehaviourRef, f64)> for Choice {
    fn from((behaviour, weight): (BehaviourRef, f64)) -> Self {
        Choice::weighted(behaviour, weight)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    behaviour: BehaviourRef,
    weight: f64,
    cumulative: f64,
}

/// Picks exactly one behaviour per request according to its weight.
#[derive(Debug, Clone)]
pub struct WeightedChoice {
    entries: Vec<Entry>,
}

impl WeightedChoice {
    pub fn new<I, C>(choices: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        let choices: Vec<Choice> = choices.into_iter().map(Into::into).collect();

        let mut explicit_total = 0.0;
        let mut unweighted = 0usize;
        for choice in &choices {
            match choice.weight {
                Some(weight) if !weight.is_finite() || weight < 0.0 => {
                    return Err(ConfigError::InvalidWeight(weight));
                }
                Some(weight) => explicit_total += weight,
                None => unweighted += 1,
            }
        }

        if explicit_total > 1.0 + WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsExceedOne(explicit_total));
        }

        let remaining = (1.0 - explicit_total).max(0.0);
        let share = if unweighted > 0 {
            remaining / unweighted as f64
        } else {
            0.0
        };
        if unweighted > 0 && remaining <= WEIGHT_TOLERANCE {
            return Err(ConfigError::NoRemainingWeight {
                total: explicit_total,
                unweighted,
            });
        }

        let mut weighted: Vec<(BehaviourRef, f64)> = choices
            .into_iter()
            .map(|choice| {
                let weight = choice.weight.unwrap_or(share);
                (choice.behaviour, weight)
            })
            .collect();

        if unweighted == 0 && remaining > WEIGHT_TOLERANCE {
            debug!("Remaining probability {:.4} passes requests through", remaining);
            weighted.push((BehaviourRef::new(PassThrough), remaining));
        }

        let mut cumulative = 0.0;
        let entries = weighted
            .into_iter()
            .map(|(behaviour, weight)| {
                cumulative += weight;
                Entry {
                    behaviour,
                    weight,
                    cumulative,
                }
            })
            .collect();

        Ok(WeightedChoice { entries })
    }

    /// Normalized weight of each option, in configured order. Includes the
    /// implicit pass-through option when one was added.
    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    /// Index of the option selected by `draw`, a value in `[0, 1)`.
    fn select(&self, draw: f64) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| draw < e.cumulative)
            // Rounding can leave the total just short of one.
            .or_else(|| self.entries.iter().rposition(|e| e.weight > 0.0))
    }
}

#[async_trait]
impl Behaviour for WeightedChoice {
    async fn invoke(
        &self,
        forward: &dyn Forward,
        request: &RequestContext,
    ) -> Result<HttpResponse, BehaviourError> {
        let draw: f64 = rand::thread_rng().gen();
        match self.select(draw) {
            Some(index) => {
                debug!(
                    "Random choice picked option {} of {} (draw {:.4})",
                    index + 1,
                    self.entries.len(),
                    draw
                );
                self.entries[index].behaviour.invoke(forward, request).await
            }
            None => PassThrough.invoke(forward, request).await,
        }
    }
}

/// Build a [`WeightedChoice`]; see the module docs for the weighting rules.
pub fn random_choice<I, C>(choices: I) -> Result<WeightedChoice, ConfigError>
where
    I: IntoIterator<Item = C>,
    C: Into<Choice>,
{
    WeightedChoice::new(choices)
}
