//! Error types for building and invoking rule trees.

use thiserror::Error;

/// Type-erased error used at the service boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raised while a rule tree is being assembled. Never produced per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid weight {0}: weights must be finite and non-negative")]
    InvalidWeight(f64),

    #[error("choice weights sum to {0}, which is greater than 1")]
    WeightsExceedOne(f64),

    #[error("choice weights already sum to {total}, leaving nothing for {unweighted} unweighted choice(s)")]
    NoRemainingWeight { total: f64, unweighted: usize },

    #[error("invalid delay of {0} seconds: delays must be non-negative and within the supported range")]
    InvalidDelay(f64),

    #[error("invalid probability {0}: must be within [0, 1]")]
    InvalidProbability(f64),

    #[error("invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Raised while a behaviour handles a request.
#[derive(Debug, Error)]
pub enum BehaviourError {
    /// A JSON response body could not be encoded.
    #[error("failed to serialize JSON response body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The downstream handler failed; carried as-is.
    #[error(transparent)]
    Downstream(BoxError),
}

impl BehaviourError {
    /// Convert into a boxed error, unwrapping downstream failures so the host
    /// sees the original error value.
    pub fn into_boxed(self) -> BoxError {
        match self {
            BehaviourError::Downstream(err) => err,
            other => Box::new(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("upstream refused connection")]
    struct UpstreamRefused;

    #[test]
    fn test_downstream_error_is_unwrapped() {
        let err = BehaviourError::Downstream(Box::new(UpstreamRefused));
        let boxed = err.into_boxed();
        assert!(boxed.downcast_ref::<UpstreamRefused>().is_some());
    }

    #[test]
    fn test_serialization_error_is_boxed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let boxed = BehaviourError::from(json_err).into_boxed();
        assert!(boxed.downcast_ref::<BehaviourError>().is_some());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::WeightsExceedOne(1.3).to_string(),
            "choice weights sum to 1.3, which is greater than 1"
        );
        assert_eq!(
            ConfigError::InvalidDelay(-1.0).to_string(),
            "invalid delay of -1 seconds: delays must be non-negative and within the supported range"
        );
        assert_eq!(
            ConfigError::NoRemainingWeight {
                total: 1.0,
                unweighted: 2
            }
            .to_string(),
            "choice weights already sum to 1, leaving nothing for 2 unweighted choice(s)"
        );
    }
}
