//! Uncertainty: controlled chaos for HTTP services.
//!
//! A rule tree built from *behaviours* and *predicates* decides, per request,
//! whether to pass the request through to the downstream service, delay it,
//! replace the response with a synthetic one, or pick among several outcomes
//! at random.
//!
//! ```no_run
//! use uncertainty::behaviour::{conditional, delay_request, pass_through, random_choice, server_error, Choice};
//! use uncertainty::predicate::{is_post, is_put};
//! use uncertainty::{Settings, UncertaintyLayer};
//!
//! # fn main() -> Result<(), uncertainty::ConfigError> {
//! // 30% of writes fail, the rest are slowed down by half a second.
//! let root = conditional(
//!     is_post() | is_put(),
//!     random_choice([
//!         Choice::weighted(server_error("try again later"), 0.3),
//!         Choice::even(delay_request(pass_through(), 0.5)?),
//!     ])?,
//! );
//! let layer = UncertaintyLayer::new(Settings::new(root));
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```

// ===== Rule tree =====
pub mod behaviour;
pub mod predicate;

// ===== Request/response plumbing =====
pub mod request;
pub mod response;

// ===== Entry point =====
pub mod config;
pub mod error;
pub mod middleware;

pub use behaviour::{Behaviour, BehaviourRef, Forward};
pub use config::Settings;
pub use error::{BehaviourError, BoxError, ConfigError};
pub use middleware::{UncertaintyLayer, UncertaintyService};
pub use predicate::{Condition, Predicate};
pub use request::{Identity, RequestContext};
pub use response::{HttpResponse, ResponseBody};
