//! Predicates over requests.
//!
//! A predicate is a pure boolean test of a [`RequestContext`]. Predicates are
//! held behind [`Condition`], a cheap-to-clone handle that also provides the
//! boolean combinators:
//!
//! - `and_(a, b)` or `a & b`
//! - `or_(a, b)` or `a | b`
//! - `not_(a)` or `!a` (unary `-a` is accepted too)
//!
//! # Module Structure
//!
//! - `request` - Leaf predicates over method, path, parameters and identity
//! - `logical` - AND/OR/NOT combinators and operator sugar

mod logical;
mod request;

use crate::error::ConfigError;
use crate::request::RequestContext;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub use logical::{And, Not, Or};
pub use request::{Always, HasParameter, IsAuthenticated, IsMethod, PathMatches, UserIs};

/// A boolean test of a request. Implementations must be pure.
pub trait Predicate: fmt::Debug + Send + Sync {
    fn evaluate(&self, request: &RequestContext) -> bool;
}

/// Shared handle to a predicate in a rule tree.
#[derive(Clone)]
pub struct Condition(Arc<dyn Predicate>);

impl Condition {
    pub fn new<P: Predicate + 'static>(predicate: P) -> Self {
        Condition(Arc::new(predicate))
    }

    pub fn evaluate(&self, request: &RequestContext) -> bool {
        let result = self.0.evaluate(request);
        tracing::trace!(predicate = ?self.0, result, "Evaluated predicate");
        result
    }
}

impl<P: Predicate + 'static> From<P> for Condition {
    fn from(predicate: P) -> Self {
        Condition::new(predicate)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Always true.
pub fn always() -> Condition {
    Condition::new(Always)
}

/// Request method equals `method` exactly.
pub fn is_method(method: impl Into<String>) -> Condition {
    Condition::new(IsMethod::new(method))
}

pub fn is_get() -> Condition {
    is_method("GET")
}

pub fn is_post() -> Condition {
    is_method("POST")
}

pub fn is_put() -> Condition {
    is_method("PUT")
}

pub fn is_delete() -> Condition {
    is_method("DELETE")
}

/// Parameter present in the query string or the form body.
pub fn has_parameter(name: impl Into<String>) -> Condition {
    Condition::new(HasParameter::new(name))
}

/// Pattern found anywhere in the request path; anchor it to match the whole
/// path. Fails if the pattern does not compile.
pub fn path_matches(pattern: &str) -> Result<Condition, ConfigError> {
    Ok(Condition::new(PathMatches::new(Regex::new(pattern)?)))
}

pub fn is_authenticated() -> Condition {
    Condition::new(IsAuthenticated)
}

/// Authenticated as `username`.
pub fn user_is(username: impl Into<String>) -> Condition {
    Condition::new(UserIs::new(username))
}

pub fn and_(left: impl Into<Condition>, right: impl Into<Condition>) -> Condition {
    Condition::new(And::new(left.into(), right.into()))
}

pub fn or_(left: impl Into<Condition>, right: impl Into<Condition>) -> Condition {
    Condition::new(Or::new(left.into(), right.into()))
}

pub fn not_(inner: impl Into<Condition>) -> Condition {
    Condition::new(Not::new(inner.into()))
}

pub use self::has_parameter as has_param;
pub use self::path_matches as path_is;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Identity;
    use hyper::{Method, Uri};
    use proptest::prelude::*;

    fn request(method: Method, uri: &str, user: Option<&str>) -> RequestContext {
        let uri: Uri = uri.parse().unwrap();
        let identity = user.map(Identity::user).unwrap_or_default();
        RequestContext::new(method, uri).with_identity(identity)
    }

    fn sample_conditions() -> Vec<Condition> {
        vec![
            always(),
            is_get(),
            is_post(),
            is_delete(),
            has_parameter("page"),
            path_matches(r"^/api/v\d+").unwrap(),
            is_authenticated(),
            user_is("admin"),
            is_put() | has_param("force"),
        ]
    }

    fn arb_request() -> impl Strategy<Value = RequestContext> {
        let methods = prop_oneof![
            Just(Method::GET),
            Just(Method::POST),
            Just(Method::PUT),
            Just(Method::DELETE),
        ];
        let paths = prop_oneof![
            Just("/"),
            Just("/api/v1/users"),
            Just("/api/vx/users"),
            Just("/static/app.js"),
        ];
        let queries = prop_oneof![Just(""), Just("?page=2"), Just("?force"), Just("?q=1")];
        let users = prop_oneof![Just(None), Just(Some("admin")), Just(Some("guest"))];

        (methods, paths, queries, users)
            .prop_map(|(m, p, q, u)| request(m, &format!("{p}{q}"), u))
    }

    proptest! {
        #[test]
        fn prop_predicates_are_deterministic(req in arb_request()) {
            for condition in sample_conditions() {
                let first = condition.evaluate(&req);
                for _ in 0..5 {
                    prop_assert_eq!(condition.evaluate(&req), first);
                }
            }
        }

        #[test]
        fn prop_conjunction_with_negation_is_false(req in arb_request()) {
            for p in sample_conditions() {
                prop_assert!(!and_(p.clone(), not_(p.clone())).evaluate(&req));
            }
        }

        #[test]
        fn prop_disjunction_with_negation_is_true(req in arb_request()) {
            for p in sample_conditions() {
                prop_assert!(or_(p.clone(), not_(p.clone())).evaluate(&req));
            }
        }

        #[test]
        fn prop_double_negation_is_identity(req in arb_request()) {
            for p in sample_conditions() {
                prop_assert_eq!(not_(not_(p.clone())).evaluate(&req), p.evaluate(&req));
            }
        }

        #[test]
        fn prop_operators_match_named_constructors(req in arb_request()) {
            let a = is_get();
            let b = has_param("page");
            prop_assert_eq!((a.clone() & b.clone()).evaluate(&req), and_(a.clone(), b.clone()).evaluate(&req));
            prop_assert_eq!((a.clone() | b.clone()).evaluate(&req), or_(a.clone(), b.clone()).evaluate(&req));
            prop_assert_eq!((!a.clone()).evaluate(&req), not_(a.clone()).evaluate(&req));
            prop_assert_eq!((-a.clone()).evaluate(&req), not_(a).evaluate(&req));
        }
    }

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        let err = path_matches("/api/(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern(_)));
    }

    #[test]
    fn test_aliases_behave_identically() {
        let req = request(Method::GET, "/api/v2/items?debug", None);
        assert_eq!(
            has_param("debug").evaluate(&req),
            has_parameter("debug").evaluate(&req)
        );
        assert_eq!(
            path_is("items$").unwrap().evaluate(&req),
            path_matches("items$").unwrap().evaluate(&req)
        );
    }

    #[test]
    fn test_custom_predicate() {
        #[derive(Debug)]
        struct HasBody;

        impl Predicate for HasBody {
            fn evaluate(&self, request: &RequestContext) -> bool {
                !request.body().is_empty()
            }
        }

        let condition = Condition::from(HasBody) & is_post();
        let empty = request(Method::POST, "/", None);
        let full = empty.clone().with_body("data");
        assert!(!condition.evaluate(&empty));
        assert!(condition.evaluate(&full));
    }

    #[test]
    fn test_debug_rendering() {
        let condition = is_get() & !has_param("x");
        assert_eq!(
            format!("{condition:?}"),
            r#"And(IsMethod("GET"), Not(HasParameter("x")))"#
        );
    }
}
