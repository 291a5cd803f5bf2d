//! Leaf predicates over request fields.

use super::Predicate;
use crate::request::RequestContext;
use regex::Regex;
use std::fmt;

/// Constant-true predicate.
#[derive(Debug, Clone, Copy)]
pub struct Always;

impl Predicate for Always {
    fn evaluate(&self, _request: &RequestContext) -> bool {
        true
    }
}

/// Request method equals the configured name (case-sensitive).
#[derive(Debug, Clone)]
pub struct IsMethod(String);

impl IsMethod {
    pub fn new(method: impl Into<String>) -> Self {
        IsMethod(method.into())
    }
}

impl Predicate for IsMethod {
    fn evaluate(&self, request: &RequestContext) -> bool {
        request.method().as_str() == self.0
    }
}

/// Parameter present in the query string or the form body.
#[derive(Debug, Clone)]
pub struct HasParameter(String);

impl HasParameter {
    pub fn new(name: impl Into<String>) -> Self {
        HasParameter(name.into())
    }
}

impl Predicate for HasParameter {
    fn evaluate(&self, request: &RequestContext) -> bool {
        request.param(&self.0).is_some()
    }
}

/// Path contains a match for the regex (search, not full match).
#[derive(Clone)]
pub struct PathMatches(Regex);

impl PathMatches {
    pub fn new(regex: Regex) -> Self {
        PathMatches(regex)
    }
}

impl fmt::Debug for PathMatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathMatches").field(&self.0.as_str()).finish()
    }
}

impl Predicate for PathMatches {
    fn evaluate(&self, request: &RequestContext) -> bool {
        self.0.is_match(request.path())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IsAuthenticated;

impl Predicate for IsAuthenticated {
    fn evaluate(&self, request: &RequestContext) -> bool {
        request.identity().is_authenticated()
    }
}

/// Authenticated and the username matches.
#[derive(Debug, Clone)]
pub struct UserIs(String);

impl UserIs {
    pub fn new(username: impl Into<String>) -> Self {
        UserIs(username.into())
    }
}

impl Predicate for UserIs {
    fn evaluate(&self, request: &RequestContext) -> bool {
        request.identity().username() == Some(self.0.as_str())
    }
}
