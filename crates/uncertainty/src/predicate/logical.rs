//! Logical operators for combining predicates.
//!
//! The operator impls on [`Condition`] are sugar over [`And`], [`Or`] and
//! [`Not`] and carry no extra semantics.

use super::{Condition, Predicate};
use crate::request::RequestContext;
use std::ops;

/// Both sides hold. The right side is skipped when the left is false.
#[derive(Debug, Clone)]
pub struct And(Condition, Condition);

impl And {
    pub fn new(left: Condition, right: Condition) -> Self {
        And(left, right)
    }
}

impl Predicate for And {
    fn evaluate(&self, request: &RequestContext) -> bool {
        self.0.evaluate(request) && self.1.evaluate(request)
    }
}

/// Either side holds. The right side is skipped when the left is true.
#[derive(Debug, Clone)]
pub struct Or(Condition, Condition);

impl Or {
    pub fn new(left: Condition, right: Condition) -> Self {
        Or(left, right)
    }
}

impl Predicate for Or {
    fn evaluate(&self, request: &RequestContext) -> bool {
        self.0.evaluate(request) || self.1.evaluate(request)
    }
}

#[derive(Debug, Clone)]
pub struct Not(Condition);

impl Not {
    pub fn new(inner: Condition) -> Self {
        Not(inner)
    }
}

impl Predicate for Not {
    fn evaluate(&self, request: &RequestContext) -> bool {
        !self.0.evaluate(request)
    }
}

impl ops::BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        Condition::new(And::new(self, rhs))
    }
}

impl ops::BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        Condition::new(Or::new(self, rhs))
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::new(Not::new(self))
    }
}

impl ops::Neg for Condition {
    type Output = Condition;

    fn neg(self) -> Condition {
        !self
    }
}
