//! Engine settings.
//!
//! The rule tree is the configuration: operators compose it in code and hand
//! the root to [`Settings`] once at startup. Settings are immutable and cheap
//! to clone.

use crate::behaviour::BehaviourRef;

#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Option<BehaviourRef>,
}

impl Settings {
    /// Route every request through `root`.
    pub fn new(root: impl Into<BehaviourRef>) -> Self {
        Settings {
            root: Some(root.into()),
        }
    }

    /// No rule tree: requests go straight to the downstream service.
    pub fn disabled() -> Self {
        Settings { root: None }
    }

    pub fn root(&self) -> Option<&BehaviourRef> {
        self.root.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }
}

impl From<Option<BehaviourRef>> for Settings {
    fn from(root: Option<BehaviourRef>) -> Self {
        Settings { root }
    }
}
