//! Enablement of the next/previous/sign controls

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::review::DocumentReviewTracker;

/// When the "next document" control is available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// The current document must be read before moving on
    #[default]
    Strict,
    /// Only the position in the sequence matters
    PositionOnly,
}

impl FromStr for NavigationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(NavigationPolicy::Strict),
            "position_only" | "position-only" => Ok(NavigationPolicy::PositionOnly),
            other => Err(format!("Unknown navigation policy: {}", other)),
        }
    }
}

/// Snapshot of which review controls are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub next_enabled: bool,
    pub prev_enabled: bool,
    pub sign_enabled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationGate {
    policy: NavigationPolicy,
}

impl NavigationGate {
    pub fn new(policy: NavigationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.policy
    }

    pub fn can_go_next(&self, tracker: &DocumentReviewTracker) -> bool {
        let current = tracker.current_index();
        if current + 1 >= tracker.document_count() {
            return false;
        }
        match self.policy {
            NavigationPolicy::Strict => tracker.is_read(current),
            NavigationPolicy::PositionOnly => true,
        }
    }

    pub fn can_go_prev(&self, tracker: &DocumentReviewTracker) -> bool {
        tracker.current_index() > 0
    }

    pub fn can_sign(&self, tracker: &DocumentReviewTracker) -> bool {
        tracker.all_read()
    }

    pub fn controls(&self, tracker: &DocumentReviewTracker) -> ControlState {
        ControlState {
            next_enabled: self.can_go_next(tracker),
            prev_enabled: self.can_go_prev(tracker),
            sign_enabled: self.can_sign(tracker),
        }
    }
}
