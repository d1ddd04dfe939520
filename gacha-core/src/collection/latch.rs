//! Completion announcement latch.
//!
//! `NotAnnounced → Announced` happens once; only an explicit reset goes
//! back. The persisted marker outlives the collection itself, so clearing and
//! refilling the collection does not re-announce.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Value written under the announcement key
pub const MARKER_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementState {
    NotAnnounced,
    Announced,
}

#[derive(Debug, Clone)]
pub struct AnnouncementLatch {
    state: AnnouncementState,
    celebration_pending: bool,
}

impl Default for AnnouncementLatch {
    fn default() -> Self {
        Self {
            state: AnnouncementState::NotAnnounced,
            celebration_pending: false,
        }
    }
}

impl AnnouncementLatch {
    /// Restore from the persisted marker; anything unreadable counts as absent
    pub fn from_marker(raw: Option<&str>) -> Self {
        let announced = match raw {
            None => false,
            Some(value) => {
                let parsed = parse_marker(value);
                if !parsed {
                    warn!(marker = value, "unreadable announcement marker, treating as absent");
                }
                parsed
            }
        };
        Self {
            state: if announced {
                AnnouncementState::Announced
            } else {
                AnnouncementState::NotAnnounced
            },
            celebration_pending: false,
        }
    }

    pub fn state(&self) -> AnnouncementState {
        self.state
    }

    pub fn is_announced(&self) -> bool {
        self.state == AnnouncementState::Announced
    }

    /// Fire if complete and not yet announced. Returns true on the transition.
    pub fn check(&mut self, complete: bool) -> bool {
        if !complete || self.is_announced() {
            return false;
        }
        self.state = AnnouncementState::Announced;
        self.celebration_pending = true;
        true
    }

    pub fn celebration_pending(&self) -> bool {
        self.celebration_pending
    }

    /// Consume the one-shot celebration trigger
    pub fn take_celebration(&mut self) -> bool {
        std::mem::take(&mut self.celebration_pending)
    }

    pub fn reset(&mut self) {
        self.state = AnnouncementState::NotAnnounced;
        self.celebration_pending = false;
    }
}

/// `true` as JSON, or the string `"true"`
fn parse_marker(raw: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Bool(b)) => b,
        Ok(serde_json::Value::String(s)) => s == MARKER_VALUE,
        _ => false,
    }
}
