//! Stage: a named phase of the journey.

use serde::{Deserialize, Serialize};

use super::Touchpoint;

/// Suggested stage names, in journey order.
///
/// Names are free text; these are offered as defaults and drive tab ordering.
pub const CANONICAL_STAGE_NAMES: [&str; 3] = ["Awareness", "Consideration", "Quote"];

/// A phase of the journey. Order within the journey is progression order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub description: String,
    pub touchpoints: Vec<Touchpoint>,
}

impl Stage {
    /// Case-insensitive comparison against a tab or canonical name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
