//! Touchpoint types: customer interaction points and their compass tags.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{Action, ActionKind};

/// A customer interaction point within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Touchpoint {
    pub title: String,

    /// Free-text channel label, e.g. "Digital".
    #[serde(rename = "type")]
    pub kind: String,

    /// Duration label in minutes.
    pub duration: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Order is display-only; a tag appears at most once.
    #[serde(default)]
    pub compass_tags: Vec<CompassTag>,

    pub actions: Vec<Action>,
}

impl Touchpoint {
    /// Actions of one kind, in document order. Backs the customer/back-office tabs.
    pub fn actions_of(&self, kind: ActionKind) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.kind == kind)
    }
}

/// One of the seven behavioral-design categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompassTag {
    Cognitive,
    Orchestrated,
    Memorable,
    Perceived,
    Activate,
    Social,
    Situational,
}

impl CompassTag {
    pub const ALL: [Self; 7] = [
        Self::Cognitive,
        Self::Orchestrated,
        Self::Memorable,
        Self::Perceived,
        Self::Activate,
        Self::Social,
        Self::Situational,
    ];

    /// Wire name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cognitive => "cognitive",
            Self::Orchestrated => "orchestrated",
            Self::Memorable => "memorable",
            Self::Perceived => "perceived",
            Self::Activate => "activate",
            Self::Social => "social",
            Self::Situational => "situational",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cognitive => "Cognitive Ease",
            Self::Orchestrated => "Orchestrated Journeys",
            Self::Memorable => "Memorable Moments",
            Self::Perceived => "Perceived Value",
            Self::Activate => "Activate Adoption",
            Self::Social => "Social Influence",
            Self::Situational => "Situational Context",
        }
    }
}

impl fmt::Display for CompassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompassTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown compass tag '{s}'"))
    }
}
