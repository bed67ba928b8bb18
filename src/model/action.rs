//! Action types: atomic steps within a touchpoint.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// An atomic step within a touchpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub title: String,
    pub description: String,

    /// URL into the asset host; unset until an upload succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(rename = "type")]
    pub kind: ActionKind,
}

/// Who performs the action. Partitions actions for tabbed display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Customer,
    Backoffice,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Backoffice => "backoffice",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "backoffice" | "back-office" => Ok(Self::Backoffice),
            _ => Err(format!(
                "unknown action type '{s}' (expected customer or backoffice)"
            )),
        }
    }
}
