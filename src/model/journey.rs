//! Journey types: the root aggregate and its list-view summary.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CANONICAL_STAGE_NAMES, Stage};

/// The body of a journey: everything the client authors.
///
/// Also serves as the draft tree inside the form controller, which is why
/// scores are plain `i64` rather than a range-checked type: a draft may
/// hold 101 until validation rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyDocument {
    pub title: String,
    pub nps_score: i64,
    pub customer_sentiment: i64,
    pub key_insight: String,
    pub performance_indicators: Vec<PerformanceIndicator>,
    pub stages: Vec<Stage>,
}

/// A named KPI with a 0–100 value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceIndicator {
    pub name: String,
    pub value: i64,
}

/// A persisted journey: the document plus store-assigned identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: Uuid,

    #[serde(flatten)]
    pub document: JourneyDocument,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// What the journey list shows per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub id: Uuid,
    pub title: String,
    pub nps_score: i64,
    pub customer_sentiment: i64,
    pub key_insight: String,
    pub performance_indicators: Vec<PerformanceIndicator>,
    pub status: Health,
    pub stage_count: usize,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Overall health of a journey, derived from its NPS score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Health {
    Healthy,
    NeedsAttention,
    Critical,
}

impl Health {
    /// Healthy from 70 up, needs attention from 50 up, critical below.
    pub fn from_nps(nps_score: i64) -> Self {
        match nps_score {
            75.. => Self::Healthy,
            50..75 => Self::NeedsAttention,
            _ => Self::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::NeedsAttention => "Needs Attention",
            Self::Critical => "Critical",
        }
    }
}

impl Journey {
    pub fn summary(&self) -> JourneySummary {
        let doc = &self.document;
        JourneySummary {
            id: self.id,
            title: doc.title.clone(),
            nps_score: doc.nps_score,
            customer_sentiment: doc.customer_sentiment,
            key_insight: doc.key_insight.clone(),
            performance_indicators: doc.performance_indicators.clone(),
            status: Health::from_nps(doc.nps_score),
            stage_count: doc.stages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Stage tabs in display order.
    ///
    /// Canonical names present in the journey come first, in canonical order.
    /// Any other stage names follow in document order, each listed once.
    pub fn stage_tabs(&self) -> Vec<String> {
        let stages = &self.document.stages;
        let mut tabs: Vec<String> = CANONICAL_STAGE_NAMES
            .iter()
            .filter(|name| stages.iter().any(|s| s.matches_name(name)))
            .map(|name| (*name).to_string())
            .collect();

        for stage in stages {
            if !tabs.iter().any(|t| stage.matches_name(t)) {
                tabs.push(stage.name.clone());
            }
        }
        tabs
    }

    /// Every stage whose name matches `tab`, ignoring case, in document order.
    pub fn stages_for_tab<'a>(&'a self, tab: &'a str) -> impl Iterator<Item = &'a Stage> + 'a {
        self.document.stages.iter().filter(move |s| s.matches_name(tab))
    }
}
