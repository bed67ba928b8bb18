//! Core data model for Compass.
//!
//! A journey is a tree: journey → stages → touchpoints → actions.
//! Nested entities have no identity of their own; they live and die
//! with their position in the parent's array.
//!
//! Field names serialize as camelCase so the JSON wire shape matches
//! what the dashboard sends and receives.

mod action;
mod journey;
mod stage;
mod touchpoint;
mod user;

pub use action::{Action, ActionKind};
pub use journey::{Health, Journey, JourneyDocument, JourneySummary, PerformanceIndicator};
pub use stage::{CANONICAL_STAGE_NAMES, Stage};
pub use touchpoint::{CompassTag, Touchpoint};
pub use user::{Role, User};

/// Lowest value any score or indicator may take.
pub const SCORE_MIN: i64 = 0;

/// Highest value any score or indicator may take.
pub const SCORE_MAX: i64 = 100;
