//! Journey validation.
//!
//! Rules are checked depth-first, root to leaves, array index ascending.
//! That order is the order errors are reported in, so two runs over the same
//! document always produce identical lists.
//!
//! Numeric input is coerced leniently: anything that doesn't parse as a number
//! becomes `0` before the range check runs. A typo in a score field therefore
//! shows up as "0", not as an error of its own.

mod decode;

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{JourneyDocument, SCORE_MAX, SCORE_MIN, Stage, Touchpoint};

const KEY_INSIGHT_MIN: usize = 10;
const INDICATOR_NAME_MIN: usize = 2;
const DESCRIPTION_MIN: usize = 10;
const TOUCHPOINT_TITLE_MIN: usize = 2;
const TOUCHPOINT_TYPE_MIN: usize = 2;
const ACTION_TITLE_MIN: usize = 2;

/// A single rule violation, addressed by its path in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path, e.g. `stages[2].touchpoints[0].actions[1].title`.
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A required nested array is empty.
    Shape,
    /// A score or indicator is outside 0–100.
    Range,
    /// A text field is shorter than its minimum.
    Length,
    /// A compass tag appears more than once on a touchpoint.
    Duplicate,
    /// Wire input had the wrong JSON type or an unknown enum value.
    Type,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A journey document that passed validation.
///
/// Only [`validate`] and [`validate_json`] construct one, so anything that
/// accepts a `&ValidatedJourney` can rely on every invariant holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedJourney(JourneyDocument);

impl ValidatedJourney {
    pub fn document(&self) -> &JourneyDocument {
        &self.0
    }
}

/// Validates a typed document.
pub fn validate(candidate: &JourneyDocument) -> Result<ValidatedJourney, Vec<FieldError>> {
    let mut v = Validator::default();
    v.journey(candidate);
    if v.errors.is_empty() {
        Ok(ValidatedJourney(without_empty_optionals(candidate.clone())))
    } else {
        Err(v.errors)
    }
}

/// Empty optional text is stored as absent, whichever path the document came in by.
fn without_empty_optionals(mut doc: JourneyDocument) -> JourneyDocument {
    let clear = |text: &mut Option<String>| {
        if text.as_deref().is_some_and(str::is_empty) {
            *text = None;
        }
    };
    for tp in doc.stages.iter_mut().flat_map(|s| s.touchpoints.iter_mut()) {
        clear(&mut tp.comment);
        for action in &mut tp.actions {
            clear(&mut action.image_url);
        }
    }
    doc
}

/// Validates untyped wire input.
///
/// Decoding is lenient and never fails outright: missing text becomes empty,
/// missing lists become empty, scores are coerced. Wrong JSON types and unknown
/// enum values are reported as [`ErrorKind::Type`] errors; when there are any,
/// they are returned on their own, before any rule is checked.
pub fn validate_json(value: &Value) -> Result<ValidatedJourney, Vec<FieldError>> {
    let document = decode::decode(value)?;
    validate(&document)
}

/// Parses a raw numeric input the way the score fields do.
///
/// Takes the leading integer (optional sign, then digits) and ignores the rest,
/// so `"85"`, `" 85 "` and `"85.5"` all yield 85. Anything else yields 0.
pub fn coerce_score(raw: &str) -> i64 {
    let s = raw.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

/// Joins a field name onto a parent path.
fn field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Indexes into an array path.
fn item(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn push(&mut self, path: String, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(FieldError {
            path,
            kind,
            message: message.into(),
        });
    }

    fn min_len(&mut self, path: String, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.push(path, ErrorKind::Length, message);
        }
    }

    fn score(&mut self, path: String, value: i64, label: &str) {
        if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
            self.push(
                path,
                ErrorKind::Range,
                format!("{label} must be between {SCORE_MIN} and {SCORE_MAX}"),
            );
        }
    }

    fn non_empty<T>(&mut self, path: &str, items: &[T], message: &str) {
        if items.is_empty() {
            self.push(path.to_string(), ErrorKind::Shape, message);
        }
    }

    fn journey(&mut self, j: &JourneyDocument) {
        self.min_len("title".into(), &j.title, 1, "Title must not be empty");
        self.score("npsScore".into(), j.nps_score, "NPS score");
        self.score(
            "customerSentiment".into(),
            j.customer_sentiment,
            "Customer sentiment",
        );
        self.min_len(
            "keyInsight".into(),
            &j.key_insight,
            KEY_INSIGHT_MIN,
            "Key insight must be at least 10 characters",
        );

        let indicators = "performanceIndicators";
        self.non_empty(
            indicators,
            &j.performance_indicators,
            "At least one performance indicator is required",
        );
        for (i, kpi) in j.performance_indicators.iter().enumerate() {
            let base = item(indicators, i);
            self.min_len(
                field(&base, "name"),
                &kpi.name,
                INDICATOR_NAME_MIN,
                "Name must be at least 2 characters",
            );
            self.score(field(&base, "value"), kpi.value, "Value");
        }

        self.non_empty("stages", &j.stages, "At least one stage is required");
        for (i, stage) in j.stages.iter().enumerate() {
            self.stage(&item("stages", i), stage);
        }
    }

    fn stage(&mut self, base: &str, stage: &Stage) {
        self.min_len(
            field(base, "name"),
            &stage.name,
            1,
            "Stage name must not be empty",
        );
        self.min_len(
            field(base, "description"),
            &stage.description,
            DESCRIPTION_MIN,
            "Description must be at least 10 characters",
        );

        let touchpoints = field(base, "touchpoints");
        self.non_empty(
            &touchpoints,
            &stage.touchpoints,
            "At least one touchpoint is required",
        );
        for (i, tp) in stage.touchpoints.iter().enumerate() {
            self.touchpoint(&item(&touchpoints, i), tp);
        }
    }

    fn touchpoint(&mut self, base: &str, tp: &Touchpoint) {
        self.min_len(
            field(base, "title"),
            &tp.title,
            TOUCHPOINT_TITLE_MIN,
            "Title must be at least 2 characters",
        );
        self.min_len(
            field(base, "type"),
            &tp.kind,
            TOUCHPOINT_TYPE_MIN,
            "Type must be at least 2 characters",
        );
        self.min_len(
            field(base, "duration"),
            &tp.duration,
            1,
            "Duration must not be empty",
        );

        let tags = field(base, "compassTags");
        let mut seen = HashSet::new();
        for (i, tag) in tp.compass_tags.iter().enumerate() {
            if !seen.insert(*tag) {
                self.push(
                    item(&tags, i),
                    ErrorKind::Duplicate,
                    format!("Duplicate compass tag '{tag}'"),
                );
            }
        }

        let actions = field(base, "actions");
        self.non_empty(&actions, &tp.actions, "At least one action is required");
        for (i, action) in tp.actions.iter().enumerate() {
            let base = item(&actions, i);
            self.min_len(
                field(&base, "title"),
                &action.title,
                ACTION_TITLE_MIN,
                "Title must be at least 2 characters",
            );
            self.min_len(
                field(&base, "description"),
                &action.description,
                DESCRIPTION_MIN,
                "Description must be at least 10 characters",
            );
        }
    }
}
