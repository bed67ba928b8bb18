//! Typed addresses for every scalar field in a draft.
//!
//! Paths render and parse in the same dotted syntax validation errors use,
//! e.g. `stages[0].touchpoints[1].actions[0].imageUrl`.

use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    Title,
    NpsScore,
    CustomerSentiment,
    KeyInsight,
    Indicator {
        index: usize,
        field: IndicatorField,
    },
    Stage {
        stage: usize,
        field: StageField,
    },
    Touchpoint {
        stage: usize,
        touchpoint: usize,
        field: TouchpointField,
    },
    Action {
        stage: usize,
        touchpoint: usize,
        action: usize,
        field: ActionField,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorField {
    Name,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Name,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpointField {
    Title,
    Type,
    Duration,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionField {
    Title,
    Description,
    ImageUrl,
    Type,
}

impl IndicatorField {
    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Value => "value",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "value" => Some(Self::Value),
            _ => None,
        }
    }
}

impl StageField {
    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "description" => Some(Self::Description),
            _ => None,
        }
    }
}

impl TouchpointField {
    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Type => "type",
            Self::Duration => "duration",
            Self::Comment => "comment",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Self::Title),
            "type" => Some(Self::Type),
            "duration" => Some(Self::Duration),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

impl ActionField {
    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::ImageUrl => "imageUrl",
            Self::Type => "type",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "imageUrl" => Some(Self::ImageUrl),
            "type" => Some(Self::Type),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Title => f.write_str("title"),
            Self::NpsScore => f.write_str("npsScore"),
            Self::CustomerSentiment => f.write_str("customerSentiment"),
            Self::KeyInsight => f.write_str("keyInsight"),
            Self::Indicator { index, field } => {
                write!(f, "performanceIndicators[{index}].{}", field.name())
            }
            Self::Stage { stage, field } => write!(f, "stages[{stage}].{}", field.name()),
            Self::Touchpoint {
                stage,
                touchpoint,
                field,
            } => write!(
                f,
                "stages[{stage}].touchpoints[{touchpoint}].{}",
                field.name()
            ),
            Self::Action {
                stage,
                touchpoint,
                action,
                field,
            } => write!(
                f,
                "stages[{stage}].touchpoints[{touchpoint}].actions[{action}].{}",
                field.name()
            ),
        }
    }
}

/// One dotted segment: a name with an optional `[index]`.
fn segment(s: &str) -> Option<(&str, Option<usize>)> {
    match s.split_once('[') {
        None => Some((s, None)),
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, Some(index)))
        }
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid field path '{s}'");
        let segments = s
            .split('.')
            .map(segment)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let path = match segments.as_slice() {
            [("title", None)] => Some(Self::Title),
            [("npsScore", None)] => Some(Self::NpsScore),
            [("customerSentiment", None)] => Some(Self::CustomerSentiment),
            [("keyInsight", None)] => Some(Self::KeyInsight),
            [("performanceIndicators", Some(index)), (field, None)] => IndicatorField::from_name(field)
                .map(|field| Self::Indicator {
                    index: *index,
                    field,
                }),
            [("stages", Some(stage)), (field, None)] => {
                StageField::from_name(field).map(|field| Self::Stage {
                    stage: *stage,
                    field,
                })
            }
            [
                ("stages", Some(stage)),
                ("touchpoints", Some(touchpoint)),
                (field, None),
            ] => TouchpointField::from_name(field).map(|field| Self::Touchpoint {
                stage: *stage,
                touchpoint: *touchpoint,
                field,
            }),
            [
                ("stages", Some(stage)),
                ("touchpoints", Some(touchpoint)),
                ("actions", Some(action)),
                (field, None),
            ] => ActionField::from_name(field).map(|field| Self::Action {
                stage: *stage,
                touchpoint: *touchpoint,
                action: *action,
                field,
            }),
            _ => None,
        };
        path.ok_or_else(invalid)
    }
}
