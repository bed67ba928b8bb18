//! Expanded-section bookkeeping.
//!
//! Presentation state, not document state: which stage, touchpoint, and
//! action panels are open. Newly added nodes open by default. Keys are
//! positional, so removals drop the removed subtree and shift later siblings.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionKey {
    Stage {
        stage: usize,
    },
    Touchpoint {
        stage: usize,
        touchpoint: usize,
    },
    Action {
        stage: usize,
        touchpoint: usize,
        action: usize,
    },
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Stage { stage } => write!(f, "stage-{stage}"),
            Self::Touchpoint { stage, touchpoint } => {
                write!(f, "stage-{stage}-touchpoint-{touchpoint}")
            }
            Self::Action {
                stage,
                touchpoint,
                action,
            } => write!(f, "stage-{stage}-touchpoint-{touchpoint}-action-{action}"),
        }
    }
}

impl FromStr for SectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn num(p: &str) -> Option<usize> {
            p.parse().ok()
        }

        let parts: Vec<&str> = s.split('-').collect();
        let key = match parts.as_slice() {
            ["stage", s] => num(s).map(|stage| Self::Stage { stage }),
            ["stage", s, "touchpoint", t] => {
                num(s).zip(num(t)).map(|(stage, touchpoint)| Self::Touchpoint {
                    stage,
                    touchpoint,
                })
            }
            ["stage", s, "touchpoint", t, "action", a] => match (num(s), num(t), num(a)) {
                (Some(stage), Some(touchpoint), Some(action)) => Some(Self::Action {
                    stage,
                    touchpoint,
                    action,
                }),
                _ => None,
            },
            _ => None,
        };
        key.ok_or_else(|| format!("invalid section '{s}' (e.g. stage-0-touchpoint-1)"))
    }
}

/// The set of open sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sections(BTreeSet<SectionKey>);

impl Sections {
    pub fn expand(&mut self, key: SectionKey) {
        self.0.insert(key);
    }

    /// Flips a section; returns whether it is now open.
    pub fn toggle(&mut self, key: SectionKey) -> bool {
        if self.0.remove(&key) {
            false
        } else {
            self.0.insert(key);
            true
        }
    }

    pub fn is_expanded(&self, key: SectionKey) -> bool {
        self.0.contains(&key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(super) fn stage_removed(&mut self, removed: usize) {
        self.remap(|key| {
            let stage = match key {
                SectionKey::Stage { stage }
                | SectionKey::Touchpoint { stage, .. }
                | SectionKey::Action { stage, .. } => stage,
            };
            let shifted = shift(stage, removed)?;
            Some(match key {
                SectionKey::Stage { .. } => SectionKey::Stage { stage: shifted },
                SectionKey::Touchpoint { touchpoint, .. } => SectionKey::Touchpoint {
                    stage: shifted,
                    touchpoint,
                },
                SectionKey::Action {
                    touchpoint, action, ..
                } => SectionKey::Action {
                    stage: shifted,
                    touchpoint,
                    action,
                },
            })
        });
    }

    pub(super) fn touchpoint_removed(&mut self, in_stage: usize, removed: usize) {
        self.remap(|key| match key {
            SectionKey::Touchpoint { stage, touchpoint } if stage == in_stage => {
                Some(SectionKey::Touchpoint {
                    stage,
                    touchpoint: shift(touchpoint, removed)?,
                })
            }
            SectionKey::Action {
                stage,
                touchpoint,
                action,
            } if stage == in_stage => Some(SectionKey::Action {
                stage,
                touchpoint: shift(touchpoint, removed)?,
                action,
            }),
            other => Some(other),
        });
    }

    pub(super) fn action_removed(&mut self, in_stage: usize, in_touchpoint: usize, removed: usize) {
        self.remap(|key| match key {
            SectionKey::Action {
                stage,
                touchpoint,
                action,
            } if stage == in_stage && touchpoint == in_touchpoint => Some(SectionKey::Action {
                stage,
                touchpoint,
                action: shift(action, removed)?,
            }),
            other => Some(other),
        });
    }

    fn remap(&mut self, f: impl Fn(SectionKey) -> Option<SectionKey>) {
        self.0 = self.0.iter().copied().filter_map(f).collect();
    }
}

/// New position of `index` after the element at `removed` is gone.
fn shift(index: usize, removed: usize) -> Option<usize> {
    match index.cmp(&removed) {
        std::cmp::Ordering::Less => Some(index),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(index - 1),
    }
}
