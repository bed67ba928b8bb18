//! Journey form state: an owned, mutable draft of a journey being edited.
//!
//! The controller guarantees the draft never has an empty array at a level
//! that requires at least one element. Removing the last stage, touchpoint,
//! action, or performance indicator is rejected with a user-facing warning
//! and leaves the draft unchanged. New stages and touchpoints are seeded with
//! a default child so the guarantee holds from the moment they exist.
//!
//! Every operation touches only its target subtree. Submission validates the
//! whole draft first and hands it to a [`JourneyStore`] only when it is clean.

mod path;
mod sections;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    model::{
        Action, ActionKind, CANONICAL_STAGE_NAMES, CompassTag, Journey, JourneyDocument,
        PerformanceIndicator, Stage, Touchpoint,
    },
    store::{ImageHost, JourneyStore, StoreError},
    validate::{self, FieldError, ValidatedJourney, coerce_score},
};

pub use path::{ActionField, FieldPath, IndicatorField, StageField, TouchpointField};
pub use sections::{SectionKey, Sections};

/// Rejected draft operations.
///
/// The `Last*` variants are guard violations; their messages are shown
/// to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("You need at least one performance indicator")]
    LastIndicator,

    #[error("You need at least one stage")]
    LastStage,

    #[error("You need at least one touchpoint per stage")]
    LastTouchpoint,

    #[error("You need at least one action per touchpoint")]
    LastAction,

    #[error("no performance indicator at index {0}")]
    NoSuchIndicator(usize),

    #[error("no stage at index {0}")]
    NoSuchStage(usize),

    #[error("no touchpoint at stages[{stage}].touchpoints[{touchpoint}]")]
    NoSuchTouchpoint { stage: usize, touchpoint: usize },

    #[error("no action at stages[{stage}].touchpoints[{touchpoint}].actions[{action}]")]
    NoSuchAction {
        stage: usize,
        touchpoint: usize,
        action: usize,
    },

    #[error("invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: String },
}

impl DraftError {
    /// Whether this is a minimum-count guard rather than a bad address or value.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            Self::LastIndicator | Self::LastStage | Self::LastTouchpoint | Self::LastAction
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Every rule violation in the draft, in validation order.
    #[error("draft has {} validation error(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The upload failed; the action's image is left as it was.
    #[error("image upload failed: {0}")]
    Store(#[from] StoreError),
}

/// Whether submitting creates a new journey or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit(Uuid),
}

/// Issued by [`DraftController::begin_load`]; only the most recent one is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub type Result<T> = core::result::Result<T, DraftError>;

/// Owns one draft and the presentation state around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftController {
    draft: JourneyDocument,

    /// Set when editing a persisted journey.
    bound_id: Option<Uuid>,

    sections: Sections,

    #[serde(skip)]
    latest_load: u64,
}

impl Default for DraftController {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftController {
    /// An empty draft in create mode.
    pub fn new() -> Self {
        Self {
            draft: blank_journey(),
            bound_id: None,
            sections: Sections::default(),
            latest_load: 0,
        }
    }

    /// A draft of an existing journey, bound to its id.
    pub fn edit(journey: Journey) -> Self {
        Self {
            draft: journey.document,
            bound_id: Some(journey.id),
            sections: Sections::default(),
            latest_load: 0,
        }
    }

    pub fn draft(&self) -> &JourneyDocument {
        &self.draft
    }

    pub fn mode(&self) -> Mode {
        self.bound_id.map_or(Mode::Create, Mode::Edit)
    }

    pub fn is_expanded(&self, key: SectionKey) -> bool {
        self.sections.is_expanded(key)
    }

    /// Opens or closes a section; returns whether it is now open.
    pub fn toggle_section(&mut self, key: SectionKey) -> bool {
        self.sections.toggle(key)
    }

    // ── Performance indicators ──

    /// Appends a blank indicator, returning its index.
    pub fn add_performance_indicator(&mut self) -> usize {
        self.draft.performance_indicators.push(PerformanceIndicator {
            name: String::new(),
            value: 0,
        });
        self.draft.performance_indicators.len() - 1
    }

    pub fn remove_performance_indicator(&mut self, index: usize) -> Result<()> {
        let indicators = &mut self.draft.performance_indicators;
        if index >= indicators.len() {
            return Err(DraftError::NoSuchIndicator(index));
        }
        if indicators.len() == 1 {
            return Err(guard(DraftError::LastIndicator));
        }
        indicators.remove(index);
        Ok(())
    }

    // ── Stages ──

    /// Appends a stage seeded with one touchpoint holding one action.
    pub fn add_stage(&mut self) -> usize {
        self.draft.stages.push(blank_stage());
        let stage = self.draft.stages.len() - 1;
        self.sections.expand(SectionKey::Stage { stage });
        self.sections.expand(SectionKey::Touchpoint {
            stage,
            touchpoint: 0,
        });
        self.sections.expand(SectionKey::Action {
            stage,
            touchpoint: 0,
            action: 0,
        });
        stage
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<()> {
        let stages = &mut self.draft.stages;
        if index >= stages.len() {
            return Err(DraftError::NoSuchStage(index));
        }
        if stages.len() == 1 {
            return Err(guard(DraftError::LastStage));
        }
        stages.remove(index);
        self.sections.stage_removed(index);
        Ok(())
    }

    // ── Touchpoints ──

    /// Appends a touchpoint seeded with one action, returning its index.
    pub fn add_touchpoint(&mut self, stage: usize) -> Result<usize> {
        let touchpoints = &mut self.stage_mut(stage)?.touchpoints;
        touchpoints.push(blank_touchpoint());
        let touchpoint = touchpoints.len() - 1;
        self.sections
            .expand(SectionKey::Touchpoint { stage, touchpoint });
        self.sections.expand(SectionKey::Action {
            stage,
            touchpoint,
            action: 0,
        });
        Ok(touchpoint)
    }

    pub fn remove_touchpoint(&mut self, stage: usize, touchpoint: usize) -> Result<()> {
        let touchpoints = &mut self.stage_mut(stage)?.touchpoints;
        if touchpoint >= touchpoints.len() {
            return Err(DraftError::NoSuchTouchpoint { stage, touchpoint });
        }
        if touchpoints.len() == 1 {
            return Err(guard(DraftError::LastTouchpoint));
        }
        touchpoints.remove(touchpoint);
        self.sections.touchpoint_removed(stage, touchpoint);
        Ok(())
    }

    // ── Actions ──

    /// Appends a blank customer action, returning its index.
    pub fn add_action(&mut self, stage: usize, touchpoint: usize) -> Result<usize> {
        let actions = &mut self.touchpoint_mut(stage, touchpoint)?.actions;
        actions.push(blank_action());
        let action = actions.len() - 1;
        self.sections.expand(SectionKey::Action {
            stage,
            touchpoint,
            action,
        });
        Ok(action)
    }

    pub fn remove_action(&mut self, stage: usize, touchpoint: usize, action: usize) -> Result<()> {
        let actions = &mut self.touchpoint_mut(stage, touchpoint)?.actions;
        if action >= actions.len() {
            return Err(DraftError::NoSuchAction {
                stage,
                touchpoint,
                action,
            });
        }
        if actions.len() == 1 {
            return Err(guard(DraftError::LastAction));
        }
        actions.remove(action);
        self.sections.action_removed(stage, touchpoint, action);
        Ok(())
    }

    // ── Leaf edits ──

    /// Sets one scalar field from raw input text.
    ///
    /// Score and indicator values go through [`coerce_score`], so text that
    /// doesn't parse stores 0. Empty input clears optional fields.
    pub fn set_field(&mut self, path: FieldPath, value: &str) -> Result<()> {
        let text = value.to_string();
        match path {
            FieldPath::Title => self.draft.title = text,
            FieldPath::NpsScore => self.draft.nps_score = coerce_score(value),
            FieldPath::CustomerSentiment => self.draft.customer_sentiment = coerce_score(value),
            FieldPath::KeyInsight => self.draft.key_insight = text,
            FieldPath::Indicator { index, field } => {
                let kpi = self
                    .draft
                    .performance_indicators
                    .get_mut(index)
                    .ok_or(DraftError::NoSuchIndicator(index))?;
                match field {
                    IndicatorField::Name => kpi.name = text,
                    IndicatorField::Value => kpi.value = coerce_score(value),
                }
            }
            FieldPath::Stage { stage, field } => {
                let stage = self.stage_mut(stage)?;
                match field {
                    StageField::Name => stage.name = text,
                    StageField::Description => stage.description = text,
                }
            }
            FieldPath::Touchpoint {
                stage,
                touchpoint,
                field,
            } => {
                let tp = self.touchpoint_mut(stage, touchpoint)?;
                match field {
                    TouchpointField::Title => tp.title = text,
                    TouchpointField::Type => tp.kind = text,
                    TouchpointField::Duration => tp.duration = text,
                    TouchpointField::Comment => tp.comment = non_empty(text),
                }
            }
            FieldPath::Action {
                stage,
                touchpoint,
                action,
                field,
            } => {
                let kind = match field {
                    ActionField::Type => {
                        Some(value.parse::<ActionKind>().map_err(|reason| {
                            DraftError::InvalidValue {
                                path: path.to_string(),
                                reason,
                            }
                        })?)
                    }
                    _ => None,
                };
                let act = self.action_mut(stage, touchpoint, action)?;
                match field {
                    ActionField::Title => act.title = text,
                    ActionField::Description => act.description = text,
                    ActionField::ImageUrl => act.image_url = non_empty(text),
                    ActionField::Type => {
                        if let Some(kind) = kind {
                            act.kind = kind;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Adds `tag` if absent, removes it if present. Returns whether it is now present.
    ///
    /// Removal takes out a single occurrence, so toggling twice always
    /// restores the original list.
    pub fn toggle_compass_tag(
        &mut self,
        stage: usize,
        touchpoint: usize,
        tag: CompassTag,
    ) -> Result<bool> {
        let tags = &mut self.touchpoint_mut(stage, touchpoint)?.compass_tags;
        if let Some(pos) = tags.iter().position(|t| *t == tag) {
            tags.remove(pos);
            Ok(tags.contains(&tag))
        } else {
            tags.push(tag);
            Ok(true)
        }
    }

    /// Uploads an image and attaches its URL to an action.
    ///
    /// On failure the action keeps whatever image it had; the user can retry.
    pub fn upload_image(
        &mut self,
        host: &dyn ImageHost,
        stage: usize,
        touchpoint: usize,
        action: usize,
        bytes: &[u8],
        content_type: &str,
    ) -> core::result::Result<String, UploadError> {
        self.action_mut(stage, touchpoint, action)?;
        let url = host.upload_image(bytes, content_type).inspect_err(|e| {
            warn!(stage, touchpoint, action, error = %e, "image upload failed");
        })?;
        self.action_mut(stage, touchpoint, action)?.image_url = Some(url.clone());
        Ok(url)
    }

    // ── Validation and submission ──

    pub fn validate(&self) -> core::result::Result<ValidatedJourney, Vec<FieldError>> {
        validate::validate(&self.draft)
    }

    /// Validates the draft and, if clean, writes it to the store.
    ///
    /// Create mode resets to a blank draft on success; edit mode stays bound
    /// to the persisted id. On any failure the draft is left intact.
    pub fn submit(&mut self, store: &dyn JourneyStore) -> core::result::Result<Journey, SubmitError> {
        let validated = self.validate().map_err(|errors| {
            warn!(errors = errors.len(), "submit rejected: draft is invalid");
            SubmitError::Invalid(errors)
        })?;

        let journey = match self.bound_id {
            Some(id) => store.update_journey(id, &validated),
            None => store.create_journey(&validated),
        }
        .inspect_err(|e| warn!(error = %e, "submit failed"))?;

        match self.mode() {
            Mode::Create => {
                info!(id = %journey.id, "journey created");
                self.draft = blank_journey();
                self.sections.clear();
            }
            Mode::Edit(id) => info!(%id, "journey updated"),
        }
        Ok(journey)
    }

    // ── Loading ──

    /// Starts a load; any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_load += 1;
        LoadTicket(self.latest_load)
    }

    /// Applies a loaded journey if `ticket` is still the latest.
    ///
    /// Returns `false` and leaves the draft untouched for stale responses.
    pub fn finish_load(&mut self, ticket: LoadTicket, journey: Journey) -> bool {
        if ticket.0 != self.latest_load {
            debug!(id = %journey.id, "discarding stale load");
            return false;
        }
        self.bound_id = Some(journey.id);
        self.draft = journey.document;
        self.sections.clear();
        true
    }

    fn stage_mut(&mut self, stage: usize) -> Result<&mut Stage> {
        self.draft
            .stages
            .get_mut(stage)
            .ok_or(DraftError::NoSuchStage(stage))
    }

    fn touchpoint_mut(&mut self, stage: usize, touchpoint: usize) -> Result<&mut Touchpoint> {
        self.stage_mut(stage)?
            .touchpoints
            .get_mut(touchpoint)
            .ok_or(DraftError::NoSuchTouchpoint { stage, touchpoint })
    }

    fn action_mut(&mut self, stage: usize, touchpoint: usize, action: usize) -> Result<&mut Action> {
        self.touchpoint_mut(stage, touchpoint)?
            .actions
            .get_mut(action)
            .ok_or(DraftError::NoSuchAction {
                stage,
                touchpoint,
                action,
            })
    }
}

/// Logs a guard violation on its way out.
fn guard(err: DraftError) -> DraftError {
    warn!("{err}");
    err
}

fn non_empty(s: String) -> Option<String> {
    Some(s).filter(|s| !s.is_empty())
}

fn blank_journey() -> JourneyDocument {
    JourneyDocument {
        title: String::new(),
        nps_score: 0,
        customer_sentiment: 0,
        key_insight: String::new(),
        performance_indicators: vec![PerformanceIndicator {
            name: "Conversion".into(),
            value: 0,
        }],
        stages: vec![blank_stage()],
    }
}

fn blank_stage() -> Stage {
    Stage {
        name: CANONICAL_STAGE_NAMES[0].to_string(),
        description: String::new(),
        touchpoints: vec![blank_touchpoint()],
    }
}

fn blank_touchpoint() -> Touchpoint {
    Touchpoint {
        title: String::new(),
        kind: "Digital".into(),
        duration: String::new(),
        comment: None,
        compass_tags: Vec::new(),
        actions: vec![blank_action()],
    }
}

fn blank_action() -> Action {
    Action {
        title: String::new(),
        description: String::new(),
        image_url: None,
        kind: ActionKind::Customer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use jiff::Timestamp;
    use proptest::prelude::*;

    use crate::{
        model::JourneySummary,
        storage::tests::test_storage,
        validate::{ErrorKind, tests::valid_document},
    };

    fn filled() -> DraftController {
        let mut c = DraftController::new();
        c.draft = valid_document();
        c
    }

    fn set(c: &mut DraftController, path: &str, value: &str) {
        c.set_field(path.parse().unwrap(), value).unwrap();
    }

    /// A store that is never reachable.
    struct Offline;

    impl JourneyStore for Offline {
        fn create_journey(&self, _: &ValidatedJourney) -> crate::store::Result<Journey> {
            Err(StoreError::Transport("connection refused".into()))
        }
        fn update_journey(&self, _: Uuid, _: &ValidatedJourney) -> crate::store::Result<Journey> {
            Err(StoreError::Transport("connection refused".into()))
        }
        fn get_journey(&self, id: Uuid) -> crate::store::Result<Journey> {
            Err(StoreError::NotFound(id))
        }
        fn list_journeys(&self) -> crate::store::Result<Vec<JourneySummary>> {
            Ok(vec![])
        }
        fn delete_journey(&self, id: Uuid) -> crate::store::Result<()> {
            Err(StoreError::NotFound(id))
        }
    }

    /// Records uploads; fails when `fail` is set.
    struct FakeHost {
        fail: bool,
        uploads: RefCell<Vec<(usize, String)>>,
    }

    impl ImageHost for FakeHost {
        fn upload_image(&self, bytes: &[u8], content_type: &str) -> crate::store::Result<String> {
            if self.fail {
                return Err(StoreError::Transport("asset host down".into()));
            }
            self.uploads
                .borrow_mut()
                .push((bytes.len(), content_type.to_string()));
            Ok("https://assets.example/abc".into())
        }
    }

    #[test]
    fn new_draft_has_one_of_everything() {
        let c = DraftController::new();
        let d = c.draft();
        assert_eq!(c.mode(), Mode::Create);
        assert_eq!(d.performance_indicators.len(), 1);
        assert_eq!(d.stages.len(), 1);
        assert_eq!(d.stages[0].name, "Awareness");
        assert_eq!(d.stages[0].touchpoints.len(), 1);
        assert_eq!(d.stages[0].touchpoints[0].kind, "Digital");
        assert_eq!(d.stages[0].touchpoints[0].actions.len(), 1);
    }

    #[test]
    fn removing_the_last_action_warns_and_changes_nothing() {
        let mut c = filled();
        let before = c.clone();

        let err = c.remove_action(0, 0, 0).unwrap_err();

        assert_eq!(err, DraftError::LastAction);
        assert!(err.is_guard());
        assert_eq!(err.to_string(), "You need at least one action per touchpoint");
        assert_eq!(c, before);
    }

    #[test]
    fn every_level_guards_its_minimum() {
        let mut c = DraftController::new();
        assert_eq!(
            c.remove_performance_indicator(0).unwrap_err(),
            DraftError::LastIndicator
        );
        assert_eq!(c.remove_stage(0).unwrap_err(), DraftError::LastStage);
        assert_eq!(
            c.remove_touchpoint(0, 0).unwrap_err(),
            DraftError::LastTouchpoint
        );
        assert_eq!(c.remove_action(0, 0, 0).unwrap_err(), DraftError::LastAction);
    }

    #[test]
    fn bad_indices_are_not_guard_violations() {
        let mut c = DraftController::new();
        let err = c.remove_touchpoint(3, 0).unwrap_err();
        assert_eq!(err, DraftError::NoSuchStage(3));
        assert!(!err.is_guard());
        assert_eq!(
            c.add_action(0, 5).unwrap_err(),
            DraftError::NoSuchTouchpoint {
                stage: 0,
                touchpoint: 5
            }
        );
    }

    #[test]
    fn add_stage_seeds_and_expands_the_subtree() {
        let mut c = DraftController::new();
        let stage = c.add_stage();

        assert_eq!(stage, 1);
        let s = &c.draft().stages[1];
        assert_eq!(s.touchpoints.len(), 1);
        assert_eq!(s.touchpoints[0].actions.len(), 1);
        assert!(c.is_expanded(SectionKey::Stage { stage: 1 }));
        assert!(c.is_expanded(SectionKey::Touchpoint {
            stage: 1,
            touchpoint: 0
        }));
        assert!(c.is_expanded(SectionKey::Action {
            stage: 1,
            touchpoint: 0,
            action: 0
        }));
        assert!(!c.is_expanded(SectionKey::Stage { stage: 0 }));
    }

    #[test]
    fn add_and_remove_only_touch_the_target_subtree() {
        let mut c = filled();
        c.add_stage();
        let first_stage = c.draft().stages[0].clone();

        let tp = c.add_touchpoint(1).unwrap();
        c.add_action(1, tp).unwrap();
        c.remove_touchpoint(1, 0).unwrap();

        assert_eq!(c.draft().stages[0], first_stage);
        assert_eq!(c.draft().stages[1].touchpoints.len(), 1);
        assert_eq!(c.draft().stages[1].touchpoints[0].actions.len(), 2);
        assert!(c.is_expanded(SectionKey::Action {
            stage: 1,
            touchpoint: 0,
            action: 1
        }));
    }

    #[test]
    fn removing_the_first_indicator_keeps_the_second() {
        let mut c = filled();
        let added = c.add_performance_indicator();
        set(&mut c, &format!("performanceIndicators[{added}].name"), "Retention");
        set(&mut c, &format!("performanceIndicators[{added}].value"), "40");

        c.remove_performance_indicator(0).unwrap();

        assert_eq!(
            c.draft().performance_indicators,
            vec![PerformanceIndicator {
                name: "Retention".into(),
                value: 40,
            }]
        );
    }

    #[test]
    fn removing_the_first_stage_shifts_the_second_and_its_sections() {
        let mut c = filled();
        c.add_stage();
        set(&mut c, "stages[1].name", "Quote");
        let second = c.draft().stages[1].clone();

        c.remove_stage(0).unwrap();

        assert_eq!(c.draft().stages, vec![second]);
        assert!(c.is_expanded(SectionKey::Stage { stage: 0 }));
        assert!(c.is_expanded(SectionKey::Touchpoint {
            stage: 0,
            touchpoint: 0
        }));
        assert!(c.is_expanded(SectionKey::Action {
            stage: 0,
            touchpoint: 0,
            action: 0
        }));
        assert!(!c.is_expanded(SectionKey::Stage { stage: 1 }));
    }

    #[test]
    fn removing_the_first_action_shifts_the_second_and_its_section() {
        let mut c = filled();
        let added = c.add_action(0, 0).unwrap();
        set(&mut c, &format!("stages[0].touchpoints[0].actions[{added}].title"), "Second");
        let touchpoint_title = c.draft().stages[0].touchpoints[0].title.clone();

        c.remove_action(0, 0, 0).unwrap();

        let tp = &c.draft().stages[0].touchpoints[0];
        assert_eq!(tp.title, touchpoint_title);
        assert_eq!(tp.actions.len(), 1);
        assert_eq!(tp.actions[0].title, "Second");
        assert!(c.is_expanded(SectionKey::Action {
            stage: 0,
            touchpoint: 0,
            action: 0
        }));
        assert!(!c.is_expanded(SectionKey::Action {
            stage: 0,
            touchpoint: 0,
            action: 1
        }));
    }

    #[test]
    fn set_field_changes_only_the_addressed_leaf() {
        let mut c = filled();
        c.add_stage();
        let before = c.draft().clone();

        set(&mut c, "stages[1].touchpoints[0].actions[0].title", "Sign up");

        let mut expected = before;
        expected.stages[1].touchpoints[0].actions[0].title = "Sign up".into();
        assert_eq!(c.draft(), &expected);
    }

    #[test]
    fn numeric_fields_coerce_leniently() {
        let mut c = filled();
        set(&mut c, "npsScore", "oops");
        set(&mut c, "customerSentiment", "101");
        set(&mut c, "performanceIndicators[0].value", "42");

        assert_eq!(c.draft().nps_score, 0);
        assert_eq!(c.draft().customer_sentiment, 101);
        assert_eq!(c.draft().performance_indicators[0].value, 42);

        let errors = c.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "customerSentiment");
        assert_eq!(errors[0].kind, ErrorKind::Range);
    }

    #[test]
    fn optional_fields_clear_on_empty_input() {
        let mut c = filled();
        set(&mut c, "stages[0].touchpoints[0].comment", "");
        set(&mut c, "stages[0].touchpoints[0].actions[0].imageUrl", "");
        let tp = &c.draft().stages[0].touchpoints[0];
        assert_eq!(tp.comment, None);
        assert_eq!(tp.actions[0].image_url, None);
    }

    #[test]
    fn invalid_action_type_is_rejected_without_change() {
        let mut c = filled();
        let before = c.clone();
        let err = c
            .set_field(
                "stages[0].touchpoints[0].actions[0].type".parse().unwrap(),
                "partner",
            )
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { .. }));
        assert_eq!(c, before);

        set(&mut c, "stages[0].touchpoints[0].actions[0].type", "backoffice");
        assert_eq!(
            c.draft().stages[0].touchpoints[0].actions[0].kind,
            ActionKind::Backoffice
        );
    }

    #[test]
    fn toggling_a_tag_twice_restores_the_list() {
        let mut c = filled();
        let original = c.draft().stages[0].touchpoints[0].compass_tags.clone();

        assert!(c.toggle_compass_tag(0, 0, CompassTag::Memorable).unwrap());
        assert!(!c.toggle_compass_tag(0, 0, CompassTag::Memorable).unwrap());
        assert_eq!(c.draft().stages[0].touchpoints[0].compass_tags, original);

        assert!(!c.toggle_compass_tag(0, 0, CompassTag::Cognitive).unwrap());
        assert!(c.toggle_compass_tag(0, 0, CompassTag::Cognitive).unwrap());
        let mut restored = c.draft().stages[0].touchpoints[0].compass_tags.clone();
        restored.sort();
        let mut original = original;
        original.sort();
        assert_eq!(restored, original);
    }

    #[test]
    fn toggling_a_duplicated_tag_twice_empties_it() {
        let mut c = filled();
        c.draft.stages[0].touchpoints[0].compass_tags =
            vec![CompassTag::Cognitive, CompassTag::Cognitive];

        c.toggle_compass_tag(0, 0, CompassTag::Cognitive).unwrap();
        c.toggle_compass_tag(0, 0, CompassTag::Cognitive).unwrap();

        assert!(c.draft().stages[0].touchpoints[0].compass_tags.is_empty());
    }

    #[test]
    fn submit_creates_and_resets() {
        let (_dir, storage) = test_storage();
        let mut c = DraftController::new();
        set(&mut c, "title", "iJoin");
        set(&mut c, "npsScore", "85");
        set(&mut c, "customerSentiment", "90");
        set(&mut c, "keyInsight", "High conversion from onboarding");
        set(&mut c, "stages[0].description", "Customer discovers us online");
        set(&mut c, "stages[0].touchpoints[0].title", "Website");
        set(&mut c, "stages[0].touchpoints[0].duration", "5");
        set(&mut c, "stages[0].touchpoints[0].actions[0].title", "Browse");
        set(
            &mut c,
            "stages[0].touchpoints[0].actions[0].description",
            "Customer browses the product pages",
        );
        let submitted = c.draft().clone();

        let journey = c.submit(&storage).unwrap();

        assert!(!journey.id.is_nil());
        assert!(journey.created_at <= Timestamp::now());
        assert_eq!(journey.document, submitted);
        assert_eq!(c, DraftController::new());

        let fetched = storage.get_journey(journey.id).unwrap();
        assert_eq!(fetched.document, submitted);
    }

    #[test]
    fn submit_in_edit_mode_updates_and_stays_bound() {
        let (_dir, storage) = test_storage();
        let mut c = filled();
        let created = c.submit(&storage).unwrap();

        let mut c = DraftController::edit(created.clone());
        set(&mut c, "title", "iJoin v2");
        let updated = c.submit(&storage).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.document.title, "iJoin v2");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(c.mode(), Mode::Edit(created.id));
        assert_eq!(c.draft().title, "iJoin v2");
        assert_eq!(storage.list_journeys().unwrap().len(), 1);
    }

    #[test]
    fn invalid_submit_reports_everything_and_keeps_the_draft() {
        let (_dir, storage) = test_storage();
        let mut c = DraftController::new();
        let before = c.clone();

        let err = c.submit(&storage).unwrap_err();

        let SubmitError::Invalid(errors) = err else {
            panic!("expected validation errors, got {err:?}");
        };
        assert!(errors.len() > 1);
        assert_eq!(errors[0].path, "title");
        assert_eq!(c, before);
        assert!(storage.list_journeys().unwrap().is_empty());
    }

    #[test]
    fn transport_failure_keeps_the_draft() {
        let mut c = filled();
        let before = c.clone();

        let err = c.submit(&Offline).unwrap_err();

        assert!(matches!(err, SubmitError::Store(StoreError::Transport(_))));
        assert_eq!(c, before);
    }

    #[test]
    fn image_upload_sets_url_only_on_success() {
        let mut c = filled();
        let down = FakeHost {
            fail: true,
            uploads: RefCell::default(),
        };
        assert!(matches!(
            c.upload_image(&down, 0, 0, 0, b"png", "image/png"),
            Err(UploadError::Store(_))
        ));
        assert_eq!(c.draft().stages[0].touchpoints[0].actions[0].image_url, None);

        let up = FakeHost {
            fail: false,
            uploads: RefCell::default(),
        };
        let url = c.upload_image(&up, 0, 0, 0, b"png", "image/png").unwrap();
        assert_eq!(
            c.draft().stages[0].touchpoints[0].actions[0].image_url,
            Some(url)
        );
        assert_eq!(up.uploads.borrow().as_slice(), [(3, "image/png".to_string())]);

        assert!(matches!(
            c.upload_image(&up, 0, 0, 9, b"png", "image/png"),
            Err(UploadError::Draft(DraftError::NoSuchAction { .. }))
        ));
        assert_eq!(up.uploads.borrow().len(), 1);
    }

    #[test]
    fn stale_loads_are_discarded() {
        let journey = |title: &str| Journey {
            id: Uuid::new_v4(),
            document: JourneyDocument {
                title: title.into(),
                ..valid_document()
            },
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        };
        let mut c = DraftController::new();
        let first = c.begin_load();
        let second = c.begin_load();

        let b = journey("B");
        assert!(c.finish_load(second, b.clone()));
        assert!(!c.finish_load(first, journey("A")));

        assert_eq!(c.draft().title, "B");
        assert_eq!(c.mode(), Mode::Edit(b.id));
    }

    #[test]
    fn controller_survives_a_json_round_trip() {
        let mut c = filled();
        c.add_stage();
        let json = serde_json::to_string(&c).unwrap();
        let back: DraftController = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddIndicator,
        RemoveIndicator(usize),
        AddStage,
        RemoveStage(usize),
        AddTouchpoint(usize),
        RemoveTouchpoint(usize, usize),
        AddAction(usize, usize),
        RemoveAction(usize, usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::AddIndicator),
            (0..4usize).prop_map(Op::RemoveIndicator),
            Just(Op::AddStage),
            (0..4usize).prop_map(Op::RemoveStage),
            (0..4usize).prop_map(Op::AddTouchpoint),
            (0..4usize, 0..4usize).prop_map(|(s, t)| Op::RemoveTouchpoint(s, t)),
            (0..4usize, 0..4usize).prop_map(|(s, t)| Op::AddAction(s, t)),
            (0..4usize, 0..4usize, 0..4usize).prop_map(|(s, t, a)| Op::RemoveAction(s, t, a)),
        ]
    }

    fn apply(c: &mut DraftController, op: &Op) {
        // Rejections are expected; only the invariant matters here.
        let _ = match *op {
            Op::AddIndicator => Ok(c.add_performance_indicator()),
            Op::RemoveIndicator(i) => c.remove_performance_indicator(i).map(|()| 0),
            Op::AddStage => Ok(c.add_stage()),
            Op::RemoveStage(i) => c.remove_stage(i).map(|()| 0),
            Op::AddTouchpoint(s) => c.add_touchpoint(s),
            Op::RemoveTouchpoint(s, t) => c.remove_touchpoint(s, t).map(|()| 0),
            Op::AddAction(s, t) => c.add_action(s, t),
            Op::RemoveAction(s, t, a) => c.remove_action(s, t, a).map(|()| 0),
        };
    }

    proptest! {
        #[test]
        fn minimums_hold_after_any_operation_sequence(ops in prop::collection::vec(op(), 0..64)) {
            let mut c = DraftController::new();
            for op in &ops {
                apply(&mut c, op);
                let d = c.draft();
                prop_assert!(!d.performance_indicators.is_empty());
                prop_assert!(!d.stages.is_empty());
                for stage in &d.stages {
                    prop_assert!(!stage.touchpoints.is_empty());
                    for tp in &stage.touchpoints {
                        prop_assert!(!tp.actions.is_empty());
                    }
                }
            }
        }
    }
}
