//! Output formatting for CLI display.

use std::fmt::Write;

use crate::{
    draft::{DraftController, Mode, SectionKey},
    model::{ActionKind, CompassTag, Health, Journey, JourneySummary, Touchpoint},
    validate::FieldError,
};

use super::short_id;

/// One line per journey for `journey list`.
pub(super) fn format_summary(summary: &JourneySummary) -> String {
    format!(
        "{}  [{}]  NPS {:>3}  {}",
        short_id(summary.id),
        summary.status.label(),
        summary.nps_score,
        summary.title
    )
}

fn format_tags(tags: &[CompassTag]) -> String {
    tags.iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The read-only dashboard view: stages in tab order, actions split by performer.
pub(super) fn format_journey(journey: &Journey) -> String {
    let doc = &journey.document;
    let mut out = String::new();

    let _ = writeln!(out, "{}  ({})", doc.title, journey.id);
    let _ = writeln!(
        out,
        "Status: {}  NPS: {}  Sentiment: {}",
        Health::from_nps(doc.nps_score).label(),
        doc.nps_score,
        doc.customer_sentiment
    );
    let _ = writeln!(out, "Key insight: {}", doc.key_insight);
    let _ = writeln!(
        out,
        "Updated: {}",
        journey.updated_at.strftime("%Y-%m-%d %H:%M")
    );

    if !doc.performance_indicators.is_empty() {
        let _ = writeln!(out, "\nPerformance indicators:");
        for kpi in &doc.performance_indicators {
            let _ = writeln!(out, "  {:<24} {:>3}", kpi.name, kpi.value);
        }
    }

    for tab in journey.stage_tabs() {
        let _ = writeln!(out, "\n== {tab} ==");
        for stage in journey.stages_for_tab(&tab) {
            let _ = writeln!(out, "{}", stage.description);
            for tp in &stage.touchpoints {
                format_touchpoint(&mut out, tp);
            }
        }
    }

    out
}

fn format_touchpoint(out: &mut String, tp: &Touchpoint) {
    let _ = writeln!(out, "\n  {} ({}, duration {})", tp.title, tp.kind, tp.duration);
    if !tp.compass_tags.is_empty() {
        let _ = writeln!(out, "    Compass: {}", format_tags(&tp.compass_tags));
    }
    if let Some(comment) = &tp.comment {
        let _ = writeln!(out, "    Comment: {comment}");
    }
    for (kind, heading) in [
        (ActionKind::Customer, "Customer actions"),
        (ActionKind::Backoffice, "Backoffice actions"),
    ] {
        let mut actions = tp.actions_of(kind).peekable();
        if actions.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "    {heading}:");
        for action in actions {
            let _ = writeln!(out, "      - {}: {}", action.title, action.description);
            if let Some(url) = &action.image_url {
                let _ = writeln!(out, "        image: {url}");
            }
        }
    }
}

/// The editing tree, with the indices `draft set`/`add`/`remove` take.
///
/// Collapsed sections show a one-line summary unless `all` is set.
pub(super) fn format_draft(controller: &DraftController, all: bool) -> String {
    let doc = controller.draft();
    let open = |key: SectionKey| all || controller.is_expanded(key);
    let mut out = String::new();

    match controller.mode() {
        Mode::Create => {
            let _ = writeln!(out, "New journey");
        }
        Mode::Edit(id) => {
            let _ = writeln!(out, "Editing journey {id}");
        }
    }
    let _ = writeln!(out, "title: {}", doc.title);
    let _ = writeln!(out, "npsScore: {}", doc.nps_score);
    let _ = writeln!(out, "customerSentiment: {}", doc.customer_sentiment);
    let _ = writeln!(out, "keyInsight: {}", doc.key_insight);

    let _ = writeln!(out, "performanceIndicators:");
    for (i, kpi) in doc.performance_indicators.iter().enumerate() {
        let _ = writeln!(out, "  [{i}] {} = {}", kpi.name, kpi.value);
    }

    let _ = writeln!(out, "stages:");
    for (s, stage) in doc.stages.iter().enumerate() {
        let _ = write!(out, "  [{s}] {}", stage.name);
        if !open(SectionKey::Stage { stage: s }) {
            let _ = writeln!(out, "  (+{} touchpoints)", stage.touchpoints.len());
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "      description: {}", stage.description);

        for (t, tp) in stage.touchpoints.iter().enumerate() {
            let _ = write!(out, "      [{t}] {} ({})", tp.title, tp.kind);
            if !open(SectionKey::Touchpoint {
                stage: s,
                touchpoint: t,
            }) {
                let _ = writeln!(out, "  (+{} actions)", tp.actions.len());
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "          duration: {}", tp.duration);
            if let Some(comment) = &tp.comment {
                let _ = writeln!(out, "          comment: {comment}");
            }
            let tags: Vec<&str> = tp.compass_tags.iter().map(|t| t.as_str()).collect();
            let _ = writeln!(out, "          compassTags: [{}]", tags.join(", "));

            for (a, action) in tp.actions.iter().enumerate() {
                let _ = write!(out, "          [{a}] {} {}", action.kind.as_str(), action.title);
                if !open(SectionKey::Action {
                    stage: s,
                    touchpoint: t,
                    action: a,
                }) {
                    let _ = writeln!(out);
                    continue;
                }
                let _ = writeln!(out);
                let _ = writeln!(out, "              description: {}", action.description);
                if let Some(url) = &action.image_url {
                    let _ = writeln!(out, "              imageUrl: {url}");
                }
            }
        }
    }

    out
}

pub(super) fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use uuid::Uuid;

    use crate::{
        draft::FieldPath,
        validate::{ErrorKind, tests::valid_document},
    };

    fn journey() -> Journey {
        Journey {
            id: Uuid::new_v4(),
            document: valid_document(),
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn summary_line_carries_health_label() {
        let j = journey();
        let line = format_summary(&j.summary());
        assert!(line.starts_with(&short_id(j.id)));
        assert!(line.contains(j.summary().status.label()));
        assert!(line.ends_with(&j.document.title));
    }

    #[test]
    fn journey_view_lists_every_stage() {
        let j = journey();
        let text = format_journey(&j);
        for stage in &j.document.stages {
            assert!(text.contains(&stage.description), "{text}");
        }
        assert!(text.contains("Customer actions"));
    }

    #[test]
    fn journey_view_keeps_stages_that_share_a_name() {
        let mut j = journey();
        let mut second = j.document.stages[0].clone();
        second.description = "Customer compares plans a second time".into();
        j.document.stages.push(second);

        let text = format_journey(&j);

        assert_eq!(text.matches("== Awareness ==").count(), 1, "{text}");
        assert!(text.contains("Customer discovers the product"), "{text}");
        assert!(text.contains("Customer compares plans a second time"), "{text}");
    }

    #[test]
    fn draft_tree_collapses_closed_sections() {
        let mut controller = DraftController::new();
        controller
            .set_field("stages[0].name".parse::<FieldPath>().unwrap(), "Quote")
            .unwrap();

        let collapsed = format_draft(&controller, false);
        assert!(collapsed.contains("[0] Quote  (+1 touchpoints)"), "{collapsed}");

        let expanded = format_draft(&controller, true);
        assert!(expanded.contains("description:"), "{expanded}");
        assert!(expanded.contains("[0] customer"), "{expanded}");
    }

    #[test]
    fn errors_are_listed_one_per_line() {
        let errors = vec![
            FieldError {
                path: "title".into(),
                kind: ErrorKind::Length,
                message: "Title is required".into(),
            },
            FieldError {
                path: "npsScore".into(),
                kind: ErrorKind::Range,
                message: "Must be between 0 and 100".into(),
            },
        ];
        assert_eq!(
            format_errors(&errors),
            "  title: Title is required\n  npsScore: Must be between 0 and 100"
        );
    }
}
