//! Draft commands: build or edit a journey across invocations, then submit it.
//!
//! The working draft lives in `draft.json` under the data directory, even
//! when journeys themselves go to a remote server.

use std::{fs, path::Path};

use clap::Subcommand;

use crate::{
    draft::{DraftController, FieldPath, Mode, SectionKey, SubmitError},
    model::CompassTag,
    storage::Storage,
    store::StoreError,
};

use super::{
    Backend,
    format::{format_draft, format_errors},
    resolve_journey, short_id,
};

#[derive(Debug, Subcommand)]
pub enum DraftCommand {
    /// Start a blank draft.
    New {
        /// Discard a draft already in progress.
        #[arg(long)]
        force: bool,
    },

    /// Load a stored journey into the draft for editing.
    Edit {
        /// Journey ID: full UUID or unambiguous prefix (e.g. `a3b`).
        journey: String,

        /// Discard a draft already in progress.
        #[arg(long)]
        force: bool,
    },

    /// Print the draft tree with the indices other commands take.
    Show {
        /// Expand every section.
        #[arg(long)]
        all: bool,

        /// Print the raw document as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate the draft and list every problem.
    Check,

    /// Validate and store the draft. Prints the journey ID.
    Submit,

    /// Throw the draft away.
    Discard,

    /// Set a field, e.g. `title`, `npsScore`, or
    /// `stages[0].touchpoints[1].actions[0].description`.
    Set { path: String, value: String },

    /// Append an indicator, stage, touchpoint, or action. Prints its index.
    Add {
        #[command(subcommand)]
        target: AddTarget,
    },

    /// Remove an indicator, stage, touchpoint, or action.
    Remove {
        #[command(subcommand)]
        target: RemoveTarget,
    },

    /// Toggle a compass tag on a touchpoint.
    Tag {
        stage: usize,
        touchpoint: usize,
        /// cognitive, orchestrated, memorable, perceived, activate, social, situational
        tag: String,
    },

    /// Upload an image file and attach it to an action.
    Image {
        stage: usize,
        touchpoint: usize,
        action: usize,
        file: String,
    },

    /// Open or close a section of the tree, e.g. `stage-0-touchpoint-1`.
    Toggle { section: String },
}

#[derive(Debug, Subcommand)]
pub enum AddTarget {
    Indicator,
    Stage,
    Touchpoint { stage: usize },
    Action { stage: usize, touchpoint: usize },
}

#[derive(Debug, Subcommand)]
pub enum RemoveTarget {
    Indicator {
        index: usize,
    },
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

pub(super) fn run(command: DraftCommand, backend: &Backend, storage: &Storage) -> Result<(), String> {
    match command {
        DraftCommand::New { force } => cmd_new(storage, force),
        DraftCommand::Edit { journey, force } => cmd_edit(backend, storage, &journey, force),
        DraftCommand::Show { all, json } => cmd_show(storage, all, json),
        DraftCommand::Check => cmd_check(storage),
        DraftCommand::Submit => cmd_submit(backend, storage),
        DraftCommand::Discard => storage
            .clear_draft()
            .map_err(|e| format!("failed to discard draft: {e}")),
        DraftCommand::Set { path, value } => {
            let path: FieldPath = path.parse()?;
            update(storage, |draft| {
                draft.set_field(path, &value).map_err(|e| e.to_string())
            })
        }
        DraftCommand::Add { target } => {
            let index = update(storage, |draft| add(draft, target))?;
            println!("{index}");
            Ok(())
        }
        DraftCommand::Remove { target } => update(storage, |draft| remove(draft, target)),
        DraftCommand::Tag {
            stage,
            touchpoint,
            tag,
        } => {
            let tag: CompassTag = tag.parse()?;
            let on = update(storage, |draft| {
                draft
                    .toggle_compass_tag(stage, touchpoint, tag)
                    .map_err(|e| e.to_string())
            })?;
            eprintln!("{} {}", tag.label(), if on { "on" } else { "off" });
            Ok(())
        }
        DraftCommand::Image {
            stage,
            touchpoint,
            action,
            file,
        } => cmd_image(backend, storage, (stage, touchpoint, action), Path::new(&file)),
        DraftCommand::Toggle { section } => {
            let key: SectionKey = section.parse()?;
            let open = update(storage, |draft| Ok(draft.toggle_section(key)))?;
            eprintln!("{key} {}", if open { "expanded" } else { "collapsed" });
            Ok(())
        }
    }
}

fn load(storage: &Storage) -> Result<DraftController, String> {
    storage
        .load_draft()
        .map_err(|e| format!("failed to load draft: {e}"))?
        .ok_or_else(|| {
            "no draft in progress; start one with `compass draft new` or `compass draft edit <journey>`"
                .to_string()
        })
}

fn save(storage: &Storage, draft: &DraftController) -> Result<(), String> {
    storage
        .save_draft(draft)
        .map_err(|e| format!("failed to save draft: {e}"))
}

/// Loads the draft, applies `f`, and saves it only if `f` succeeds.
fn update<T>(
    storage: &Storage,
    f: impl FnOnce(&mut DraftController) -> Result<T, String>,
) -> Result<T, String> {
    let mut draft = load(storage)?;
    let out = f(&mut draft)?;
    save(storage, &draft)?;
    Ok(out)
}

/// Fails if a draft is in progress and `force` isn't set.
fn ensure_replaceable(storage: &Storage, force: bool) -> Result<Option<DraftController>, String> {
    let existing = storage
        .load_draft()
        .map_err(|e| format!("failed to load draft: {e}"))?;
    if existing.is_some() && !force {
        return Err("a draft is already in progress; pass --force to discard it".into());
    }
    Ok(existing)
}

fn cmd_new(storage: &Storage, force: bool) -> Result<(), String> {
    ensure_replaceable(storage, force)?;
    save(storage, &DraftController::new())?;
    eprintln!("Started a new draft");
    Ok(())
}

fn cmd_edit(backend: &Backend, storage: &Storage, reference: &str, force: bool) -> Result<(), String> {
    backend.require_mutation()?;
    let mut draft = ensure_replaceable(storage, force)?.unwrap_or_default();

    let ticket = draft.begin_load();
    let journey = resolve_journey(backend.store(), reference)?;
    let id = journey.id;
    draft.finish_load(ticket, journey);

    save(storage, &draft)?;
    eprintln!("Editing journey {}", short_id(id));
    Ok(())
}

fn cmd_show(storage: &Storage, all: bool, json: bool) -> Result<(), String> {
    let draft = load(storage)?;
    if json {
        let out = serde_json::to_string_pretty(draft.draft())
            .map_err(|e| format!("failed to serialize draft: {e}"))?;
        println!("{out}");
    } else {
        print!("{}", format_draft(&draft, all));
    }
    Ok(())
}

fn cmd_check(storage: &Storage) -> Result<(), String> {
    let draft = load(storage)?;
    match draft.validate() {
        Ok(_) => {
            println!("Draft is ready to submit");
            Ok(())
        }
        Err(errors) => Err(format!(
            "draft has {} problem(s):\n{}",
            errors.len(),
            format_errors(&errors)
        )),
    }
}

fn cmd_submit(backend: &Backend, storage: &Storage) -> Result<(), String> {
    backend.require_mutation()?;
    let mut draft = load(storage)?;

    let journey = draft.submit(backend.store()).map_err(|e| match e {
        SubmitError::Invalid(errors) | SubmitError::Store(StoreError::Validation(errors)) => {
            format!(
                "draft has {} problem(s):\n{}",
                errors.len(),
                format_errors(&errors)
            )
        }
        SubmitError::Store(e) => format!("failed to submit draft: {e}"),
    })?;

    match draft.mode() {
        Mode::Create => storage
            .clear_draft()
            .map_err(|e| format!("journey stored but failed to clear draft: {e}"))?,
        Mode::Edit(_) => save(storage, &draft)?,
    }
    println!("{}", journey.id);
    Ok(())
}

fn cmd_image(
    backend: &Backend,
    storage: &Storage,
    (stage, touchpoint, action): (usize, usize, usize),
    file: &Path,
) -> Result<(), String> {
    backend.require_mutation()?;
    let content_type = image_content_type(file)?;
    let bytes = fs::read(file).map_err(|e| format!("failed to read {}: {e}", file.display()))?;

    let url = update(storage, |draft| {
        draft
            .upload_image(backend.images(), stage, touchpoint, action, &bytes, content_type)
            .map_err(|e| e.to_string())
    })?;
    println!("{url}");
    Ok(())
}

fn image_content_type(file: &Path) -> Result<&'static str, String> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(format!(
            "{} is not a supported image (png, jpg, gif, webp)",
            file.display()
        )),
    }
}

fn add(draft: &mut DraftController, target: AddTarget) -> Result<usize, String> {
    match target {
        AddTarget::Indicator => Ok(draft.add_performance_indicator()),
        AddTarget::Stage => Ok(draft.add_stage()),
        AddTarget::Touchpoint { stage } => draft.add_touchpoint(stage),
        AddTarget::Action { stage, touchpoint } => draft.add_action(stage, touchpoint),
    }
    .map_err(|e| e.to_string())
}

fn remove(draft: &mut DraftController, target: RemoveTarget) -> Result<(), String> {
    match target {
        RemoveTarget::Indicator { index } => draft.remove_performance_indicator(index),
        RemoveTarget::Stage { stage } => draft.remove_stage(stage),
        RemoveTarget::Touchpoint { stage, touchpoint } => {
            draft.remove_touchpoint(stage, touchpoint)
        }
        RemoveTarget::Action {
            stage,
            touchpoint,
            action,
        } => draft.remove_action(stage, touchpoint, action),
    }
    .map_err(|e| {
        if e.is_guard() {
            e.to_string()
        } else {
            format!("failed to remove: {e}")
        }
    })
}
