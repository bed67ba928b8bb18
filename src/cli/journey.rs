//! Journey commands: list, show, delete, validate.

use std::{fs, path::Path};

use clap::Subcommand;
use serde_json::Value;

use crate::{store::JourneyStore, validate};

use super::{
    Backend,
    format::{format_errors, format_journey, format_summary},
    resolve_journey, short_id,
};

#[derive(Debug, Subcommand)]
pub enum JourneyCommand {
    /// List stored journeys, oldest first.
    List {
        /// Print the summaries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one journey in full.
    Show {
        /// Journey ID: full UUID or unambiguous prefix (e.g. `a3b`).
        journey: String,

        /// Print the journey as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a journey. Admins only.
    Delete {
        /// Journey ID: full UUID or unambiguous prefix.
        journey: String,
    },

    /// Check a journey JSON file without storing it.
    Validate {
        /// Path to a journey document.
        file: String,
    },
}

pub(super) fn run(command: JourneyCommand, backend: &Backend) -> Result<(), String> {
    let store = backend.store();
    match command {
        JourneyCommand::List { json } => cmd_list(store, json),
        JourneyCommand::Show { journey, json } => cmd_show(store, &journey, json),
        JourneyCommand::Delete { journey } => {
            backend.require_mutation()?;
            cmd_delete(store, &journey)
        }
        JourneyCommand::Validate { file } => cmd_validate(Path::new(&file)),
    }
}

fn cmd_list(store: &dyn JourneyStore, json: bool) -> Result<(), String> {
    let summaries = store
        .list_journeys()
        .map_err(|e| format!("failed to list journeys: {e}"))?;

    if json {
        let out = serde_json::to_string_pretty(&summaries)
            .map_err(|e| format!("failed to serialize journeys: {e}"))?;
        println!("{out}");
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No journeys");
        return Ok(());
    }
    for summary in &summaries {
        println!("{}", format_summary(summary));
    }
    Ok(())
}

fn cmd_show(store: &dyn JourneyStore, reference: &str, json: bool) -> Result<(), String> {
    let journey = resolve_journey(store, reference)?;
    if json {
        let out = serde_json::to_string_pretty(&journey)
            .map_err(|e| format!("failed to serialize journey: {e}"))?;
        println!("{out}");
    } else {
        print!("{}", format_journey(&journey));
    }
    Ok(())
}

fn cmd_delete(store: &dyn JourneyStore, reference: &str) -> Result<(), String> {
    let journey = resolve_journey(store, reference)?;
    store
        .delete_journey(journey.id)
        .map_err(|e| format!("failed to delete journey: {e}"))?;
    eprintln!("Journey {} deleted", short_id(journey.id));
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("{} is not valid JSON: {e}", file.display()))?;

    match validate::validate_json(&value) {
        Ok(_) => {
            println!("{} is a valid journey", file.display());
            Ok(())
        }
        Err(errors) => Err(format!(
            "{} failed validation ({} errors):\n{}",
            file.display(),
            errors.len(),
            format_errors(&errors)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::{storage::tests::test_storage, validate::tests::valid_document};

    #[test]
    fn delete_removes_the_resolved_journey() {
        let (_dir, storage) = test_storage();
        let validated = validate::validate(&valid_document()).unwrap();
        let journey = storage.create_journey(&validated).unwrap();

        cmd_delete(&storage, &short_id(journey.id)).unwrap();

        assert!(storage.list_journeys().unwrap().is_empty());
    }

    #[test]
    fn validate_accepts_a_good_file_and_lists_errors_for_a_bad_one() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::write(&good, serde_json::to_string(&valid_document()).unwrap()).unwrap();
        fs::write(&bad, r#"{"title": "", "stages": []}"#).unwrap();

        assert!(cmd_validate(&good).is_ok());
        let err = cmd_validate(&bad).unwrap_err();
        assert!(err.contains("title"), "{err}");
        assert!(err.contains("stages"), "{err}");
    }

    #[test]
    fn validate_rejects_non_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "not json").unwrap();
        assert!(cmd_validate(&path).unwrap_err().contains("not valid JSON"));
    }
}
