//! The CLI's working draft, kept between invocations.
//!
//! Stored as `draft.json` in the storage root. A missing file means there is
//! no draft in progress; clearing removes the file.

use std::{fs, io, path::PathBuf};

use crate::draft::DraftController;

use super::{Result, Storage};

impl Storage {
    pub fn save_draft(&self, draft: &DraftController) -> Result<()> {
        let json = serde_json::to_string_pretty(draft)?;
        fs::write(self.draft_path(), json)?;
        Ok(())
    }

    /// Loads the saved draft, or `None` if there isn't one.
    pub fn load_draft(&self) -> Result<Option<DraftController>> {
        match fs::read_to_string(self.draft_path()) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: does nothing if there is no saved draft.
    pub fn clear_draft(&self) -> Result<()> {
        match fs::remove_file(self.draft_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn draft_path(&self) -> PathBuf {
        self.root.join("draft.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::tests::test_storage;

    #[test]
    fn missing_draft_is_none() {
        let (_dir, storage) = test_storage();
        assert!(storage.load_draft().unwrap().is_none());
    }

    #[test]
    fn save_load_clear() {
        let (_dir, storage) = test_storage();
        let mut draft = DraftController::new();
        draft.add_stage();

        storage.save_draft(&draft).unwrap();
        assert_eq!(storage.load_draft().unwrap(), Some(draft));

        storage.clear_draft().unwrap();
        assert!(storage.load_draft().unwrap().is_none());
        storage.clear_draft().unwrap();
    }

    #[test]
    fn corrupt_draft_is_an_error() {
        let (dir, storage) = test_storage();
        fs::write(dir.path().join("data/draft.json"), "{not json").unwrap();
        assert!(storage.load_draft().is_err());
    }
}
