//! Collaborator contracts: where journeys are persisted and images are hosted.
//!
//! The draft controller and the CLI only ever talk to these traits.
//! [`Storage`](crate::storage::Storage) implements them against the local
//! SQLite database; [`Client`](crate::client::Client) implements them over HTTP.

use uuid::Uuid;

use crate::{
    model::{Journey, JourneySummary},
    validate::{FieldError, ValidatedJourney},
};

/// Errors a journey store can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store re-validated the document and rejected it.
    #[error("journey rejected: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("journey not found: {0}")]
    NotFound(Uuid),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Transport(String),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Persistence of whole journeys. Nested entities are never written on their own.
pub trait JourneyStore {
    /// Persists a new journey, assigning its id and timestamps.
    fn create_journey(&self, journey: &ValidatedJourney) -> Result<Journey>;

    /// Replaces the document of an existing journey, bumping `updated_at`.
    fn update_journey(&self, id: Uuid, journey: &ValidatedJourney) -> Result<Journey>;

    fn get_journey(&self, id: Uuid) -> Result<Journey>;

    /// All journeys in creation order.
    fn list_journeys(&self) -> Result<Vec<JourneySummary>>;

    fn delete_journey(&self, id: Uuid) -> Result<()>;
}

/// An external host for action images.
pub trait ImageHost {
    /// Uploads image bytes, returning the URL they can be fetched from.
    fn upload_image(&self, bytes: &[u8], content_type: &str) -> Result<String>;
}

fn summarize(errors: &[FieldError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
