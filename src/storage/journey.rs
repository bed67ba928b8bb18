//! Journey storage: whole documents in, whole documents out.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    model::{Journey, JourneyDocument, JourneySummary},
    store::{self, JourneyStore, StoreError},
    validate::ValidatedJourney,
};

use super::{Result, Storage, StorageError, parse_id, parse_timestamp};

impl Storage {
    /// Inserts a new journey with a fresh id and timestamps.
    pub fn insert_journey(&self, document: &JourneyDocument) -> Result<Journey> {
        let now = Timestamp::now();
        let journey = Journey {
            id: Uuid::new_v4(),
            document: document.clone(),
            created_at: now,
            updated_at: now,
        };
        self.open_db()?.execute(
            "INSERT INTO journey (id, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                journey.id.to_string(),
                serde_json::to_string(&journey.document)?,
                now.to_string(),
                now.to_string(),
            ],
        )?;
        info!(id = %journey.id, title = %journey.document.title, "journey stored");
        Ok(journey)
    }

    /// Replaces the document of an existing journey.
    pub fn replace_journey(&self, id: Uuid, document: &JourneyDocument) -> Result<Journey> {
        let conn = self.open_db()?;
        let rows = conn.execute(
            "UPDATE journey SET document = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![
                serde_json::to_string(document)?,
                Timestamp::now().to_string(),
                id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::JourneyNotFound(id));
        }
        info!(%id, "journey replaced");
        load_row(&conn, id)
    }

    pub fn load_journey(&self, id: Uuid) -> Result<Journey> {
        debug!(%id, "loading journey");
        load_row(&self.open_db()?, id)
    }

    /// All journeys in insertion order.
    pub fn load_journeys(&self) -> Result<Vec<Journey>> {
        let conn = self.open_db()?;
        let mut stmt = conn.prepare(
            "SELECT id, document, created_at, updated_at FROM journey ORDER BY seq",
        )?;
        let rows = stmt.query_map([], read_columns)?;
        let mut journeys = Vec::new();
        for row in rows {
            journeys.push(into_journey(row?)?);
        }
        debug!(count = journeys.len(), "loaded journeys");
        Ok(journeys)
    }

    pub fn remove_journey(&self, id: Uuid) -> Result<()> {
        let rows = self
            .open_db()?
            .execute("DELETE FROM journey WHERE id = ?1", [id.to_string()])?;
        if rows == 0 {
            return Err(StorageError::JourneyNotFound(id));
        }
        info!(%id, "journey removed");
        Ok(())
    }
}

type Columns = (String, String, String, String);

fn read_columns(row: &Row<'_>) -> rusqlite::Result<Columns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn load_row(conn: &Connection, id: Uuid) -> Result<Journey> {
    let columns = conn
        .query_row(
            "SELECT id, document, created_at, updated_at FROM journey WHERE id = ?1",
            [id.to_string()],
            read_columns,
        )
        .optional()?
        .ok_or(StorageError::JourneyNotFound(id))?;
    into_journey(columns)
}

fn into_journey((id, document, created_at, updated_at): Columns) -> Result<Journey> {
    Ok(Journey {
        id: parse_id("journey id", &id)?,
        document: serde_json::from_str(&document)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::JourneyNotFound(id) => Self::NotFound(id),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl JourneyStore for Storage {
    fn create_journey(&self, journey: &ValidatedJourney) -> store::Result<Journey> {
        Ok(self.insert_journey(journey.document())?)
    }

    fn update_journey(&self, id: Uuid, journey: &ValidatedJourney) -> store::Result<Journey> {
        Ok(self.replace_journey(id, journey.document())?)
    }

    fn get_journey(&self, id: Uuid) -> store::Result<Journey> {
        Ok(self.load_journey(id)?)
    }

    fn list_journeys(&self) -> store::Result<Vec<JourneySummary>> {
        Ok(self.load_journeys()?.iter().map(Journey::summary).collect())
    }

    fn delete_journey(&self, id: Uuid) -> store::Result<()> {
        Ok(self.remove_journey(id)?)
    }
}
