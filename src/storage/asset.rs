//! Content-addressed image assets.
//!
//! Blobs are keyed by the SHA-256 of their bytes and stored zstd-compressed
//! at `assets/<digest>.zst`. Storing the same bytes twice is a no-op.
//! Blobs are written to a temporary file and renamed into place, so a
//! reader never sees a partial blob.

use std::{fs, path::PathBuf};

use jiff::Timestamp;
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{self, ImageHost};

use super::{Result, Storage, StorageError};

const ZSTD_LEVEL: i32 = 3;

/// A stored asset, decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The path assets are served from, relative to the server root.
pub fn asset_url(digest: &str) -> String {
    format!("/api/assets/{digest}")
}

impl Storage {
    /// Stores bytes and returns their hex digest.
    pub fn put_asset(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        let digest = hex::encode(Sha256::digest(bytes));
        let path = self.asset_path(&digest);
        if !path.exists() {
            let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
            fs::write(&tmp, zstd::encode_all(bytes, ZSTD_LEVEL)?)?;
            if let Err(e) = fs::rename(&tmp, &path) {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
        }
        let size = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        let inserted = self.open_db()?.execute(
            "INSERT OR IGNORE INTO asset (digest, content_type, size, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![&digest, content_type, size, Timestamp::now().to_string()],
        )?;
        if inserted > 0 {
            info!(%digest, content_type, size, "asset stored");
        }
        Ok(digest)
    }

    pub fn get_asset(&self, digest: &str) -> Result<Asset> {
        if !is_digest(digest) {
            return Err(StorageError::AssetNotFound(digest.to_string()));
        }
        let content_type: String = self
            .open_db()?
            .query_row(
                "SELECT content_type FROM asset WHERE digest = ?1",
                [digest],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::AssetNotFound(digest.to_string()))?;
        let compressed = fs::read(self.asset_path(digest))?;
        debug!(digest, "asset loaded");
        Ok(Asset {
            content_type,
            bytes: zstd::decode_all(compressed.as_slice())?,
        })
    }

    fn asset_path(&self, digest: &str) -> PathBuf {
        self.root.join("assets").join(format!("{digest}.zst"))
    }
}

/// Lowercase hex SHA-256. Anything else could escape the assets directory.
fn is_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl ImageHost for Storage {
    fn upload_image(&self, bytes: &[u8], content_type: &str) -> store::Result<String> {
        Ok(asset_url(&self.put_asset(bytes, content_type)?))
    }
}
