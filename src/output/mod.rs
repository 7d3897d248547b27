// dayschedule-sync/src/output/mod.rs
//! The output file and its sync-state sidecar.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::booking::Booking;

/// Bookings keyed by id, in output order.
pub type BookingSet = IndexMap<String, Booking>;

/// Loads the current output file. A missing file is an empty set; a file that
/// fails to parse is an error so an incremental run never clobbers it.
pub fn load_bookings(path: &Path) -> Result<BookingSet> {
    if !path.exists() {
        debug!(path = %path.display(), "output file does not exist yet");
        return Ok(BookingSet::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read output file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(BookingSet::new());
    }
    let bookings: Vec<Booking> = serde_json::from_str(&content).with_context(|| {
        format!(
            "Output file {} is not a valid booking list; refusing to merge into it",
            path.display()
        )
    })?;

    let mut set = BookingSet::with_capacity(bookings.len());
    for booking in bookings {
        set.insert(booking.booking_id.clone(), booking);
    }
    Ok(set)
}

/// Writes the collection as a pretty JSON array, replacing the file atomically.
pub fn write_bookings(path: &Path, bookings: &BookingSet) -> Result<()> {
    let records: Vec<&Booking> = bookings.values().collect();
    let mut json = serde_json::to_vec_pretty(&records).context("Failed to serialize bookings")?;
    json.push(b'\n');
    write_atomically(path, &json)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_successful_sync: Option<DateTime<Utc>>,
}

impl SyncState {
    /// A missing or unreadable state file just means "never synced".
    pub fn load(path: &Path) -> SyncState {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self).context("Failed to serialize sync state")?;
        json.push(b'\n');
        write_atomically(path, &json)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
