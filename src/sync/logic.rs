// dayschedule-sync/src/sync/logic.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::api::{BookingDetail, DayScheduleClient};
use crate::api::models::BookingSummary;
use crate::booking::{BookingStatus, normalize_booking};
use crate::config::{AppConfig, SyncMode, SyncOptions};
use crate::errors::AppError;
use crate::output::{self, BookingSet, SyncState};

const PROGRESS_EVERY: usize = 10;

/// What a single run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub listed: usize,
    pub skipped_known: usize,
    pub skipped_missing_id: usize,
    pub processed: usize,
    pub failed_details: usize,
    pub skipped_malformed: usize,
    pub fetched: usize,
    pub written: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub canceled: usize,
}

/// Which summaries a run should fetch details for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selection {
    pub ids: Vec<String>,
    pub skipped_known: usize,
    pub skipped_missing_id: usize,
}

/// Orchestrates one sync run:
/// 1. Loads what we already have (incremental only) and the last sync time.
/// 2. Lists booking summaries and picks the ones to process.
/// 3. Fetches and normalizes each booking's details.
/// 4. Merges into the known set and writes the output file.
/// 5. Records the sync time unless running in test mode.
pub async fn perform_sync_orchestration(
    client: &DayScheduleClient,
    app_config: &AppConfig,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let started_at = Utc::now();
    info!(
        mode = %options.mode,
        limit = ?options.limit,
        force = options.force,
        test_mode = options.test_mode,
        "🔄 starting DaySchedule sync"
    );

    let existing = match options.mode {
        SyncMode::Incremental => output::load_bookings(&app_config.output_file)?,
        SyncMode::Full => BookingSet::new(),
    };
    let state = SyncState::load(&app_config.state_file);

    let summaries = client
        .fetch_booking_summaries()
        .await
        .context("Failed to fetch booking summaries")?;
    info!("📦 {} bookings found", summaries.len());

    let selection = select_candidates(&summaries, &existing, options, state.last_successful_sync);
    let mut report = SyncReport {
        listed: summaries.len(),
        skipped_known: selection.skipped_known,
        skipped_missing_id: selection.skipped_missing_id,
        ..Default::default()
    };

    let total = selection.ids.len();
    let mut fetched = BookingSet::with_capacity(total);
    for (idx, booking_id) in selection.ids.iter().enumerate() {
        if idx > 0 && !app_config.api.request_delay.is_zero() {
            tokio::time::sleep(app_config.api.request_delay).await;
        }
        report.processed += 1;

        let detail = client
            .fetch_booking_detail(booking_id)
            .await
            .with_context(|| format!("Failed to fetch booking {}", booking_id))?;

        let normalized = match detail {
            BookingDetail::Unavailable(status) => {
                debug!(booking_id = %booking_id, status, "booking detail unavailable");
                None
            }
            BookingDetail::Undecodable(reason) => Some(Err(AppError::MalformedRecord(reason))),
            BookingDetail::Found(raw) => Some(normalize_booking(&raw)),
        };
        match normalized {
            None => report.failed_details += 1,
            Some(Ok(booking)) => {
                debug!(booking_id = %booking.booking_id, status = %booking.status, "normalized booking");
                fetched.insert(booking.booking_id.clone(), booking);
            }
            Some(Err(e)) => {
                warn!(booking_id = %booking_id, error = %e, "skipping malformed booking");
                report.skipped_malformed += 1;
            }
        }

        if (idx + 1) % PROGRESS_EVERY == 0 || idx + 1 == total {
            info!(processed = idx + 1, total, "processing bookings");
        }
    }
    report.fetched = fetched.len();

    let merged = merge_bookings(existing, fetched, options.mode);
    output::write_bookings(&app_config.output_file, &merged)?;
    report.written = merged.len();
    for booking in merged.values() {
        match booking.status {
            BookingStatus::Confirmed => report.confirmed += 1,
            BookingStatus::Pending => report.pending += 1,
            BookingStatus::Canceled => report.canceled += 1,
        }
    }

    if options.test_mode {
        info!("🧪 test mode: sync state left unchanged");
    } else {
        SyncState {
            last_successful_sync: Some(started_at),
        }
        .save(&app_config.state_file)?;
    }

    info!(
        listed = report.listed,
        skipped_known = report.skipped_known,
        missing_id = report.skipped_missing_id,
        fetched = report.fetched,
        confirmed = report.confirmed,
        pending = report.pending,
        canceled = report.canceled,
        failed = report.failed_details,
        malformed = report.skipped_malformed,
        "📊 summary"
    );
    info!(
        "✅ synced {} bookings to {}",
        report.written,
        app_config.output_file.display()
    );
    Ok(report)
}

/// Picks booking ids to fetch, in upstream order, dropping duplicates.
///
/// Full runs take everything. Incremental runs take ids we don't have yet, ids
/// updated after `last_sync`, or everything when forced. The limit applies last.
pub(crate) fn select_candidates(
    summaries: &[BookingSummary],
    known: &BookingSet,
    options: &SyncOptions,
    last_sync: Option<DateTime<Utc>>,
) -> Selection {
    let mut selection = Selection::default();
    let mut seen = HashSet::new();

    for summary in summaries {
        let Some(id) = summary.id() else {
            warn!("skipping booking summary without booking_id");
            selection.skipped_missing_id += 1;
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }

        let wanted = match options.mode {
            SyncMode::Full => true,
            SyncMode::Incremental => {
                options.force
                    || !known.contains_key(&id)
                    || changed_since(summary, last_sync)
            }
        };
        if wanted {
            selection.ids.push(id);
        } else {
            selection.skipped_known += 1;
        }
    }

    if let Some(limit) = options.limit {
        if selection.ids.len() > limit {
            debug!(limit, available = selection.ids.len(), "applying limit");
            selection.ids.truncate(limit);
        }
    }
    selection
}

fn changed_since(summary: &BookingSummary, last_sync: Option<DateTime<Utc>>) -> bool {
    match (summary.updated_at(), last_sync) {
        (Some(updated), Some(last)) => updated > last,
        _ => false,
    }
}

/// Full runs supersede what was there; incremental runs update in place and
/// append new ids.
pub(crate) fn merge_bookings(mut existing: BookingSet, fetched: BookingSet, mode: SyncMode) -> BookingSet {
    match mode {
        SyncMode::Full => fetched,
        SyncMode::Incremental => {
            for (id, booking) in fetched {
                existing.insert(id, booking);
            }
            existing
        }
    }
}
