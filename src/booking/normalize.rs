// dayschedule-sync/src/booking/normalize.rs
use std::collections::HashMap;
use url::Url;

use super::model::{Booking, BookingStatus, Host, Patient};
use crate::api::models::{RawBooking, id_to_string};
use crate::errors::{AppError, Result};

const DAYSCHEDULE_DOMAIN: &str = "dayschedule.com";
/// Subdomains that belong to DaySchedule itself rather than to a store.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "app", "api"];

// Intake form labels as configured on the booking page.
const Q_NAME: &str = "Name";
const Q_SURNAME: &str = "Surname";
const Q_EMAIL: &str = "Your email address";
const Q_PHONE: &str = "Mobile number";
const Q_DATE_OF_BIRTH: &str = "Date of Birth";
const Q_GENDER: &str = "Gender";
const Q_HEIGHT: &str = "Height";
const Q_WEIGHT: &str = "Weight";

/// Flattens a booking detail into the record we persist.
///
/// Fails with `MalformedRecord` when the id is missing or the status is not one
/// of confirmed/pending/canceled; callers skip such records.
pub fn normalize_booking(raw: &RawBooking) -> Result<Booking> {
    let booking_id = raw
        .booking_id
        .as_ref()
        .and_then(id_to_string)
        .ok_or_else(|| AppError::MalformedRecord("missing booking_id".to_string()))?;

    let status = raw
        .status
        .as_deref()
        .ok_or_else(|| AppError::MalformedRecord(format!("booking {} has no status", booking_id)))?
        .parse::<BookingStatus>()
        .map_err(|e| AppError::MalformedRecord(format!("booking {}: {}", booking_id, e)))?;

    let host = raw
        .host
        .as_ref()
        .map(|h| Host {
            name: non_empty(h.name.clone()),
            email: non_empty(h.email.clone()),
        })
        .unwrap_or_default();

    Ok(Booking {
        booking_id,
        store_name: raw.booking_url.as_deref().and_then(store_name_from_url),
        status,
        start_at: non_empty(raw.start_at.clone()),
        end_at: non_empty(raw.end_at.clone()),
        booking_url: non_empty(raw.booking_url.clone()),
        host,
        patient: patient_from(raw),
    })
}

fn patient_from(raw: &RawBooking) -> Patient {
    let Some(invitee) = raw.invitees.first() else {
        return Patient::default();
    };

    let answers: HashMap<&str, String> = invitee
        .questions
        .iter()
        .filter_map(|q| q.answer().map(|a| (q.label(), a.trim().to_string())))
        .filter(|(_, a)| !a.is_empty())
        .collect();
    let answer = |label: &str| answers.get(label).cloned();

    let full_name = format!(
        "{} {}",
        answer(Q_NAME).unwrap_or_default(),
        answer(Q_SURNAME).unwrap_or_default()
    );

    Patient {
        full_name: non_empty(Some(full_name.trim().to_string())),
        email: answer(Q_EMAIL).or_else(|| non_empty(invitee.email.clone())),
        phone: answer(Q_PHONE).or_else(|| non_empty(invitee.phone.clone())),
        date_of_birth: answer(Q_DATE_OF_BIRTH),
        gender: answer(Q_GENDER),
        height: answer(Q_HEIGHT),
        weight: answer(Q_WEIGHT),
    }
}

/// Derives the store slug from a booking page URL.
///
/// `https://acme.dayschedule.com/...` gives `acme`; any other URL gives its first
/// path segment.
pub fn store_name_from_url(booking_url: &str) -> Option<String> {
    let url = Url::parse(booking_url.trim()).ok()?;

    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        if let Some(sub) = host.strip_suffix(&format!(".{}", DAYSCHEDULE_DOMAIN)) {
            let label = sub.split('.').next().unwrap_or_default();
            if !label.is_empty() && !RESERVED_SUBDOMAINS.contains(&label) {
                return Some(label.to_string());
            }
        }
    }

    url.path_segments()?
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
