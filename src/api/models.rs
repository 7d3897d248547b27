// dayschedule-sync/src/api/models.rs
//! Wire shapes of the DaySchedule bookings API. Everything is optional because
//! the API omits fields freely; normalization decides what is required.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListResponse {
    #[serde(default)]
    pub result: Vec<BookingSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingSummary {
    /// String or number depending on the account.
    #[serde(default)]
    pub booking_id: Option<Value>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub updated_at: Option<String>,
}

impl BookingSummary {
    pub fn id(&self) -> Option<String> {
        self.booking_id.as_ref().and_then(id_to_string)
    }

    /// `None` when absent or not RFC 3339.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBooking {
    #[serde(default)]
    pub booking_id: Option<Value>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub start_at: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub end_at: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub host: Option<RawHost>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invitees: Vec<RawInvitee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHost {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInvitee {
    #[serde(default, deserialize_with = "scalar_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
    #[serde(default, deserialize_with = "scalar_string")]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl RawQuestion {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default().trim()
    }

    /// Answers come back as strings, numbers or booleans; arrays and objects are ignored.
    pub fn answer(&self) -> Option<String> {
        scalar_to_string(&self.value)
    }
}

pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text fields sometimes arrive as numbers or `null`.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(&Value::deserialize(deserializer)?))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_ids_accept_strings_and_numbers() -> anyhow::Result<()> {
        let list: BookingListResponse = serde_json::from_value(json!({
            "result": [
                { "booking_id": "abc-1" },
                { "booking_id": 42 },
                { "booking_id": "" },
                { "status": "confirmed" }
            ]
        }))?;
        let ids: Vec<Option<String>> = list.result.iter().map(BookingSummary::id).collect();
        assert_eq!(
            ids,
            vec![Some("abc-1".to_string()), Some("42".to_string()), None, None]
        );
        Ok(())
    }

    #[test]
    fn missing_result_is_empty_list() -> anyhow::Result<()> {
        let list: BookingListResponse = serde_json::from_value(json!({ "status": "ok" }))?;
        assert!(list.result.is_empty());
        Ok(())
    }

    #[test]
    fn updated_at_parses_rfc3339_only() {
        let summary = BookingSummary {
            updated_at: Some("2025-03-01T10:00:00+02:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            summary.updated_at().map(|d| d.to_rfc3339()),
            Some("2025-03-01T08:00:00+00:00".to_string())
        );

        let bad = BookingSummary {
            updated_at: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert_eq!(bad.updated_at(), None);
    }

    #[test]
    fn detail_tolerates_nulls_and_numeric_text() -> anyhow::Result<()> {
        let raw: RawBooking = serde_json::from_value(json!({
            "booking_id": 7,
            "status": null,
            "start_at": 1740823200,
            "end_at": null,
            "host": null,
            "invitees": [
                { "email": null, "phone": 5551234, "questions": null },
                { "questions": [{ "label": null, "value": "x" }, { "label": "Height", "value": 170 }] }
            ]
        }))?;
        assert_eq!(raw.status, None);
        assert_eq!(raw.start_at.as_deref(), Some("1740823200"));
        assert_eq!(raw.invitees[0].phone.as_deref(), Some("5551234"));
        assert!(raw.invitees[0].questions.is_empty());
        let questions = &raw.invitees[1].questions;
        assert_eq!(questions[0].label(), "");
        assert_eq!(questions[1].label(), "Height");
        assert_eq!(questions[1].answer().as_deref(), Some("170"));

        let no_invitees: RawBooking = serde_json::from_value(json!({ "invitees": null }))?;
        assert!(no_invitees.invitees.is_empty());
        Ok(())
    }

    #[test]
    fn structurally_wrong_detail_still_fails_to_decode() {
        assert!(serde_json::from_value::<RawBooking>(json!({ "invitees": "none" })).is_err());
        assert!(serde_json::from_value::<RawBooking>(json!(["not", "an", "object"])).is_err());
    }
}
