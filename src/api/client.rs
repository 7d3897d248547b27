// dayschedule-sync/src/api/client.rs
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::models::{BookingListResponse, BookingSummary, RawBooking};
use crate::config::ApiConfig;
use crate::errors::{AppError, Result};

/// Thin client over the DaySchedule bookings endpoints.
#[derive(Debug, Clone)]
pub struct DayScheduleClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

/// Outcome of fetching a single booking. Only transport and credential problems
/// are errors; everything else is decided per booking.
#[derive(Debug)]
pub enum BookingDetail {
    Found(RawBooking),
    /// Non-success status from the detail endpoint.
    Unavailable(u16),
    /// The body was not a booking object.
    Undecodable(String),
}

impl DayScheduleClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("dayschedule-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Lists every booking summary the account can see.
    pub async fn fetch_booking_summaries(&self) -> Result<Vec<BookingSummary>> {
        let endpoint = "/bookings";
        let response = self
            .http
            .get(self.endpoint_url(&["bookings"])?)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        check_credentials(status, endpoint)?;
        if !status.is_success() {
            return Err(AppError::ApiStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body: BookingListResponse = response.json().await?;
        debug!(count = body.result.len(), "fetched booking summaries");
        Ok(body.result)
    }

    /// Fetches one booking's details. A bad status or body for a single booking is
    /// not worth failing the run over, so both come back as `Ok`.
    pub async fn fetch_booking_detail(&self, booking_id: &str) -> Result<BookingDetail> {
        let endpoint = format!("/bookings/{}", booking_id);
        let response = self
            .http
            .get(self.endpoint_url(&["bookings", booking_id])?)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        check_credentials(status, &endpoint)?;
        if !status.is_success() {
            warn!(booking_id, status = status.as_u16(), "⚠️ failed to fetch booking detail");
            return Ok(BookingDetail::Unavailable(status.as_u16()));
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<RawBooking>(&body) {
            Ok(raw) => Ok(BookingDetail::Found(raw)),
            Err(e) => Ok(BookingDetail::Undecodable(e.to_string())),
        }
    }
}

fn check_credentials(status: StatusCode, endpoint: &str) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AppError::Config(format!(
            "DaySchedule rejected the API key ({} on {})",
            status.as_u16(),
            endpoint
        )));
    }
    Ok(())
}
