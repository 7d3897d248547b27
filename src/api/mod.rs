pub(crate) mod client; // HTTP calls against the DaySchedule API
pub(crate) mod models; // Raw JSON shapes returned by the API

pub use client::{BookingDetail, DayScheduleClient};
