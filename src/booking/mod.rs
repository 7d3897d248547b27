pub mod model;
pub mod normalize;

pub use model::{Booking, BookingStatus};
pub use normalize::normalize_booking;
