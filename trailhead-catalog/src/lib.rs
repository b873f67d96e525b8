pub mod trip;
pub mod availability;

pub use trip::{NewTrip, Trip, TripError, TripStatus, TripUpdate};
pub use availability::SlotError;
