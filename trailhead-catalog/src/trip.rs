use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Trip status; only `BookingOpen` admits new registrations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    BookingOpen,
    ComingSoon,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::BookingOpen => "BOOKING_OPEN",
            TripStatus::ComingSoon => "COMING_SOON",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn accepts_bookings(&self) -> bool {
        matches!(self, TripStatus::BookingOpen)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKING_OPEN" => Ok(TripStatus::BookingOpen),
            "COMING_SOON" => Ok(TripStatus::ComingSoon),
            "COMPLETED" => Ok(TripStatus::Completed),
            "CANCELLED" => Ok(TripStatus::Cancelled),
            other => Err(TripError::UnknownStatus(other.to_string())),
        }
    }
}

/// A bookable trip in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    pub total_slots: i32,
    pub booked_slots: i32,
    /// Fee in the major currency unit
    pub booking_fee: i64,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(new_trip: NewTrip) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new_trip.title.trim().to_string(),
            total_slots: new_trip.total_slots,
            booked_slots: 0,
            booking_fee: new_trip.booking_fee,
            status: new_trip.status.unwrap_or(TripStatus::ComingSoon),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an admin edit. `booked_slots` is never touched here.
    pub fn apply(&mut self, update: &TripUpdate) -> Result<(), TripError> {
        update.validate()?;

        if let Some(total) = update.total_slots {
            if total < self.booked_slots {
                return Err(TripError::CapacityBelowBooked {
                    requested: total,
                    booked: self.booked_slots,
                });
            }
            self.total_slots = total;
        }
        if let Some(title) = &update.title {
            self.title = title.trim().to_string();
        }
        if let Some(fee) = update.booking_fee {
            self.booking_fee = fee;
        }
        if let Some(status) = update.status {
            self.status = status;
        }

        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Admin input for creating a trip
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub title: String,
    pub total_slots: i32,
    pub booking_fee: i64,
    pub status: Option<TripStatus>,
}

impl NewTrip {
    pub fn validate(&self) -> Result<(), TripError> {
        if self.title.trim().is_empty() {
            return Err(TripError::Invalid("title must not be blank".to_string()));
        }
        validate_capacity(self.total_slots)?;
        validate_fee(self.booking_fee)?;
        Ok(())
    }
}

/// Admin partial edit of a trip
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    pub title: Option<String>,
    pub total_slots: Option<i32>,
    pub booking_fee: Option<i64>,
    pub status: Option<TripStatus>,
}

impl TripUpdate {
    pub fn validate(&self) -> Result<(), TripError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(TripError::Invalid("title must not be blank".to_string()));
            }
        }
        if let Some(total) = self.total_slots {
            validate_capacity(total)?;
        }
        if let Some(fee) = self.booking_fee {
            validate_fee(fee)?;
        }
        Ok(())
    }
}

fn validate_capacity(total_slots: i32) -> Result<(), TripError> {
    if total_slots < 1 {
        return Err(TripError::Invalid("totalSlots must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_fee(booking_fee: i64) -> Result<(), TripError> {
    if booking_fee < 1 {
        return Err(TripError::Invalid("bookingFee must be positive".to_string()));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TripError {
    #[error("Invalid trip: {0}")]
    Invalid(String),

    #[error("Unknown trip status: {0}")]
    UnknownStatus(String),

    #[error("totalSlots {requested} is below the {booked} slots already booked")]
    CapacityBelowBooked { requested: i32, booked: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_trip() -> NewTrip {
        NewTrip {
            title: "  Hampta Pass Trek ".to_string(),
            total_slots: 12,
            booking_fee: 500,
            status: None,
        }
    }

    #[test]
    fn test_new_trip_defaults() {
        let trip = Trip::new(new_trip());
        assert_eq!(trip.title, "Hampta Pass Trek");
        assert_eq!(trip.booked_slots, 0);
        assert_eq!(trip.status, TripStatus::ComingSoon);
    }

    #[test]
    fn test_new_trip_validation() {
        assert!(new_trip().validate().is_ok());

        let mut blank = new_trip();
        blank.title = "   ".to_string();
        assert!(matches!(blank.validate(), Err(TripError::Invalid(_))));

        let mut no_slots = new_trip();
        no_slots.total_slots = 0;
        assert!(no_slots.validate().is_err());

        let mut free = new_trip();
        free.booking_fee = 0;
        assert!(free.validate().is_err());
    }

    #[test]
    fn test_update_cannot_shrink_below_booked() {
        let mut trip = Trip::new(new_trip());
        trip.booked_slots = 5;

        let shrink = TripUpdate { total_slots: Some(4), ..Default::default() };
        assert_eq!(
            trip.apply(&shrink),
            Err(TripError::CapacityBelowBooked { requested: 4, booked: 5 })
        );
        assert_eq!(trip.total_slots, 12);

        let ok = TripUpdate {
            total_slots: Some(5),
            status: Some(TripStatus::BookingOpen),
            booking_fee: Some(750),
            ..Default::default()
        };
        trip.apply(&ok).unwrap();
        assert_eq!(trip.total_slots, 5);
        assert_eq!(trip.booked_slots, 5);
        assert_eq!(trip.booking_fee, 750);
        assert!(trip.status.accepts_bookings());
    }

    #[test]
    fn test_status_wire_format() {
        for status in [
            TripStatus::BookingOpen,
            TripStatus::ComingSoon,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TripStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("OPEN".parse::<TripStatus>().is_err());
    }
}
