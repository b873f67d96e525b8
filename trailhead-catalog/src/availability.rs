use crate::trip::{Trip, TripStatus};

/// Slot accounting for a trip.
///
/// `booked_slots` stays within `0..=total_slots`: claims are conditional on a
/// free slot and releases saturate at zero.
impl Trip {
    pub fn remaining_slots(&self) -> i32 {
        (self.total_slots - self.booked_slots).max(0)
    }

    pub fn has_open_slot(&self) -> bool {
        self.booked_slots < self.total_slots
    }

    /// Checks whether a new registration may be started, status first
    pub fn ensure_bookable(&self) -> Result<(), SlotError> {
        if !self.status.accepts_bookings() {
            return Err(SlotError::BookingClosed(self.status));
        }
        if !self.has_open_slot() {
            return Err(SlotError::FullyBooked { total: self.total_slots });
        }
        Ok(())
    }

    /// Take one slot if one is free
    pub fn claim_slot(&mut self) -> Result<i32, SlotError> {
        if !self.has_open_slot() {
            return Err(SlotError::FullyBooked { total: self.total_slots });
        }
        self.booked_slots += 1;
        Ok(self.booked_slots)
    }

    /// Give one slot back, never going below zero
    pub fn release_slot(&mut self) -> i32 {
        self.booked_slots = (self.booked_slots - 1).max(0);
        self.booked_slots
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("booking closed (trip is {0})")]
    BookingClosed(TripStatus),

    #[error("fully booked ({total} slots)")]
    FullyBooked { total: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::NewTrip;

    fn open_trip(total_slots: i32) -> Trip {
        Trip::new(NewTrip {
            title: "Kedarkantha".to_string(),
            total_slots,
            booking_fee: 50,
            status: Some(TripStatus::BookingOpen),
        })
    }

    #[test]
    fn test_claim_until_full() {
        let mut trip = open_trip(2);
        assert_eq!(trip.claim_slot(), Ok(1));
        assert_eq!(trip.claim_slot(), Ok(2));
        assert_eq!(trip.claim_slot(), Err(SlotError::FullyBooked { total: 2 }));
        assert_eq!(trip.booked_slots, 2);
        assert_eq!(trip.remaining_slots(), 0);
    }

    #[test]
    fn test_release_floors_at_zero() {
        let mut trip = open_trip(2);
        trip.claim_slot().unwrap();
        assert_eq!(trip.release_slot(), 0);
        assert_eq!(trip.release_slot(), 0);
    }

    #[test]
    fn test_status_checked_before_capacity() {
        let mut trip = open_trip(1);
        trip.claim_slot().unwrap();
        trip.status = TripStatus::Cancelled;
        assert_eq!(
            trip.ensure_bookable(),
            Err(SlotError::BookingClosed(TripStatus::Cancelled))
        );

        trip.status = TripStatus::BookingOpen;
        assert_eq!(trip.ensure_bookable(), Err(SlotError::FullyBooked { total: 1 }));
    }
}
