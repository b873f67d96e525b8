pub mod error;
pub mod gateway;
pub mod orchestrator;

pub use error::BookingError;
pub use gateway::{MockGateway, RazorpayGateway};
pub use orchestrator::{
    BookingInitiated, BookingOrchestrator, InitiateBooking, PaymentVerified, VerifyPayment,
};
