pub mod payment;
pub mod signature;
pub mod registration;
pub mod repository;

pub use payment::{GatewayError, GatewayOrder, PaymentGateway, PaymentStatus};
pub use registration::{LedgerError, NewRegistration, Registration};
pub use repository::{
    ConfirmOutcome, RegistrationRepository, StoreError, StoreResult, TripRepository,
};
