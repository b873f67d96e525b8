use std::sync::Arc;
use trailhead_booking::BookingOrchestrator;
use trailhead_core::{RegistrationRepository, TripRepository};
use trailhead_store::app_config::RateLimitConfig;
use trailhead_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub trips: Arc<dyn TripRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    /// Rate limiting is skipped when no Redis is configured
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    /// Public gateway key the checkout widget needs
    pub gateway_key_id: String,
}
