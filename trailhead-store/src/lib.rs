pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod registration_repo;
pub mod trip_repo;

pub use database::DbClient;
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
pub use registration_repo::PostgresRegistrationRepository;
pub use trip_repo::PostgresTripRepository;
