use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use trailhead_api::{app, AppState, AuthConfig};
use trailhead_booking::{BookingOrchestrator, MockGateway, RazorpayGateway};
use trailhead_core::{PaymentGateway, RegistrationRepository, TripRepository};
use trailhead_store::app_config::{Config, GatewayProvider, StorageBackend};
use trailhead_store::{
    DbClient, InMemoryStore, PostgresRegistrationRepository, PostgresTripRepository, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trailhead_api=debug,trailhead_booking=debug,trailhead_store=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Trailhead API on port {}", config.server.port);

    // Storage
    let (trips, registrations): (Arc<dyn TripRepository>, Arc<dyn RegistrationRepository>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                let db = DbClient::connect(&config.database)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                (
                    Arc::new(PostgresTripRepository::new(db.pool.clone())),
                    Arc::new(PostgresRegistrationRepository::new(db.pool.clone())),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let store = InMemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

    // Redis Connection (rate limiting)
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).context("Invalid Redis URL")?,
        )),
        None => {
            tracing::info!("No Redis configured, rate limiting disabled");
            None
        }
    };

    // Payment Gateway
    let gateway: Arc<dyn PaymentGateway> = match config.gateway.provider {
        GatewayProvider::Razorpay => Arc::new(
            RazorpayGateway::new(
                &config.gateway.base_url,
                &config.gateway.key_id,
                &config.gateway.key_secret,
            )
            .context("Failed to build gateway client")?,
        ),
        GatewayProvider::Mock => {
            tracing::warn!("Using mock payment gateway");
            Arc::new(MockGateway::new())
        }
    };

    let orchestrator = BookingOrchestrator::new(
        trips.clone(),
        registrations.clone(),
        gateway,
        config.gateway.key_secret.clone(),
        config.gateway.currency.clone(),
    );

    let app_state = AppState {
        orchestrator: Arc::new(orchestrator),
        trips,
        registrations,
        redis,
        rate_limit: config.rate_limit.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        gateway_key_id: config.gateway.key_id.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
