use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod lifecycle;
mod models;
mod payments;
mod routes;
mod schema;
mod services;
mod signaling;
mod store;
mod transport;

use config::AppConfig;
use events::EventPublisher;
use luvo_shared::clients::db::create_pool;
use luvo_shared::clients::rabbitmq::RabbitMQClient;
use luvo_shared::clients::redis::RedisClient;
use payments::{PaymentLedger, PgPaymentLedger};
use services::{CallService, InteractionService, StreamService, SwipeService};
use signaling::{RabbitFanout, SignalingFanout};
use store::pg::PgStore;
use store::SessionStore;
use transport::{JwtTokenIssuer, TokenIssuer};

pub struct AppState {
    pub config: AppConfig,
    pub calls: CallService,
    pub streams: StreamService,
    pub interactions: InteractionService,
    pub swipes: SwipeService,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    luvo_shared::middleware::init_tracing("luvo-session");
    let metrics = luvo_shared::middleware::init_metrics();

    let config = AppConfig::load()?;
    let port = config.port;
    let ring_timeout = chrono::Duration::seconds(config.ring_timeout_secs as i64);
    let sweep_interval = std::time::Duration::from_secs((config.ring_timeout_secs / 2).max(5));

    // Infrastructure clients
    let pool = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;

    // Wiring: one durable store and one fanout shared by all services
    let store: Arc<dyn SessionStore> = Arc::new(PgStore::new(pool.clone()));
    let tokens: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(
        config.jwt_secret.clone(),
        config.token_ttl_secs,
    ));
    let payments: Arc<dyn PaymentLedger> = Arc::new(PgPaymentLedger::new(pool));
    let fanout: Arc<dyn SignalingFanout> = Arc::new(RabbitFanout::new(rabbitmq));
    let publisher = EventPublisher::new(fanout);

    let state = Arc::new(AppState {
        calls: CallService::new(store.clone(), tokens.clone(), publisher.clone()),
        streams: StreamService::new(store.clone(), tokens, payments, publisher),
        interactions: InteractionService::new(store),
        swipes: SwipeService::new(redis, config.swipe_limit, config.swipe_window_hours),
        metrics,
        config,
    });

    // Background sweeper for calls that never connected
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.calls.expire_stale(ring_timeout) {
                tracing::error!(error = %e, "stale call sweep failed");
            }
        }
    });

    let app = Router::new()
        // Health and metrics
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Calls
        .route("/calls", post(routes::calls::initiate_call))
        .route("/calls/:id", get(routes::calls::get_call))
        .route("/calls/:id/ring", post(routes::calls::ring_call))
        .route("/calls/:id/answer", post(routes::calls::answer_call))
        .route("/calls/:id/end", post(routes::calls::end_call))
        // Streams
        .route("/streams", post(routes::streams::create_stream))
        .route("/streams/live", get(routes::streams::list_live_streams))
        .route("/streams/:id", get(routes::streams::get_stream))
        .route("/streams/:id/start", post(routes::streams::start_stream))
        .route("/streams/:id/end", post(routes::streams::end_stream))
        .route("/streams/:id/join", post(routes::streams::join_stream))
        .route("/streams/:id/leave", post(routes::streams::leave_stream))
        .route("/streams/:id/viewers", get(routes::streams::list_viewers))
        // Cameras
        .route(
            "/streams/:id/cameras",
            post(routes::cameras::register_camera).get(routes::cameras::list_cameras),
        )
        .route("/streams/:id/switch", post(routes::cameras::switch_camera))
        .route("/streams/:id/switches", get(routes::cameras::switch_history))
        .route("/cameras/:id/promote", post(routes::cameras::promote_camera))
        .route(
            "/cameras/:id/heartbeat",
            post(routes::cameras::camera_heartbeat),
        )
        // Interactions
        .route("/streams/:id/like", post(routes::interactions::toggle_like))
        .route(
            "/streams/:id/dislike",
            post(routes::interactions::toggle_dislike),
        )
        .route("/streams/:id/share", post(routes::interactions::share_stream))
        // Swipe quota
        .route("/swipes/:scope/quota", get(routes::swipes::get_quota))
        .route("/swipes/:scope", post(routes::swipes::record_swipe))
        .layer(axum::middleware::from_fn(
            luvo_shared::middleware::metrics_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "luvo-session starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
