use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use study_groups::{
    AppState,
    cache::GroupCache,
    config::Config,
    database::{MemoryStore, PgStore, Store},
    ensure_admin,
    middleware::{RateLimiter, rate_limit},
    notify::{LogNotifier, Notifier, WebhookNotifier},
    routes,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration (is JWT_SECRET set?)");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url, config.database_max_connections)
                .await
                .expect("Failed to connect to Postgres"),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let redis = config.redis_url.as_ref().map(|url| {
        Arc::new(redis::Client::open(url.as_str()).expect("Failed to create Redis client"))
    });
    if redis.is_none() {
        tracing::info!("REDIS_URL not set, listing cache and rate limiting disabled");
    }

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url).expect("Failed to build webhook client")),
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    if let Some(admin) = &config.admin {
        ensure_admin(store.as_ref(), admin, config.bcrypt_cost)
            .await
            .expect("Failed to create admin account");
    }

    let state = AppState {
        store,
        config: config.clone(),
        cache: redis
            .clone()
            .map(|client| GroupCache::new(client, config.group_cache_ttl_secs)),
        notifier,
    };

    let mut router = routes::create_router(state);

    if let Some(client) = redis {
        let rate_limiter = Arc::new(RateLimiter::new(client, config.clone()));
        router = router.layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit));
    }

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let app = router.layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
