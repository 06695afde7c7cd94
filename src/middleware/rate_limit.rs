use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{config::Config, error::AppError};

/// Fixed-window request counter per client IP, kept in Redis.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    fn client_ip(req: &Request<Body>) -> String {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        req.headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or(remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim()
            .to_string()
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Response {
        let ip = Self::client_ip(&req);
        let key = format!("rate_limit:{}", ip);
        let window = self.config.rate_limit_window().as_secs();

        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                // fail open
                tracing::warn!("Rate limiter cannot reach Redis: {}", e);
                return next.run(req).await;
            }
        };

        let count: i64 = match conn.incr(&key, 1).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Rate limiter INCR failed: {}", e);
                return next.run(req).await;
            }
        };

        if count == 1 {
            let result: redis::RedisResult<()> = conn.expire(&key, window as i64).await;
            if let Err(e) = result {
                tracing::warn!("Rate limiter EXPIRE failed: {}", e);
            }
        }

        if count > i64::from(self.config.rate_limit_requests) {
            tracing::info!("Rate limit exceeded for {}", ip);
            return AppError::RateLimited(window).into_response();
        }

        next.run(req).await
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
