use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{config::RateLimitConfig, error::AppError};

/// Requests without connection info share this bucket.
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed window request counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Counts one request for `client` and reports whether it is within budget.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = self.window;
        buckets.retain(|_, w| now.saturating_duration_since(w.started) < window);

        let entry = buckets.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    pub fn tracked_clients(&self) -> usize {
        match self.buckets.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(UNKNOWN_CLIENT);

    if !limiter.check(client) {
        tracing::warn!(%client, "rate limit exceeded");
        return AppError::TooManyRequests.into_response();
    }
    next.run(request).await
}
