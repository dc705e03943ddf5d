//! Per-client request limits.
//!
//! Each client address gets one fixed window per [`EndpointClass`]. Windows
//! that have closed are swept at most once per window length, so the table
//! only ever holds clients seen during the last two windows.

use std::{
    collections::HashMap,
    env,
    fmt::Display,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, MatchedPath, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per window for reads.
    pub read_limit: u32,
    /// Requests per window for POST/PUT/PATCH/DELETE.
    pub write_limit: u32,
    /// Requests per window for `/health` and preflights.
    pub health_limit: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read_limit: 100,
            write_limit: 20,
            health_limit: 10_000,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Defaults overridden by `RATE_LIMIT_*` variables. Zero or unparsable
    /// values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            read_limit: positive_env("RATE_LIMIT_READ_PER_MINUTE", defaults.read_limit),
            write_limit: positive_env("RATE_LIMIT_WRITE_PER_MINUTE", defaults.write_limit),
            health_limit: positive_env("RATE_LIMIT_HEALTH_PER_MINUTE", defaults.health_limit),
            window: Duration::from_secs(positive_env(
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.window.as_secs(),
            )),
        };

        tracing::info!(
            read_limit = config.read_limit,
            write_limit = config.write_limit,
            health_limit = config.health_limit,
            window_secs = config.window.as_secs(),
            "Rate limiter configured"
        );
        config
    }

    fn limit_for(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Read => self.read_limit,
            EndpointClass::Write => self.write_limit,
            EndpointClass::Health => self.health_limit,
        }
    }
}

fn positive_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Default + PartialEq + Display + Copy,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => {
            tracing::warn!(key, value = %raw, %default, "ignoring invalid rate limit setting");
            default
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
enum EndpointClass {
    Read,
    Write,
    Health,
}

impl EndpointClass {
    fn of<B>(request: &Request<B>) -> Self {
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map_or_else(|| request.uri().path(), MatchedPath::as_str);
        let method = request.method();

        if path == "/health" || method == Method::OPTIONS {
            EndpointClass::Health
        } else if matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        ) {
            EndpointClass::Write
        } else {
            EndpointClass::Read
        }
    }
}

struct Window {
    opened: Instant,
    used: u32,
}

struct WindowTable {
    windows: HashMap<(String, EndpointClass), Window>,
    last_sweep: Instant,
}

impl WindowTable {
    fn sweep(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.last_sweep) < length {
            return;
        }
        self.windows
            .retain(|_, window| now.duration_since(window.opened) < length);
        self.last_sweep = now;
    }
}

/// What one request used of its window.
struct Quota {
    limit: u32,
    remaining: u32,
    reset_after_secs: u64,
    exhausted: bool,
}

impl Quota {
    fn stamp(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        headers.insert(RESET_HEADER, HeaderValue::from(self.reset_after_secs));
        if self.exhausted {
            headers.insert(RETRY_AFTER, HeaderValue::from(self.reset_after_secs));
        }
    }
}

/// Shared limiter handle; clones see the same windows.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    table: Arc<Mutex<WindowTable>>,
}

impl RateLimitState {
    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            table: Arc::new(Mutex::new(WindowTable {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    fn admit(&self, client: String, class: EndpointClass) -> Quota {
        let limit = self.config.limit_for(class);
        let length = self.config.window;
        let now = Instant::now();

        // Counters stay consistent even if a holder panicked.
        let mut table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.sweep(now, length);

        let window = table
            .windows
            .entry((client, class))
            .or_insert(Window { opened: now, used: 0 });
        if now.duration_since(window.opened) >= length {
            *window = Window { opened: now, used: 0 };
        }

        let left = length.saturating_sub(now.duration_since(window.opened));
        let reset_after_secs = (left.as_secs() + u64::from(left.subsec_nanos() > 0)).max(1);

        let exhausted = window.used >= limit;
        if !exhausted {
            window.used += 1;
        }

        Quota {
            limit,
            remaining: limit.saturating_sub(window.used),
            reset_after_secs,
            exhausted,
        }
    }

    /// Number of live (client, class) windows.
    pub fn tracked_windows(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .windows
            .len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let class = EndpointClass::of(&request);
    let client = client_address(&request);
    let quota = limiter.admit(client, class);

    let mut response = if quota.exhausted {
        tracing::debug!(?class, limit = quota.limit, "rate limit exceeded");
        ApiError::rate_limited().into_response()
    } else {
        next.run(request).await
    };
    quota.stamp(response.headers_mut());
    response
}

/// Best-effort client address: first parsable `x-forwarded-for` hop, then
/// `x-real-ip`, then the socket peer.
fn client_address<B>(request: &Request<B>) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    };

    header("x-forwarded-for")
        .and_then(|raw| raw.split(',').map(str::trim).find_map(parse_ip))
        .or_else(|| header("x-real-ip").and_then(parse_ip))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip())
        })
        .map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
