use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};
use workpass::config::AccessConfig;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";
const ANONYMOUS_CALLER: &str = "anonymous";
const WINDOW: Duration = Duration::from_secs(60);

/// Gate for the `/api` routes: optional API-key check plus a per-key request budget.
pub(crate) struct AccessGuard {
    api_key: String,
    require_api_key: bool,
    limiter: RateLimiter,
}

impl AccessGuard {
    pub(crate) fn new(config: &AccessConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            require_api_key: config.require_api_key,
            limiter: RateLimiter::new(config.rate_limit_per_minute, WINDOW),
        }
    }

    fn check(&self, headers: &HeaderMap, now: Instant) -> Result<(), Rejection> {
        let presented = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if self.require_api_key && !presented.is_some_and(|key| key == self.api_key) {
            return Err(Rejection::Unauthorized);
        }

        let caller = presented.unwrap_or(ANONYMOUS_CALLER);
        if !self.limiter.try_acquire(caller, now) {
            return Err(Rejection::RateLimited);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Unauthorized,
    RateLimited,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Rejection::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Rejection::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub(crate) async fn guard_layer(
    State(guard): State<Arc<AccessGuard>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    match guard.check(request.headers(), Instant::now()) {
        Ok(()) => Ok(next.run(request).await),
        Err(rejection) => {
            let path = request.uri().path();
            match rejection {
                Rejection::Unauthorized => warn!(%path, "rejected request without a valid API key"),
                Rejection::RateLimited => debug!(%path, "request over rate limit"),
            }
            Err(rejection.into_response())
        }
    }
}

/// Fixed-window counter keyed by caller.
///
/// Lapsed windows are swept every `SWEEP_EVERY` calls, and at most
/// `MAX_TRACKED_CALLERS` windows are held at once. A new caller arriving at the
/// cap triggers a sweep and is refused if the map is still full.
pub(crate) struct RateLimiter {
    limit: u64,
    window: Duration,
    max_tracked: usize,
    calls: AtomicU64,
    windows: Mutex<HashMap<String, Window>>,
}

const SWEEP_EVERY: u64 = 100;
const MAX_TRACKED_CALLERS: usize = 10_000;

struct Window {
    opened_at: Instant,
    used: u64,
}

impl RateLimiter {
    pub(crate) fn new(limit: u64, window: Duration) -> Self {
        Self::with_capacity(limit, window, MAX_TRACKED_CALLERS)
    }

    pub(crate) fn with_capacity(limit: u64, window: Duration, max_tracked: usize) -> Self {
        Self {
            limit,
            window,
            max_tracked,
            calls: AtomicU64::new(0),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn try_acquire(&self, caller: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % SWEEP_EVERY == 0 {
            self.sweep(&mut windows, now);
        }

        if !windows.contains_key(caller) && windows.len() >= self.max_tracked {
            self.sweep(&mut windows, now);
            if windows.len() >= self.max_tracked {
                warn!(tracked = windows.len(), "rate limiter full, refusing new caller");
                return false;
            }
        }

        let entry = windows.entry(caller.to_string()).or_insert(Window {
            opened_at: now,
            used: 0,
        });
        if now.duration_since(entry.opened_at) >= self.window {
            entry.opened_at = now;
            entry.used = 0;
        }
        if entry.used >= self.limit {
            return false;
        }
        entry.used += 1;
        true
    }

    fn sweep(&self, windows: &mut HashMap<String, Window>, now: Instant) {
        let before = windows.len();
        windows.retain(|_, window| now.duration_since(window.opened_at) < self.window);
        debug!(evicted = before - windows.len(), "swept lapsed rate limit windows");
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn access(require_api_key: bool, limit: u64) -> AccessConfig {
        AccessConfig {
            api_key: "secret".to_string(),
            require_api_key,
            rate_limit_per_minute: limit,
        }
    }

    fn headers(key: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = key {
            headers.insert(API_KEY_HEADER, HeaderValue::from_static(key));
        }
        headers
    }

    #[test]
    fn limiter_resets_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.try_acquire("k", start));
        assert!(limiter.try_acquire("k", start + Duration::from_secs(1)));
        assert!(!limiter.try_acquire("k", start + Duration::from_secs(59)));
        assert!(limiter.try_acquire("other", start + Duration::from_secs(59)));
        assert!(limiter.try_acquire("k", start + Duration::from_secs(60)));
    }

    #[test]
    fn lapsed_windows_are_evicted() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..5_000u64 {
            let at = start + Duration::from_secs(120 * i);
            assert!(limiter.try_acquire(&format!("junk-{i}"), at));
        }

        assert!(
            limiter.tracked() <= SWEEP_EVERY as usize,
            "tracked {} caller windows",
            limiter.tracked()
        );
    }

    #[test]
    fn new_callers_are_refused_once_tracking_is_full() {
        let limiter = RateLimiter::with_capacity(10, Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.try_acquire("a", start));
        assert!(limiter.try_acquire("b", start));
        assert!(!limiter.try_acquire("c", start));
        assert!(limiter.try_acquire("a", start), "known callers keep their budget");

        let later = start + Duration::from_secs(60);
        assert!(limiter.try_acquire("c", later), "lapsed windows free their slots");
        assert!(limiter.tracked() <= 2);
    }

    #[test]
    fn missing_or_wrong_key_is_rejected_when_required() {
        let guard = AccessGuard::new(&access(true, 10));
        let now = Instant::now();

        assert_eq!(guard.check(&headers(None), now), Err(Rejection::Unauthorized));
        assert_eq!(
            guard.check(&headers(Some("wrong")), now),
            Err(Rejection::Unauthorized)
        );
        assert_eq!(guard.check(&headers(Some("secret")), now), Ok(()));
    }

    #[test]
    fn key_is_optional_when_not_required() {
        let guard = AccessGuard::new(&access(false, 10));
        assert_eq!(guard.check(&headers(None), Instant::now()), Ok(()));
    }

    #[test]
    fn eleventh_request_in_a_minute_is_throttled() {
        let guard = AccessGuard::new(&access(true, 10));
        let now = Instant::now();
        for _ in 0..10 {
            assert_eq!(guard.check(&headers(Some("secret")), now), Ok(()));
        }
        assert_eq!(
            guard.check(&headers(Some("secret")), now),
            Err(Rejection::RateLimited)
        );
    }
}
