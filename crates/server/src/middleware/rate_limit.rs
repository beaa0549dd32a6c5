//! Rate limiting middleware using governor and `tower_governor`.
//!
//! One limiter per endpoint category, keyed by client IP:
//! - `auth_rate_limiter`: login and registration (~10 per 15 minutes)
//! - `password_reset_rate_limiter`: forgot/reset password (~10 per hour)
//! - `sms_rate_limiter`: OTP sends (~5 per hour)
//! - `analytics_rate_limiter`: client event tracking
//! - `api_rate_limiter`: everything else under `/api`

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP
// =============================================================================

/// Resolve the client IP from proxy headers, falling back to the peer address.
///
/// Checks `X-Forwarded-For` (first entry), then `X-Real-IP`.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    peer.map(|addr| addr.ip())
}

/// Key extractor that uses [`client_ip`].
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        client_ip(req.headers(), peer).ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_seconds: u64, burst: u32) -> Option<RateLimiterLayer> {
    GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_seconds)
        .burst_size(burst)
        .finish()
        .map(|config| GovernorLayer::new(Arc::new(config)))
}

/// Create rate limiter for auth endpoints: ~10 requests per 15 minutes per IP.
///
/// Configuration: 1 request every 90 seconds (replenish), burst of 10.
///
/// # Panics
///
/// This function will not panic. `per_second(90)` and `burst_size(10)` are
/// positive and always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(90, 10).expect("rate limiter config with per_second(90) and burst_size(10) is valid")
}

/// Create rate limiter for password reset: ~10 requests per hour per IP.
///
/// # Panics
///
/// This function will not panic; the configuration is fixed and valid.
#[must_use]
pub fn password_reset_rate_limiter() -> RateLimiterLayer {
    limiter(360, 10).expect("rate limiter config with per_second(360) and burst_size(10) is valid")
}

/// Create rate limiter for OTP SMS: ~5 requests per hour per IP.
///
/// # Panics
///
/// This function will not panic; the configuration is fixed and valid.
#[must_use]
pub fn sms_rate_limiter() -> RateLimiterLayer {
    limiter(720, 5).expect("rate limiter config with per_second(720) and burst_size(5) is valid")
}

/// Create rate limiter for event tracking: burst of 100, 1 per second after.
///
/// # Panics
///
/// This function will not panic; the configuration is fixed and valid.
#[must_use]
pub fn analytics_rate_limiter() -> RateLimiterLayer {
    limiter(1, 100).expect("rate limiter config with per_second(1) and burst_size(100) is valid")
}

/// Create rate limiter for the general API: burst of 100, 1 every 2 seconds.
///
/// # Panics
///
/// This function will not panic; the configuration is fixed and valid.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(2, 100).expect("rate limiter config with per_second(2) and burst_size(100) is valid")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([10, 0, 0, 9], 41_000)))
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            client_ip(&headers, peer()),
            Some("203.0.113.5".parse().unwrap_or_else(|_| unreachable!()))
        );
    }

    #[test]
    fn test_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            client_ip(&headers, peer()).map(|ip| ip.to_string()),
            Some("198.51.100.2".to_string())
        );

        let empty = HeaderMap::new();
        assert_eq!(
            client_ip(&empty, peer()).map(|ip| ip.to_string()),
            Some("10.0.0.9".to_string())
        );
        assert_eq!(client_ip(&empty, None), None);
    }

    #[test]
    fn test_limiters_build() {
        let _ = auth_rate_limiter();
        let _ = password_reset_rate_limiter();
        let _ = sms_rate_limiter();
        let _ = analytics_rate_limiter();
        let _ = api_rate_limiter();
    }
}
