//! Rate limit decisions and their HTTP rendering.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, Response, StatusCode};
use serde::Serialize;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// The outcome of one limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub success: bool,
    /// The cap of the window
    pub limit: u32,
    /// Requests left in the window after this one
    pub remaining: u32,
    /// When the window closes
    pub reset_time: DateTime<Utc>,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
    /// Denial message; `None` when the request is allowed
    pub error: Option<String>,
}

impl RateLimitDecision {
    /// Time until the window closes, rounded up to whole seconds.
    pub fn retry_after(&self) -> Duration {
        let millis = (self.reset_time - self.checked_at).num_milliseconds().max(0);
        let secs = u64::try_from(millis).unwrap_or(0).div_ceil(1000);
        Duration::from_secs(secs)
    }

    /// The `X-RateLimit-*` headers describing this decision.
    ///
    /// `X-RateLimit-Reset` carries the window close as Unix seconds, rounded up.
    pub fn headers(&self) -> HeaderMap {
        let reset = self.reset_time.timestamp()
            + i64::from(self.reset_time.timestamp_subsec_nanos() > 0);

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
        headers
    }

    /// The 429 rejection for a denied request, `None` if it was allowed.
    pub fn rejection(&self) -> Option<RateLimitRejection> {
        if self.success {
            return None;
        }

        // A denied request always waits at least a second
        let retry_after = self.retry_after().as_secs().max(1);

        let mut headers = self.headers();
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));

        Some(RateLimitRejection {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers,
            body: RateLimitErrorBody {
                error: "Too Many Requests".to_string(),
                message: self
                    .error
                    .clone()
                    .unwrap_or_else(|| super::rules::DEFAULT_DENIAL_MESSAGE.to_string()),
                retry_after,
            },
        })
    }
}

/// JSON payload returned with a 429.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitErrorBody {
    pub error: String,
    pub message: String,
    /// Seconds until the window closes
    pub retry_after: u64,
}

/// Everything needed to answer a denied request.
#[derive(Debug, Clone)]
pub struct RateLimitRejection {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: RateLimitErrorBody,
}

impl RateLimitRejection {
    /// Render as an HTTP response with a JSON body.
    pub fn into_response(self) -> serde_json::Result<Response<String>> {
        let body = serde_json::to_string(&self.body)?;

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn decision(success: bool, remaining: u32, reset_in_ms: i64) -> RateLimitDecision {
        let checked_at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        RateLimitDecision {
            success,
            limit: 3,
            remaining,
            reset_time: checked_at + chrono::Duration::milliseconds(reset_in_ms),
            checked_at,
            error: (!success).then(|| "Slow down".to_string()),
        }
    }

    #[test]
    fn test_headers() {
        let d = decision(true, 2, 60_000);
        let headers = d.headers();

        assert_eq!(headers[&X_RATELIMIT_LIMIT], "3");
        assert_eq!(headers[&X_RATELIMIT_REMAINING], "2");
        assert_eq!(
            headers[&X_RATELIMIT_RESET],
            d.reset_time.timestamp().to_string().as_str()
        );
        assert!(d.rejection().is_none());
    }

    #[test]
    fn test_reset_header_rounds_up() {
        let d = decision(true, 2, 1_500);
        let expected = d.checked_at.timestamp() + 2;
        assert_eq!(d.headers()[&X_RATELIMIT_RESET], expected.to_string().as_str());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(decision(false, 0, 1_200).retry_after(), Duration::from_secs(2));
        assert_eq!(decision(false, 0, 0).retry_after(), Duration::ZERO);
        assert_eq!(decision(false, 0, -500).retry_after(), Duration::ZERO);
    }

    #[test]
    fn test_rejection() {
        let rejection = decision(false, 0, 42_000).rejection().unwrap();

        assert_eq!(rejection.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejection.headers[RETRY_AFTER], "42");
        assert_eq!(rejection.headers[&X_RATELIMIT_REMAINING], "0");
        assert_eq!(rejection.body.message, "Slow down");
        assert_eq!(rejection.body.retry_after, 42);
    }

    #[test]
    fn test_rejection_waits_at_least_one_second() {
        let rejection = decision(false, 0, 0).rejection().unwrap();
        assert_eq!(rejection.body.retry_after, 1);
    }

    #[test]
    fn test_into_response() {
        let response = decision(false, 0, 5_000)
            .rejection()
            .unwrap()
            .into_response()
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[RETRY_AFTER], "5");

        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], "Too Many Requests");
        assert_eq!(body["message"], "Slow down");
        assert_eq!(body["retryAfter"], 5);
    }
}
