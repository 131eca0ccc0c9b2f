//! Retry classification and backoff arithmetic for the fetch gate.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Delay before the retry that follows failed attempt number `attempt`
/// (0-based): `base * 2^attempt`.
///
/// | Attempt | Delay with `base = 5s` |
/// |---------|------------------------|
/// | 0       | 5 s                    |
/// | 1       | 10 s                   |
/// | 2       | 20 s                   |
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.min(20)))
}

/// Transport failures worth retrying: everything except a request that could
/// not even be built (bad URL, bad header), which would fail the same way again.
pub(crate) fn is_retriable_transport(err: &reqwest::Error) -> bool {
    !err.is_builder()
}

/// Parses a `Retry-After` header given as integer seconds.
///
/// The HTTP-date form is not supported and yields `None`, which callers treat
/// the same as a missing header.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_secs(5);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(5));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(20));
    }

    #[test]
    fn backoff_with_zero_base_is_zero() {
        assert_eq!(backoff_delay(Duration::ZERO, 7), Duration::ZERO);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let delay = backoff_delay(Duration::from_secs(u64::MAX / 2), 40);
        assert_eq!(delay, Duration::MAX);
    }

    #[test]
    fn retry_after_reads_integer_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(17)));
    }

    #[test]
    fn retry_after_missing_or_http_date_is_none() {
        assert_eq!(retry_after(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }
}
