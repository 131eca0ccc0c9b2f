//! The fetch gate: one paced, retrying HTTP client shared by every source.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use forumwatch_core::MonitoringSettings;

use crate::error::FetchError;
use crate::retry::{backoff_delay, is_retriable_transport, retry_after};

/// Maximum number of response-body characters kept in a [`FetchError::ClientRequest`].
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Tuning for a [`FetchGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Global request budget; the gate spaces dispatches `60 / rpm` seconds apart.
    pub requests_per_minute: u32,
    /// Total attempts allowed for 5xx responses and transport failures.
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// Pause after a 429 that carries no usable `Retry-After`.
    pub default_retry_after: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl GateConfig {
    #[must_use]
    pub fn from_settings(settings: &MonitoringSettings) -> Self {
        Self {
            requests_per_minute: settings.requests_per_minute,
            max_retries: settings.max_retries,
            backoff_base: Duration::from_secs(settings.backoff_base_secs),
            default_retry_after: Duration::from_secs(settings.default_retry_after_secs),
            timeout: Duration::from_secs(settings.timeout_secs),
            user_agent: settings.user_agent.clone(),
        }
    }
}

/// Outcome of one dispatch that did not end the request outright.
enum Dispatch {
    Success(String),
    RateLimited(Duration),
    ServerError(StatusCode),
}

/// Paced, retrying JSON client.
///
/// All sources share one gate, so the pacing budget is global: concurrent
/// callers queue on the internal dispatch lock and each dispatch (first try or
/// retry) starts at least `min_interval` after the previous one.
///
/// Response handling:
/// - 2xx: body parsed and returned.
/// - 429: sleep for `Retry-After` (or the configured default) and try again,
///   without limit and without spending the retry budget.
/// - 5xx and transport failures: exponential backoff, at most `max_retries`
///   attempts in total.
/// - other 4xx: [`FetchError::ClientRequest`], no retry.
pub struct FetchGate {
    client: Client,
    min_interval: Duration,
    max_retries: u32,
    backoff_base: Duration,
    default_retry_after: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl FetchGate {
    /// Builds the gate and its underlying `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the client cannot be constructed
    /// (e.g., invalid TLS config).
    pub fn new(config: &GateConfig) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        let rpm = config.requests_per_minute.max(1);
        Ok(Self {
            client,
            min_interval: Duration::from_secs_f64(60.0 / f64::from(rpm)),
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base,
            default_retry_after: config.default_retry_after,
            last_dispatch: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// GETs `url` with query `params` and parses the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::ClientRequest`]: a 4xx other than 429.
    /// - [`FetchError::ExhaustedRetries`]: every allowed attempt hit a 5xx.
    /// - [`FetchError::Transport`]: the final allowed attempt failed at the
    ///   network level, or the request could not be built.
    /// - [`FetchError::Deserialize`]: a 2xx body that is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let mut failures = 0u32;

        loop {
            self.wait_for_dispatch_slot().await;

            let retry_in = match self.dispatch(url, params).await {
                Ok(Dispatch::Success(body)) => {
                    tracing::debug!(url, "request succeeded");
                    return serde_json::from_str(&body).map_err(|e| FetchError::Deserialize {
                        context: url.to_owned(),
                        source: e,
                    });
                }
                Ok(Dispatch::RateLimited(wait)) => {
                    tracing::warn!(
                        url,
                        retry_after_secs = wait.as_secs(),
                        "rate limited; pausing before retry"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Ok(Dispatch::ServerError(status)) => {
                    failures += 1;
                    if failures >= self.max_retries {
                        return Err(FetchError::ExhaustedRetries {
                            url: url.to_owned(),
                            attempts: failures,
                            last_status: status.as_u16(),
                        });
                    }
                    let delay = backoff_delay(self.backoff_base, failures - 1);
                    tracing::warn!(
                        url,
                        status = status.as_u16(),
                        attempt = failures,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "server error; retrying after backoff"
                    );
                    delay
                }
                Err(FetchError::Transport(err)) if is_retriable_transport(&err) => {
                    failures += 1;
                    if failures >= self.max_retries {
                        return Err(FetchError::Transport(err));
                    }
                    let delay = backoff_delay(self.backoff_base, failures - 1);
                    tracing::warn!(
                        url,
                        error = %err,
                        attempt = failures,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "request failed; retrying after backoff"
                    );
                    delay
                }
                Err(err) => return Err(err),
            };

            tokio::time::sleep(retry_in).await;
        }
    }

    /// Blocks until `min_interval` has passed since the previous dispatch, then
    /// records this dispatch. The lock is held while sleeping so waiters queue
    /// in order.
    async fn wait_for_dispatch_slot(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval.saturating_sub(elapsed)).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn dispatch(&self, url: &str, params: &[(&str, &str)]) -> Result<Dispatch, FetchError> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            return Ok(Dispatch::Success(body));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(response.headers()).unwrap_or(self.default_retry_after);
            return Ok(Dispatch::RateLimited(wait));
        }

        if status.is_server_error() {
            return Ok(Dispatch::ServerError(status));
        }

        let body = response.text().await.unwrap_or_default();
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
        tracing::error!(url, status = status.as_u16(), body = %preview, "client request error");
        Err(FetchError::ClientRequest {
            status: status.as_u16(),
            url: url.to_owned(),
            body: preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpm: u32) -> GateConfig {
        GateConfig {
            requests_per_minute: rpm,
            max_retries: 3,
            backoff_base: Duration::ZERO,
            default_retry_after: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            user_agent: "forumwatch-test/0.1".to_string(),
        }
    }

    #[test]
    fn min_interval_follows_requests_per_minute() {
        let gate = FetchGate::new(&config(30)).unwrap();
        assert_eq!(gate.min_interval(), Duration::from_secs(2));

        let gate = FetchGate::new(&config(120)).unwrap();
        assert_eq!(gate.min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn zero_rpm_is_treated_as_one() {
        let gate = FetchGate::new(&config(0)).unwrap();
        assert_eq!(gate.min_interval(), Duration::from_secs(60));
    }

    #[test]
    fn from_settings_copies_monitoring_values() {
        let settings = MonitoringSettings::default();
        let cfg = GateConfig::from_settings(&settings);
        assert_eq!(cfg.requests_per_minute, 30);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_base, Duration::from_secs(5));
        assert_eq!(cfg.default_retry_after, Duration::from_secs(60));
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_slots_are_spaced_by_min_interval() {
        let gate = FetchGate::new(&config(30)).unwrap();
        let start = Instant::now();
        gate.wait_for_dispatch_slot().await;
        gate.wait_for_dispatch_slot().await;
        gate.wait_for_dispatch_slot().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn first_dispatch_does_not_wait() {
        let gate = FetchGate::new(&config(1)).unwrap();
        let start = Instant::now();
        gate.wait_for_dispatch_slot().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
