//! Reasoning client: one logical exchange with retry on throttling.
//!
//! Wraps the provider's `complete()` with the run's retry policy:
//! throttling errors are retried up to `max_retries` total attempts,
//! sleeping the service-suggested delay (or the configured base) plus
//! a linear per-attempt penalty. A Status event is emitted before each
//! retry sleep so the host can narrate progress. Everything else is
//! terminal.

use crate::events::{deliver, LoopEvent};
use std::sync::Arc;
use std::time::Duration;
use steward_core::error::ProviderError;
use steward_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use steward_core::Message;
use tokio::sync::mpsc;
use tracing::warn;

/// Extra delay added per failed attempt, on top of the suggested or
/// base delay.
const RETRY_PENALTY: Duration = Duration::from_secs(2);

/// Why an exchange could not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Non-throttling failure, or throttling after retries exhausted.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The event consumer went away; the run must stop issuing calls.
    #[error("Event consumer dropped, run aborted")]
    Aborted,
}

#[derive(Clone)]
pub struct ReasoningClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_retries: u32,
    base_delay: Duration,
}

impl ReasoningClient {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        retry: &steward_config::RetryConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_retries: retry.max_retries,
            base_delay: retry.base_delay(),
        }
    }

    /// One logical exchange: system instruction + conversation turns +
    /// tool declarations, retried through throttling.
    pub async fn exchange(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        events: &mpsc::Sender<LoopEvent>,
    ) -> Result<ProviderResponse, ExchangeError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let request = ProviderRequest {
                model: self.model.clone(),
                system: system.to_string(),
                messages: messages.to_vec(),
                tools: tools.to_vec(),
                temperature: self.temperature,
            };

            match self.provider.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_throttling() && attempt < self.max_retries => {
                    let suggested = match &e {
                        ProviderError::RateLimited { retry_after_secs } => *retry_after_secs,
                        _ => None,
                    };
                    let delay = suggested
                        .map(Duration::from_secs)
                        .unwrap_or(self.base_delay)
                        + RETRY_PENALTY * attempt;

                    warn!(
                        attempt,
                        max = self.max_retries,
                        delay_secs = delay.as_secs(),
                        "Throttled, backing off"
                    );
                    let notice = LoopEvent::Status {
                        text: format!(
                            "Rate limited, retrying in {}s (attempt {}/{})...",
                            delay.as_secs(),
                            attempt,
                            self.max_retries
                        ),
                    };
                    deliver(events, notice)
                        .await
                        .map_err(|_| ExchangeError::Aborted)?;

                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn client(provider: Arc<SequentialMockProvider>, max_retries: u32) -> ReasoningClient {
        ReasoningClient::new(
            provider,
            "mock-model",
            0.2,
            &steward_config::RetryConfig {
                max_retries,
                base_delay_secs: 30.0,
            },
        )
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(text_response("hi"))]));
        let client = client(provider.clone(), 3);
        let (tx, mut rx) = mpsc::channel(8);

        let response = client.exchange("sys", &[], &[], &tx).await.unwrap();
        assert_eq!(response.message.text(), "hi");
        assert_eq!(provider.call_count(), 1);
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_retries_with_status_notices() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(ProviderError::RateLimited {
                retry_after_secs: Some(5),
            }),
            Err(ProviderError::RateLimited {
                retry_after_secs: None,
            }),
            Ok(text_response("recovered")),
        ]));
        let client = client(provider.clone(), 3);
        let (tx, mut rx) = mpsc::channel(8);

        let response = client.exchange("sys", &[], &[], &tx).await.unwrap();
        assert_eq!(response.message.text(), "recovered");
        assert_eq!(provider.call_count(), 3);

        drop(tx);
        let mut notices = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                LoopEvent::Status { text } => notices.push(text),
                other => panic!("Unexpected event: {other:?}"),
            }
        }
        assert_eq!(notices.len(), 2);
        // First delay: suggested 5s plus the first-attempt penalty.
        assert!(notices[0].contains("7s"));
        assert!(notices[0].contains("attempt 1/3"));
        // Second delay: base 30s plus the second-attempt penalty.
        assert!(notices[1].contains("34s"));
        assert!(notices[1].contains("attempt 2/3"));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted_is_terminal() {
        let throttle = || {
            Err(ProviderError::RateLimited {
                retry_after_secs: Some(1),
            })
        };
        let provider = Arc::new(SequentialMockProvider::new(vec![
            throttle(),
            throttle(),
            throttle(),
        ]));
        let client = client(provider.clone(), 3);
        let (tx, _rx) = mpsc::channel(8);

        let err = client.exchange("sys", &[], &[], &tx).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Provider(ProviderError::RateLimited { .. })
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn non_throttling_error_is_not_retried() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            },
        )]));
        let client = client(provider.clone(), 3);
        let (tx, _rx) = mpsc::channel(8);

        let err = client.exchange("sys", &[], &[], &tx).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Provider(ProviderError::ApiError { .. })
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_consumer_aborts_the_exchange() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(ProviderError::RateLimited {
                retry_after_secs: Some(1),
            }),
            Ok(text_response("never read")),
        ]));
        let client = client(provider.clone(), 3);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = client.exchange("sys", &[], &[], &tx).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Aborted));
        // The retry never happened.
        assert_eq!(provider.call_count(), 1);
    }
}
