//! REST backend client -- `POST {base_url}/focus`.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::runtime::Handle;
use url::Url;

use super::{SessionRecord, SessionSink};
use crate::error::BackendError;
use crate::events::{Event, Notifier};
use crate::storage::BackendConfig;

/// Submits sessions over HTTP without blocking the caller.
///
/// Each submission runs as its own task on the runtime captured at
/// construction; there is no retry and no cancellation.
pub struct HttpSessionSink {
    poster: Poster,
    runtime: Handle,
}

#[derive(Clone)]
struct Poster {
    client: Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl HttpSessionSink {
    /// Build a sink on the current tokio runtime.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let runtime = Handle::try_current().map_err(|_| BackendError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    pub fn with_runtime(config: &BackendConfig, runtime: Handle) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            poster: Poster {
                client,
                endpoint: focus_endpoint(&config.base_url)?,
                api_token: config.api_token.clone(),
            },
            runtime,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.poster.endpoint
    }
}

impl Poster {
    async fn post(&self, record: &SessionRecord) -> Result<(), BackendError> {
        let mut request = self.client.post(self.endpoint.clone()).json(record);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(BackendError::Rejected { status, body })
        }
    }
}

impl SessionSink for HttpSessionSink {
    fn submit(&self, record: SessionRecord, notifier: Notifier) {
        let poster = self.poster.clone();
        self.runtime.spawn(async move {
            let session_id = record.session_id.clone();
            let event = match poster.post(&record).await {
                Ok(()) => {
                    tracing::info!(%session_id, "session recorded");
                    Event::SessionRecorded {
                        session_id,
                        at: Utc::now(),
                    }
                }
                Err(e) => {
                    tracing::warn!(%session_id, error = %e, "session submission failed");
                    Event::SessionSubmissionFailed {
                        session_id,
                        message: e.to_string(),
                        at: Utc::now(),
                    }
                }
            };
            notifier.notify(event);
        });
    }
}

/// `{base_url}/focus`, whether or not `base_url` ends with a slash.
fn focus_endpoint(base_url: &str) -> Result<Url, BackendError> {
    let invalid = |source| BackendError::InvalidUrl {
        url: base_url.to_string(),
        source,
    };
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).map_err(invalid)?;
    base.join("focus").map_err(invalid)
}
