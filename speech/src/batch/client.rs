//! Batch recognition client: submit a job, then poll for its result.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use speech_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use speech_auth::{ClientOptions, TokenProvider, TokenSource};
use tokio_util::sync::CancellationToken;

use super::polling::{poll_until_ready, PollPolicy};
use super::upload::multipart_form;
use crate::error::{config_error, not_ready, Error, ErrorKind};
use crate::types::{JobId, RecognizeRequest, RecognizeResponse, SubmitResponse};

fn client_builder(source: &Arc<dyn TokenSource>) -> AuthenticatedClientBuilder {
    AuthenticatedClientBuilder::new()
        .with_auth(source.clone())
        .with_user_agent(format!("speech/{}", env!("CARGO_PKG_VERSION")))
}

/// Client for the batch transcription endpoint.
///
/// Result polling goes through a client with transient-failure retries. Uploads go
/// through one without retries or a whole-request timeout, since their bodies are
/// streamed and cannot be replayed.
pub struct BatchClient {
    endpoint: String,
    source: Arc<dyn TokenSource>,
    http_client: AuthenticatedClient,
    upload_client: AuthenticatedClient,
    poll_policy: PollPolicy,
}

impl BatchClient {
    /// Build a client with its own token provider from `options`.
    pub fn new(options: &ClientOptions) -> Result<Self, Error> {
        let provider = TokenProvider::new(options)?;
        Self::with_token_source(Arc::new(provider), options.rest_endpoint())
    }

    /// Build a client sharing an existing token source.
    pub fn with_token_source(source: Arc<dyn TokenSource>, endpoint: &str) -> Result<Self, Error> {
        let endpoint = endpoint.trim_end_matches('/');
        url::Url::parse(endpoint).map_err(|e| {
            warn!("Invalid batch endpoint {}: {:?}", endpoint, e);
            config_error("batch endpoint is not a valid URL")
        })?;

        let http_client = client_builder(&source).build()?;
        let upload_client = client_builder(&source)
            .with_max_retries(0)
            .with_timeout(None)
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            source,
            http_client,
            upload_client,
            poll_policy: PollPolicy::default(),
        })
    }

    /// Rebuild the polling client with a different timeout and retry budget.
    pub fn with_http_settings(
        mut self,
        timeout: Option<Duration>,
        max_retries: u32,
    ) -> Result<Self, Error> {
        self.http_client = client_builder(&self.source)
            .with_timeout(timeout)
            .with_max_retries(max_retries)
            .build()?;
        Ok(self)
    }

    /// Policy used by [`BatchClient::recognize`].
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Submit a job and return its identifier.
    ///
    /// The audio invariant is checked before any I/O. File audio is streamed from a writer
    /// task, and a failure on that side is reported in place of the request's own outcome.
    pub async fn submit(&self, request: &RecognizeRequest) -> Result<JobId, Error> {
        let source = request.validate()?;
        let (form, writer) = multipart_form(&request.config, source).await?;

        let sent = self
            .upload_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to submit batch job: {:?}", e);
                if let Some(writer) = writer {
                    writer.finish().await?;
                }
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Batch submit rejected with {}: {}", status, error_text);
            if let Some(err) = writer.and_then(|mut writer| writer.reported_failure()) {
                return Err(err);
            }
            return Err(Error {
                source: None,
                error_kind: ErrorKind::RemoteRejected {
                    status: status.as_u16(),
                    body: error_text,
                },
            });
        }

        if let Some(writer) = writer {
            writer.finish().await?;
        }

        let body = response.text().await?;
        let submitted: SubmitResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse batch submit response: {:?}", e);
            Error::from(e)
        })?;
        info!("Submitted batch job {}", submitted.id);
        Ok(submitted.id)
    }

    /// Fetch a job's result once.
    ///
    /// Any status other than `completed` yields `ResultNotReady`.
    pub async fn fetch_result(&self, id: &JobId) -> Result<RecognizeResponse, Error> {
        let url = format!("{}/{}", self.endpoint, id);
        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!("Failed to fetch batch job {}: {:?}", id, e);
            Error::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Batch result for {} rejected with {}: {}", id, status, error_text);
            return Err(Error {
                source: None,
                error_kind: ErrorKind::RemoteRejected {
                    status: status.as_u16(),
                    body: error_text,
                },
            });
        }

        let body = response.text().await?;
        let result: RecognizeResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse batch result for {}: {:?}", id, e);
            Error::from(e)
        })?;

        if result.status.is_completed() {
            Ok(result)
        } else {
            debug!("Batch job {} is {:?}", id, result.status);
            Err(not_ready(id.as_str()))
        }
    }

    /// Poll `id` under `policy` until it completes, fails, runs out of bounds or is cancelled.
    pub async fn poll_result(
        &self,
        id: &JobId,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<RecognizeResponse, Error> {
        poll_until_ready(policy, cancel, |_| self.fetch_result(id)).await
    }

    /// Submit and poll with this client's policy.
    pub async fn recognize(&self, request: &RecognizeRequest) -> Result<RecognizeResponse, Error> {
        self.recognize_with(request, &self.poll_policy, &CancellationToken::new())
            .await
    }

    pub async fn recognize_with(
        &self,
        request: &RecognizeRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<RecognizeResponse, Error> {
        policy.validate()?;
        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::new(ErrorKind::Cancelled, "submit cancelled"));
            }
            id = self.submit(request) => id?,
        };
        self.poll_result(&id, policy, cancel).await
    }

    /// Release the HTTP clients.
    pub fn close(self) {
        debug!("Closing batch client for {}", self.endpoint);
    }
}
