//! Transport seam for the decode call, with the gRPC implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use log::*;
use speech_auth::TokenSource;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use super::proto::{DecoderRequest, DecoderResponse, OnlineDecoderClient};
use crate::error::{Error, ErrorKind};

/// Default bound on reaching a ready channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_millis(200);

/// Messages received from the service on one call.
pub type InboundStream = BoxStream<'static, Result<DecoderResponse, tonic::Status>>;

/// Opens decode calls.
///
/// `outbound` yields the client messages in order; the call's send side is half-closed
/// when the stream ends, which happens when its sender is dropped.
#[async_trait]
pub trait DecoderTransport: Send + Sync {
    async fn open(&self, outbound: ReceiverStream<DecoderRequest>)
        -> Result<InboundStream, Error>;
}

/// Decode calls over a shared TLS channel, each authorized with a fresh bearer token.
#[derive(Clone)]
pub struct GrpcTransport {
    client: OnlineDecoderClient,
    source: Arc<dyn TokenSource>,
}

impl GrpcTransport {
    /// Dial `endpoint` and wait up to `connect_timeout` for the channel to become ready.
    ///
    /// Failed attempts are retried until the timeout; running out of time is
    /// `ConnectTimeout` with the last failure as its source.
    pub async fn connect(
        endpoint: &str,
        source: Arc<dyn TokenSource>,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        let endpoint = build_endpoint(endpoint)?;
        let deadline = Instant::now() + connect_timeout;
        let mut last_error: Option<tonic::transport::Error> = None;

        loop {
            match tokio::time::timeout_at(deadline, endpoint.connect()).await {
                Ok(Ok(channel)) => {
                    info!("Connected to streaming endpoint {}", endpoint.uri());
                    return Ok(Self::with_channel(channel, source));
                }
                Ok(Err(e)) => {
                    debug!("Streaming connect attempt failed: {}", e);
                    last_error = Some(e);
                }
                Err(_) => break,
            }
            if Instant::now() + RECONNECT_DELAY >= deadline {
                break;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }

        warn!(
            "Streaming endpoint {} not ready after {:?}",
            endpoint.uri(),
            connect_timeout
        );
        Err(Error {
            source: match last_error {
                Some(e) => Some(Box::new(e)),
                None => Some(format!("no ready channel after {:?}", connect_timeout).into()),
            },
            error_kind: ErrorKind::ConnectTimeout,
        })
    }

    pub fn with_channel(channel: Channel, source: Arc<dyn TokenSource>) -> Self {
        Self {
            client: OnlineDecoderClient::new(channel),
            source,
        }
    }
}

fn build_endpoint(endpoint: &str) -> Result<Endpoint, Error> {
    let uri = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let builder = Channel::from_shared(uri.clone()).map_err(|e| {
        warn!("Invalid streaming endpoint {}: {:?}", uri, e);
        Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Configuration,
        }
    })?;

    if uri.starts_with("https://") {
        builder
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Configuration,
            })
    } else {
        Ok(builder)
    }
}

#[async_trait]
impl DecoderTransport for GrpcTransport {
    async fn open(
        &self,
        outbound: ReceiverStream<DecoderRequest>,
    ) -> Result<InboundStream, Error> {
        let request =
            speech_auth::grpc::authorize(self.source.as_ref(), tonic::Request::new(outbound))
                .await?;
        let mut client = self.client.clone();
        let response = client.decode(request).await.map_err(|status| {
            warn!("Failed to open decode call: {}", status);
            Error::from(status)
        })?;
        Ok(response.into_inner().boxed())
    }
}
