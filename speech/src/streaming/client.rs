//! Streaming recognition client.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use speech_auth::{ClientOptions, TokenProvider, TokenSource};
use tokio::io::AsyncRead;

use super::pacing::{Pacing, DEFAULT_FRAME_BYTES};
use super::session::StreamSession;
use super::transport::{DecoderTransport, GrpcTransport};
use super::StreamingConfig;
use crate::error::{invalid_request, Error};

/// Opens streaming recognition sessions over a [`DecoderTransport`].
pub struct StreamingClient<T = GrpcTransport> {
    transport: T,
    config: StreamingConfig,
    frame_bytes: usize,
}

impl StreamingClient<GrpcTransport> {
    /// Dial the configured streaming endpoint with a token provider built from `options`.
    pub async fn connect(options: &ClientOptions, connect_timeout: Duration) -> Result<Self, Error> {
        let provider = TokenProvider::new(options)?;
        Self::connect_with(
            options.streaming_endpoint(),
            Arc::new(provider),
            connect_timeout,
        )
        .await
    }

    pub async fn connect_with(
        endpoint: &str,
        source: Arc<dyn TokenSource>,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        let transport = GrpcTransport::connect(endpoint, source, connect_timeout).await?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: DecoderTransport> StreamingClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            config: StreamingConfig::default(),
            frame_bytes: DEFAULT_FRAME_BYTES,
        }
    }

    pub fn with_config(mut self, config: StreamingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_frame_bytes(mut self, frame_bytes: usize) -> Self {
        self.frame_bytes = frame_bytes;
        self
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Start a session streaming `source`, already normalized to the configured format.
    pub async fn recognize<R>(&self, source: R) -> Result<StreamSession, Error>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.config.validate()?;
        if self.frame_bytes == 0 {
            return Err(invalid_request("frame size must be positive"));
        }
        let pacing = Pacing::for_config(&self.config, self.frame_bytes);
        debug!(
            "Starting streaming session: {} byte frames every {:?}",
            pacing.frame_bytes,
            pacing.frame_delay()
        );
        StreamSession::start(&self.transport, &self.config, pacing, source).await
    }

    /// Release the transport; sessions already started keep running.
    pub fn close(self) {
        debug!("Closing streaming client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::streaming::proto::{DecoderRequest, DecoderResponse};
    use crate::streaming::transport::InboundStream;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::wrappers::ReceiverStream;

    /// Counts opened calls and ends each one as soon as the client half-closes.
    struct CountingTransport {
        opened: AtomicUsize,
    }

    #[async_trait]
    impl DecoderTransport for CountingTransport {
        async fn open(
            &self,
            mut outbound: ReceiverStream<DecoderRequest>,
        ) -> Result<InboundStream, Error> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let drained = async move { while outbound.next().await.is_some() {} };
            Ok(futures_util::stream::once(drained)
                .filter_map(|_| async { None::<Result<DecoderResponse, tonic::Status>> })
                .boxed())
        }
    }

    fn client() -> StreamingClient<CountingTransport> {
        StreamingClient::with_transport(CountingTransport {
            opened: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_invalid_config_opens_no_call() {
        let client =
            client().with_config(StreamingConfig::default().with_sample_rate(1000));
        let err = client
            .recognize(std::io::Cursor::new(vec![0u8; 16]))
            .await
            .err()
            .unwrap();

        assert_eq!(err.error_kind, ErrorKind::InvalidRequest);
        assert_eq!(client.transport.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_frame_size_rejected() {
        let client = client().with_frame_bytes(0);
        let err = client
            .recognize(std::io::Cursor::new(vec![0u8; 16]))
            .await
            .err()
            .unwrap();
        assert_eq!(err.error_kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognize_runs_session_to_completion() {
        let client = client().with_frame_bytes(8);
        let session = client
            .recognize(std::io::Cursor::new(vec![0u8; 20]))
            .await
            .unwrap();

        let summary = session.finish().await.unwrap();
        assert_eq!(summary.frames_sent, 3);
        assert_eq!(summary.bytes_sent, 20);
        assert_eq!(client.transport.opened.load(Ordering::SeqCst), 1);
    }
}
