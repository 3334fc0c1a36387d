//! One streaming recognition call: a paced audio producer and an ordered event consumer.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use log::*;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::proto::{DecoderRequest, DecoderResponse};
use super::transport::{DecoderTransport, InboundStream};
use super::{Pacing, StreamingConfig};
use crate::error::{stream_error, Error, ErrorKind, StreamErrorKind};

/// Messages queued between the producer and the call.
const OUTBOUND_BUFFER: usize = 8;
const EVENT_BUFFER: usize = 32;
/// A run of this many failed source reads ends the session.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 5;

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Opening the call.
    Connecting,
    /// Call open, configuration queued ahead of any audio.
    Configured,
    /// At least one audio frame sent.
    Streaming,
    /// Source exhausted and send side half-closed; waiting for the service to finish.
    Draining,
    Closed,
}

/// One recognized segment of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUtterance {
    pub text: String,
    pub confidence: f32,
    /// Partial utterances may still be replaced by a later final one.
    pub is_final: bool,
}

/// One message from the service, in receipt order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptEvent {
    pub results: Vec<StreamUtterance>,
}

impl From<DecoderResponse> for TranscriptEvent {
    fn from(response: DecoderResponse) -> Self {
        let results = response
            .results
            .into_iter()
            .filter_map(|result| {
                let is_final = result.is_final;
                result
                    .alternatives
                    .into_iter()
                    .next()
                    .map(|best| StreamUtterance {
                        text: best.text,
                        confidence: best.confidence,
                        is_final,
                    })
            })
            .collect();
        Self { results }
    }
}

/// Totals reported once both tasks have finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub events_received: u64,
}

#[derive(Debug, Default)]
struct ProducerStats {
    frames_sent: u64,
    bytes_sent: u64,
}

/// A running streaming call.
///
/// Events are read with [`StreamSession::next_event`]. [`StreamSession::finish`] waits for
/// the producer and the consumer and reports the first failure of either. Dropping the
/// session stops both tasks.
pub struct StreamSession {
    events: mpsc::Receiver<TranscriptEvent>,
    state: watch::Receiver<SessionState>,
    state_tx: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
    producer: Option<JoinHandle<Result<ProducerStats, Error>>>,
    consumer: Option<JoinHandle<Result<u64, Error>>>,
}

impl StreamSession {
    /// Queue the configuration, open the call and start both tasks.
    pub(crate) async fn start<T, R>(
        transport: &T,
        config: &StreamingConfig,
        pacing: Pacing,
        source: R,
    ) -> Result<Self, Error>
    where
        T: DecoderTransport + ?Sized,
        R: AsyncRead + Send + Unpin + 'static,
    {
        if pacing.frame_bytes == 0 {
            return Err(crate::error::invalid_request("frame size must be positive"));
        }
        let (state_tx, state) = watch::channel(SessionState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        // Queued before the call exists, so nothing can precede it.
        outbound
            .send(DecoderRequest::config(config.to_message()))
            .await
            .map_err(|_| stream_error(StreamErrorKind::Protocol, "outbound queue closed"))?;

        state_tx.send_replace(SessionState::Connecting);
        let inbound = match transport.open(ReceiverStream::new(outbound_rx)).await {
            Ok(inbound) => inbound,
            Err(e) => {
                state_tx.send_replace(SessionState::Closed);
                return Err(e);
            }
        };
        state_tx.send_replace(SessionState::Configured);
        debug!("Streaming call open at {} Hz", config.sample_rate);

        let cancel = CancellationToken::new();
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);

        let producer = tokio::spawn(produce(
            source,
            outbound,
            pacing,
            cancel.clone(),
            state_tx.clone(),
        ));
        let consumer = tokio::spawn(consume(inbound, events_tx, cancel.clone()));

        Ok(Self {
            events,
            state,
            state_tx,
            cancel,
            producer: Some(producer),
            consumer: Some(consumer),
        })
    }

    /// Next transcript event, or `None` once the service has closed the call.
    pub async fn next_event(&mut self) -> Option<TranscriptEvent> {
        self.events.recv().await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Stop sending and receiving. [`StreamSession::finish`] then reports `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for both tasks, discarding events nobody has read.
    ///
    /// A consumer failure takes precedence, since it usually causes the producer's.
    pub async fn finish(mut self) -> Result<SessionSummary, Error> {
        while self.events.recv().await.is_some() {}

        let consumed = join(self.consumer.take()).await;
        let produced = join(self.producer.take()).await;
        self.state_tx.send_replace(SessionState::Closed);

        let events_received = consumed?;
        let stats = produced?;
        let summary = SessionSummary {
            frames_sent: stats.frames_sent,
            bytes_sent: stats.bytes_sent,
            events_received,
        };
        info!(
            "Streaming session closed: {} frames, {} bytes sent, {} events received",
            summary.frames_sent, summary.bytes_sent, summary.events_received
        );
        Ok(summary)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
    }
}

async fn join<T>(handle: Option<JoinHandle<Result<T, Error>>>) -> Result<T, Error> {
    match handle {
        Some(handle) => handle.await.map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Stream(StreamErrorKind::Protocol),
        })?,
        None => Err(stream_error(
            StreamErrorKind::Protocol,
            "session task already joined",
        )),
    }
}

fn cancelled() -> Error {
    Error::new(ErrorKind::Cancelled, "streaming session cancelled")
}

/// Read fixed-size frames from `source` and forward them at playback pace.
///
/// Dropping `outbound` on return is the one and only half-close of the send side.
async fn produce<R>(
    mut source: R,
    outbound: mpsc::Sender<DecoderRequest>,
    pacing: Pacing,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
) -> Result<ProducerStats, Error>
where
    R: AsyncRead + Send + Unpin,
{
    let mut stats = ProducerStats::default();
    let mut frame = vec![0u8; pacing.frame_bytes];
    let mut read_errors = 0;
    let delay = pacing.frame_delay();

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            read = source.read(&mut frame) => read,
        };

        let read = match read {
            Ok(0) => break,
            Ok(read) => {
                read_errors = 0;
                read
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                read_errors += 1;
                warn!("Could not read audio frame: {}", e);
                if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    error!("Giving up after {} failed reads", read_errors);
                    return Err(e.into());
                }
                continue;
            }
        };

        let message = DecoderRequest::audio(Bytes::copy_from_slice(&frame[..read]));
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            sent = outbound.send(message) => sent,
        };
        if sent.is_err() {
            error!("Streaming call closed while sending audio");
            return Err(stream_error(
                StreamErrorKind::Send,
                "call closed before the audio source was exhausted",
            ));
        }

        stats.frames_sent += 1;
        stats.bytes_sent += read as u64;
        if stats.frames_sent == 1 {
            state.send_replace(SessionState::Streaming);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    drop(outbound);
    state.send_replace(SessionState::Draining);
    debug!(
        "Audio source exhausted after {} frames; send side closed",
        stats.frames_sent
    );
    Ok(stats)
}

/// Forward events in receipt order until the service closes the call.
///
/// A fatal failure here also stops the producer.
async fn consume(
    mut inbound: InboundStream,
    events: mpsc::Sender<TranscriptEvent>,
    cancel: CancellationToken,
) -> Result<u64, Error> {
    let result = receive(&mut inbound, &events, &cancel).await;
    if result.is_err() {
        cancel.cancel();
    }
    result
}

async fn receive(
    inbound: &mut InboundStream,
    events: &mpsc::Sender<TranscriptEvent>,
    cancel: &CancellationToken,
) -> Result<u64, Error> {
    let mut received = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            next = inbound.next() => next,
        };

        let response = match next {
            None => return Ok(received),
            Some(Ok(response)) => response,
            Some(Err(status)) => {
                warn!("Cannot stream results: {}", status);
                return Err(status.into());
            }
        };

        if response.error {
            error!("Service reported a recognition error");
            return Err(stream_error(
                StreamErrorKind::Recognition,
                "service flagged a recognition error",
            ));
        }

        received += 1;
        if events.send(TranscriptEvent::from(response)).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::proto::{SpeechRecognitionAlternative, StreamingRecognitionResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::ReadBuf;

    /// Replays canned responses, records every client message and closes its side once the
    /// client half-closes.
    struct FakeTransport {
        responses: Mutex<Vec<Result<DecoderResponse, tonic::Status>>>,
        received: Arc<Mutex<Vec<DecoderRequest>>>,
        half_closes: Arc<AtomicUsize>,
    }

    impl FakeTransport {
        fn new(responses: Vec<Result<DecoderResponse, tonic::Status>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                received: Arc::new(Mutex::new(Vec::new())),
                half_closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn received(&self) -> Vec<DecoderRequest> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DecoderTransport for FakeTransport {
        async fn open(
            &self,
            mut outbound: ReceiverStream<DecoderRequest>,
        ) -> Result<InboundStream, Error> {
            let responses = std::mem::take(&mut *self.responses.lock().unwrap());
            let received = self.received.clone();
            let half_closes = self.half_closes.clone();
            let (inbound_tx, inbound_rx) = mpsc::channel(16);

            tokio::spawn(async move {
                for response in responses {
                    if inbound_tx.send(response).await.is_err() {
                        break;
                    }
                }
                while let Some(message) = outbound.next().await {
                    received.lock().unwrap().push(message);
                }
                half_closes.fetch_add(1, Ordering::SeqCst);
            });

            Ok(ReceiverStream::new(inbound_rx).boxed())
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl DecoderTransport for RefusingTransport {
        async fn open(&self, _: ReceiverStream<DecoderRequest>) -> Result<InboundStream, Error> {
            Err(tonic::Status::unavailable("decoder offline").into())
        }
    }

    /// Yields scripted reads, then end of file.
    struct ScriptedReader {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    fn response(text: &str, is_final: bool) -> Result<DecoderResponse, tonic::Status> {
        Ok(DecoderResponse {
            results: vec![StreamingRecognitionResult {
                alternatives: vec![SpeechRecognitionAlternative {
                    text: text.to_string(),
                    confidence: 0.9,
                }],
                is_final,
            }],
            error: false,
        })
    }

    fn pacing() -> Pacing {
        Pacing::for_config(&StreamingConfig::default(), 1024)
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_first_then_frames_then_single_half_close() {
        let transport = FakeTransport::new(vec![]);
        let audio = vec![1u8; 1024 * 3 + 100];
        let session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            io::Cursor::new(audio),
        )
        .await
        .unwrap();
        let state = session.watch_state();

        let summary = session.finish().await.unwrap();

        let received = transport.received();
        assert!(received[0].is_config());
        let frames: Vec<usize> = received[1..]
            .iter()
            .map(|m| m.audio_content().unwrap().len())
            .collect();
        assert_eq!(frames, vec![1024, 1024, 1024, 100]);
        assert_eq!(transport.half_closes.load(Ordering::SeqCst), 1);
        assert_eq!(summary.frames_sent, 4);
        assert_eq!(summary.bytes_sent, 3172);
        assert_eq!(*state.borrow(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_source_sends_only_config() {
        let transport = FakeTransport::new(vec![]);
        let session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            io::Cursor::new(Vec::new()),
        )
        .await
        .unwrap();

        let summary = session.finish().await.unwrap();
        let received = transport.received();
        assert_eq!(received.len(), 1);
        assert!(received[0].is_config());
        assert_eq!(summary.frames_sent, 0);
        assert_eq!(transport.half_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_delivered_in_receipt_order() {
        let transport = FakeTransport::new(vec![
            response("안", false),
            response("안녕", false),
            response("안녕하세요", true),
        ]);
        let mut session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            io::Cursor::new(vec![0u8; 2048]),
        )
        .await
        .unwrap();

        let mut seen = Vec::new();
        while let Some(event) = session.next_event().await {
            for utterance in event.results {
                seen.push((utterance.text, utterance.is_final));
            }
        }
        let summary = session.finish().await.unwrap();

        assert_eq!(
            seen,
            vec![
                ("안".to_string(), false),
                ("안녕".to_string(), false),
                ("안녕하세요".to_string(), true),
            ]
        );
        assert_eq!(summary.events_received, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_paced_at_playback_rate() {
        let transport = FakeTransport::new(vec![]);
        let started = tokio::time::Instant::now();
        let session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            io::Cursor::new(vec![0u8; 1024 * 5]),
        )
        .await
        .unwrap();

        session.finish().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(64 * 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_flag_ends_receive_loop() {
        let failed = Ok(DecoderResponse {
            results: vec![],
            error: true,
        });
        let transport =
            FakeTransport::new(vec![response("first", true), failed, response("late", true)]);
        let mut session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            tokio::io::repeat(0),
        )
        .await
        .unwrap();

        let first = session.next_event().await.unwrap();
        assert_eq!(first.results[0].text, "first");
        assert!(session.next_event().await.is_none());

        let err = session.finish().await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Stream(StreamErrorKind::Recognition)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_endless_source() {
        let transport = FakeTransport::new(vec![]);
        let session = StreamSession::start(
            &transport,
            &StreamingConfig::default(),
            pacing(),
            tokio::io::repeat(0),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.state(), SessionState::Streaming);
        session.cancel();

        let err = session.finish().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_read_error_is_skipped() {
        let transport = FakeTransport::new(vec![]);
        let reader = ScriptedReader {
            reads: VecDeque::from(vec![
                Ok(vec![1; 10]),
                Err(io::Error::other("glitch")),
                Ok(vec![2; 10]),
            ]),
        };
        let session =
            StreamSession::start(&transport, &StreamingConfig::default(), pacing(), reader)
                .await
                .unwrap();

        let summary = session.finish().await.unwrap();
        assert_eq!(summary.frames_sent, 2);
        assert_eq!(summary.bytes_sent, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_read_errors_are_fatal() {
        let transport = FakeTransport::new(vec![]);
        let reader = ScriptedReader {
            reads: (0..MAX_CONSECUTIVE_READ_ERRORS)
                .map(|_| Err(io::Error::other("disk gone")))
                .collect(),
        };
        let session =
            StreamSession::start(&transport, &StreamingConfig::default(), pacing(), reader)
                .await
                .unwrap();

        let err = session.finish().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Io);
        assert_eq!(transport.half_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_failure_is_returned() {
        let result = StreamSession::start(
            &RefusingTransport,
            &StreamingConfig::default(),
            pacing(),
            io::Cursor::new(vec![0u8; 10]),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err.error_kind, ErrorKind::Stream(StreamErrorKind::Receive));
    }

    mod glob_imports {
        use crate::streaming::*;
        use crate::types::*;

        #[test]
        fn test_live_and_batch_utterances_coexist_under_globs() {
            let live = StreamUtterance {
                text: "hello".to_string(),
                confidence: 0.9,
                is_final: true,
            };
            let batch: Utterance =
                serde_json::from_str(r#"{"start_at":0,"duration":500,"msg":"hello"}"#).unwrap();
            assert_eq!(live.text, batch.msg);
        }
    }
}
