//! Messages and client stub for the `online_decoder.OnlineDecoder/Decode` call.

use bytes::Bytes;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

/// Client message. The first one on a call carries the configuration, the rest audio.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DecoderRequest {
    #[prost(oneof = "decoder_request::StreamingRequest", tags = "1, 2")]
    pub streaming_request: Option<decoder_request::StreamingRequest>,
}

pub mod decoder_request {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum StreamingRequest {
        #[prost(message, tag = "1")]
        StreamingConfig(super::DecoderConfig),
        #[prost(bytes = "bytes", tag = "2")]
        AudioContent(bytes::Bytes),
    }
}

impl DecoderRequest {
    pub fn config(config: DecoderConfig) -> Self {
        Self {
            streaming_request: Some(decoder_request::StreamingRequest::StreamingConfig(config)),
        }
    }

    pub fn audio(frame: Bytes) -> Self {
        Self {
            streaming_request: Some(decoder_request::StreamingRequest::AudioContent(frame)),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self.streaming_request,
            Some(decoder_request::StreamingRequest::StreamingConfig(_))
        )
    }

    pub fn audio_content(&self) -> Option<&Bytes> {
        match &self.streaming_request {
            Some(decoder_request::StreamingRequest::AudioContent(frame)) => Some(frame),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DecoderConfig {
    #[prost(int32, tag = "1")]
    pub sample_rate: i32,
    #[prost(enumeration = "decoder_config::AudioEncoding", tag = "2")]
    pub encoding: i32,
    #[prost(string, optional, tag = "3")]
    pub model_name: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub use_itn: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub use_disfluency_filter: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub use_profanity_filter: Option<bool>,
    #[prost(string, repeated, tag = "7")]
    pub keywords: Vec<String>,
}

pub mod decoder_config {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum AudioEncoding {
        Linear16 = 0,
        Flac = 1,
        Mulaw = 2,
        Alaw = 3,
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DecoderResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<StreamingRecognitionResult>,
    /// Set by the service when recognition failed for this call.
    #[prost(bool, tag = "2")]
    pub error: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StreamingRecognitionResult {
    #[prost(message, repeated, tag = "1")]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    #[prost(bool, tag = "2")]
    pub is_final: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SpeechRecognitionAlternative {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(float, tag = "2")]
    pub confidence: f32,
}

const DECODE_PATH: &str = "/online_decoder.OnlineDecoder/Decode";

#[derive(Debug, Clone)]
pub struct OnlineDecoderClient {
    inner: tonic::client::Grpc<Channel>,
}

impl OnlineDecoderClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Open a bidirectional decode call.
    pub async fn decode(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = DecoderRequest>,
    ) -> Result<tonic::Response<tonic::codec::Streaming<DecoderResponse>>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {}", e)))?;
        let codec = tonic::codec::ProstCodec::<DecoderRequest, DecoderResponse>::default();
        let path = PathAndQuery::from_static(DECODE_PATH);
        let mut request = request.into_streaming_request();
        request
            .extensions_mut()
            .insert(tonic::GrpcMethod::new("online_decoder.OnlineDecoder", "Decode"));
        self.inner.streaming(request, path, codec).await
    }
}
