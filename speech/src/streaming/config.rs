//! Streaming recognition configuration.

use super::proto::{decoder_config::AudioEncoding, DecoderConfig};
use crate::error::{invalid_request, Error};

/// Audio encoding of the frames sent on a streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Signed 16-bit little-endian PCM.
    #[default]
    Linear16,
    Flac,
    Mulaw,
    Alaw,
}

impl Encoding {
    /// Nominal bytes per sample, used for pacing.
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            Encoding::Linear16 | Encoding::Flac => 2,
            Encoding::Mulaw | Encoding::Alaw => 1,
        }
    }
}

impl From<Encoding> for AudioEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Linear16 => AudioEncoding::Linear16,
            Encoding::Flac => AudioEncoding::Flac,
            Encoding::Mulaw => AudioEncoding::Mulaw,
            Encoding::Alaw => AudioEncoding::Alaw,
        }
    }
}

/// Configuration sent once, as the first message of every streaming call.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub sample_rate: u32,
    pub encoding: Encoding,
    pub model_name: Option<String>,
    pub use_itn: Option<bool>,
    pub use_disfluency_filter: Option<bool>,
    pub use_profanity_filter: Option<bool>,
    pub keywords: Vec<String>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            encoding: Encoding::Linear16,
            model_name: None,
            use_itn: Some(true),
            use_disfluency_filter: Some(false),
            use_profanity_filter: Some(false),
            keywords: Vec::new(),
        }
    }
}

impl StreamingConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(8000..=48000).contains(&self.sample_rate) {
            return Err(invalid_request(&format!(
                "sample rate {} is outside 8000..=48000",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Audio bytes per second at this rate and encoding.
    pub fn bytes_per_second(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.encoding.bytes_per_sample())
    }

    pub(crate) fn to_message(&self) -> DecoderConfig {
        DecoderConfig {
            sample_rate: self.sample_rate as i32,
            encoding: AudioEncoding::from(self.encoding) as i32,
            model_name: self.model_name.clone(),
            use_itn: self.use_itn,
            use_disfluency_filter: self.use_disfluency_filter,
            use_profanity_filter: self.use_profanity_filter,
            keywords: self.keywords.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = StreamingConfig::default();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.encoding, Encoding::Linear16);
        assert_eq!(config.use_itn, Some(true));
        assert_eq!(config.use_profanity_filter, Some(false));
        assert_eq!(config.bytes_per_second(), 16000);
    }

    #[test]
    fn test_message_carries_flags() {
        let message = StreamingConfig::default()
            .with_encoding(Encoding::Mulaw)
            .to_message();
        assert_eq!(message.sample_rate, 8000);
        assert_eq!(message.encoding, AudioEncoding::Mulaw as i32);
        assert_eq!(message.use_itn, Some(true));
        assert_eq!(message.use_disfluency_filter, Some(false));
        assert_eq!(message.model_name, None);
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        let err = StreamingConfig::default()
            .with_sample_rate(4000)
            .validate()
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::InvalidRequest);
    }
}
