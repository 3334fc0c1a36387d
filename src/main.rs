use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::*;
use service::{config, config::Config, logging::Logger};
use speech::audio::{FfmpegTranscoder, PcmFile, Transcoder};
use speech::{
    BatchClient, Error, ErrorKind, PollPolicy, RecognitionAudio, RecognitionConfig,
    RecognizeRequest, StreamingClient, StreamingConfig, TranscriptEvent,
};
use speech_auth::TokenProvider;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(author, version, about = "Transcribe audio with the batch or streaming speech API")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a file as a batch job and wait for its transcript
    Batch {
        /// Local audio file
        audio: PathBuf,
        /// Recognition model name
        #[arg(long)]
        model: Option<String>,
        /// Separate speakers in the transcript
        #[arg(long)]
        diarize: bool,
        /// Keyword to boost; repeat for more
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },
    /// Stream a file in real time and print transcript events as they arrive
    Stream {
        /// Local audio file
        audio: PathBuf,
        /// The file is already mono 16-bit PCM at the configured sample rate
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli: Cli = config::load();
    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Batch {
            audio,
            model,
            diarize,
            keywords,
        } => {
            let recognition = RecognitionConfig {
                model_name: model,
                use_diarization: diarize.then_some(true),
                keywords,
                ..Default::default()
            };
            run_batch(&cli.config, audio, recognition).await
        }
        Command::Stream { audio, raw } => run_stream(&cli.config, audio, raw).await,
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn token_provider(config: &Config) -> Result<Arc<TokenProvider>, Error> {
    let margin = chrono::Duration::from_std(config.token_refresh_margin()).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Configuration,
    })?;
    let provider = TokenProvider::new(&config.client_options())?.with_refresh_margin(margin);
    Ok(Arc::new(provider))
}

async fn run_batch(
    config: &Config,
    audio: PathBuf,
    recognition: RecognitionConfig,
) -> Result<(), Error> {
    let options = config.client_options();
    let policy = PollPolicy::default()
        .with_interval(config.poll_interval())
        .with_max_attempts(config.max_poll_attempts())
        .with_deadline(config.poll_deadline());
    let client = BatchClient::with_token_source(token_provider(config)?, options.rest_endpoint())?
        .with_http_settings(Some(config.http_timeout()), 3)?
        .with_poll_policy(policy);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling batch job polling");
            interrupt.cancel();
        }
    });

    info!("Submitting {} to {}", audio.display(), client.endpoint());
    let request = RecognizeRequest::new(recognition, RecognitionAudio::from_file(audio));
    let response = client
        .recognize_with(&request, client.poll_policy(), &cancel)
        .await?;

    for utterance in response.results.map(|r| r.utterances).unwrap_or_default() {
        println!(
            "[{:>7.2}s] speaker {}: {}",
            utterance.start_at as f64 / 1000.0,
            utterance.spk,
            utterance.msg
        );
    }
    client.close();
    Ok(())
}

async fn run_stream(config: &Config, audio: PathBuf, raw: bool) -> Result<(), Error> {
    let source = if raw {
        PcmFile::open(&audio).await?
    } else {
        FfmpegTranscoder::default()
            .normalize(&audio, config.sample_rate)
            .await?
    };

    let options = config.client_options();
    let client = StreamingClient::connect_with(
        options.streaming_endpoint(),
        token_provider(config)?,
        config.connect_timeout(),
    )
    .await?
    .with_config(StreamingConfig::default().with_sample_rate(config.sample_rate))
    .with_frame_bytes(config.frame_bytes);

    let mut session = client.recognize(source).await?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let interrupted = loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => print_event(&event),
                None => break false,
            },
            _ = &mut ctrl_c => break true,
        }
    };
    if interrupted {
        warn!("Interrupted; stopping the streaming session");
        session.cancel();
    }

    let summary = session.finish().await?;
    info!(
        "Sent {} frames ({} bytes), received {} events",
        summary.frames_sent, summary.bytes_sent, summary.events_received
    );
    client.close();
    Ok(())
}

fn print_event(event: &TranscriptEvent) {
    for utterance in &event.results {
        if utterance.is_final {
            println!("final: {}", utterance.text);
        } else {
            println!("{}", utterance.text);
        }
    }
}
