#[cfg(not(feature = "streaming"))]
fn main() {
    eprintln!(
        "The voice-playback CLI requires the \"streaming\" feature. \
         Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
mod cli {
    use std::env;
    use std::f32::consts::TAU;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    use anyhow::Context;
    use tracing::{debug, info};
    use tracing_subscriber::EnvFilter;
    use voice_playback::{
        AudioDevice, CuePlayer, FrameRecycler, NullVisualizer, PlaybackBuffer, PlaybackConfig,
        QueuedVisualizer, SpeechSource, VisualEvent, Visualizer,
    };

    /// Frames the UI may lag behind before updates are dropped
    const VISUAL_QUEUE_DEPTH: usize = 32;

    /// Phrase rendered by the built-in tone voice
    const DEMO_PHRASE: &str = "voice playback visualizer check";

    /// Something the CLI can play
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Target {
        Listening,
        Transition,
        Speech,
    }

    impl FromStr for Target {
        type Err = String;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value {
                "listening" => Ok(Target::Listening),
                "transition" => Ok(Target::Transition),
                "speech" => Ok(Target::Speech),
                other => Err(format!("Unknown target: {other}")),
            }
        }
    }

    /// Stand-in synthesizer: one short tone per word, emitted as irregular chunks
    struct ToneVoice {
        sample_rate: u32,
    }

    impl SpeechSource for ToneVoice {
        type Chunks = std::vec::IntoIter<Vec<f32>>;

        fn synthesize(&mut self, text: &str) -> voice_playback::Result<Self::Chunks> {
            let rate = self.sample_rate.max(1) as f32;
            let chunks: Vec<Vec<f32>> = text
                .split_whitespace()
                .map(|word| {
                    let freq = 180.0 + 30.0 * word.len() as f32;
                    let len = (rate * word.len().clamp(2, 8) as f32 * 3.0 / 50.0).round() as usize;
                    (0..len)
                        .map(|n| 0.3 * (TAU * freq * n as f32 / rate).sin())
                        .collect()
                })
                .collect();
            Ok(chunks.into_iter())
        }
    }

    fn print_usage() {
        eprintln!(
            "Usage:
  voice-playback [--visualize] <config.json> [listening|transition|speech]...

Flags:
  --visualize    Log visualizer events (set RUST_LOG=debug to see frames)
  -h, --help     Show this help

Targets:
  listening, transition   Cue sounds from the configuration (never visualized)
  speech                  Built-in tone voice streamed like synthesized speech

With no targets, plays the listening cue followed by the transition cue.
"
        );
    }

    fn init_logging() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Drain visualizer events on a background thread, handing frames back
    fn spawn_visual_logger(
        receiver: crossbeam_channel::Receiver<VisualEvent>,
        recycler: FrameRecycler,
    ) {
        thread::spawn(move || {
            for event in receiver {
                match event {
                    VisualEvent::Load { stream } => info!(%stream, "Visualizer: load"),
                    VisualEvent::Update { stream, samples } => {
                        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                        debug!(%stream, frames = samples.len(), peak, "Visualizer: update");
                        recycler.recycle(samples);
                    }
                }
            }
        });
    }

    pub fn run() -> anyhow::Result<()> {
        init_logging();

        let mut config_path: Option<String> = None;
        let mut targets: Vec<Target> = Vec::new();
        let mut visualize = false;
        let mut show_help = false;

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--help" | "-h" => show_help = true,
                "--visualize" => visualize = true,
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown flag: {}", arg);
                    show_help = true;
                }
                _ if config_path.is_none() => config_path = Some(arg),
                _ => match arg.parse::<Target>() {
                    Ok(target) => targets.push(target),
                    Err(message) => {
                        eprintln!("{message}");
                        show_help = true;
                    }
                },
            }
        }

        let Some(config_path) = config_path.filter(|_| !show_help) else {
            print_usage();
            return Ok(());
        };
        if targets.is_empty() {
            targets = vec![Target::Listening, Target::Transition];
        }

        let config = PlaybackConfig::load(&config_path)
            .with_context(|| format!("Failed to load configuration from '{config_path}'"))?;
        let stream = config.stream_config();
        info!(config = %config_path, device = %config.audio_device, "Configuration loaded");

        let visualizer: Arc<dyn Visualizer> = if visualize {
            let (queued, receiver) = QueuedVisualizer::bounded(VISUAL_QUEUE_DEPTH);
            spawn_visual_logger(receiver, queued.recycler());
            Arc::new(queued)
        } else {
            Arc::new(NullVisualizer)
        };
        let buffer = Arc::new(PlaybackBuffer::new(stream.sample_rate, visualizer));

        // Assets must be ready before the device opens
        let cue_player = CuePlayer::from_config(&config, Arc::clone(&buffer))
            .context("Failed to prepare cue sounds")?;
        let device = AudioDevice::open(&config.audio_device, stream, Arc::clone(&buffer))
            .context("Failed to open audio output")?;

        let mut voice = ToneVoice {
            sample_rate: stream.sample_rate,
        };
        for target in targets {
            info!(?target, "Playing");
            match target {
                Target::Listening => cue_player.play_listening(),
                Target::Transition => cue_player.play_transition(),
                Target::Speech => {
                    let player = cue_player.player();
                    player
                        .speak(&mut voice, DEMO_PHRASE)
                        .context("Failed to synthesize speech")?;
                    player.buffer().await_drained();
                }
            }
        }

        // Let the final callback buffer reach the speakers
        thread::sleep(stream.callback_period());
        device.close();
        Ok(())
    }

}

#[cfg(feature = "streaming")]
fn main() -> anyhow::Result<()> {
    cli::run()
}
