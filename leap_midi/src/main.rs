//! leap_midi: command-line entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use gesture_midi::{Emitter, LogSink, MidiSink};
use leap_midi::{
    output, spawn_frame_source, Config, Engine, FrameSource, PolicyKind, ReplaySource, SweepSource,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Synthetic hands bobbing up and down.
    Sweep,
    /// Frames recorded as JSON lines (`--input`).
    Replay,
    /// LeapMotion hardware (needs the `leap` feature).
    Leap,
}

/// Turn LeapMotion hand gestures into live MIDI.
#[derive(Parser, Debug)]
#[command(name = "leap_midi", version, about)]
struct Args {
    /// Gesture mapping to run.
    #[arg(long, value_enum, default_value_t = PolicyKind::Cc)]
    policy: PolicyKind,

    /// TOML configuration file; built-in defaults otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where tracking frames come from.
    #[arg(long, value_enum, default_value_t = SourceKind::Sweep)]
    source: SourceKind,

    /// Frame file for `--source replay`.
    #[arg(long)]
    input: Option<PathBuf>,

    /// MIDI output port (case-insensitive substring); overrides the config.
    #[arg(long)]
    port: Option<String>,

    /// Log MIDI messages instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Sweep duration in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// List MIDI output ports and exit.
    #[arg(long)]
    list_ports: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_ports {
        for (i, name) in output::list_ports().iter().enumerate() {
            println!("{i}: {name}");
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let policy = args.policy.build(&config)
        .with_context(|| format!("building the {} policy", args.policy))?;

    let sink: Box<dyn MidiSink> = if args.dry_run {
        Box::new(LogSink)
    } else {
        let wanted = args.port.as_deref().or(config.output.port.as_deref());
        output::open_output(wanted)
    };

    let source = frame_source(&args)?;
    info!(policy = %args.policy, source = source.name(), "starting");

    let (rx, handle) = spawn_frame_source(source);
    let mut engine = Engine::new(policy, Emitter::new(sink));
    let stats = engine.run(rx);

    match handle.join() {
        Ok(result) => result.context("frame source stopped")?,
        Err(_) => bail!("frame source thread panicked"),
    }

    info!(frames = stats.frames, sent = stats.sent, stuck = stats.stuck, "done");
    Ok(())
}

fn frame_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    Ok(match args.source {
        SourceKind::Sweep => Box::new(SweepSource {
            duration: Duration::from_secs(args.seconds),
            ..SweepSource::default()
        }),
        SourceKind::Replay => {
            let Some(path) = &args.input else {
                bail!("--source replay needs --input <file>");
            };
            Box::new(ReplaySource::new(path).realtime(true))
        }
        #[cfg(feature = "leap")]
        SourceKind::Leap => Box::new(leap_midi::source::LeapSource::default()),
        #[cfg(not(feature = "leap"))]
        SourceKind::Leap => bail!("built without LeapMotion support; rebuild with --features leap"),
    })
}
