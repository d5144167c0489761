//! gesture-trigger - run a host action when a fist is held in front of the camera
//!
//! Reads landmark frames from a hand tracker (file or stdin) and drives a
//! detection session until the stream ends.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};

use gesture_trigger::action::{Action, ActionKind, DryRun};
use gesture_trigger::frame_source::{FrameSource, SexpFrameSource};
use gesture_trigger::session::{DetectionSession, SessionConfig};
use gesture_trigger::GestureError;

#[derive(Parser, Debug)]
#[command(name = "gesture-trigger", about = "Fist gesture detection and action trigger")]
struct Cli {
    /// Landmark frame file (one s-expression per line); stdin if omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Minimum seconds between triggered actions
    #[arg(long, default_value_t = 1.0)]
    cooldown: f64,

    /// Consecutive fist frames required before the gesture counts
    #[arg(long, default_value_t = 3)]
    frames: u32,

    /// Thumb-tip to index-base distance (normalized) for a closed thumb
    #[arg(long, default_value_t = 0.1)]
    thumb_threshold: f32,

    /// Request 1280x720 capture instead of 640x480
    #[arg(long)]
    high_resolution: bool,

    /// Camera index used by the capture collaborator
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Action to run when the gesture fires
    #[arg(long, value_enum, default_value = "notify")]
    action: ActionKind,

    /// Program and arguments for the launch action
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    command: Vec<String>,

    /// Flip landmarks horizontally (for frames not mirrored before tracking)
    #[arg(long)]
    mirror: bool,

    /// Log actions instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gesture-trigger {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_trigger=info".into()),
        )
        .init();

    info!("gesture-trigger v{} starting", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig {
        cooldown_secs: cli.cooldown,
        required_consecutive_frames: cli.frames,
        thumb_closed_threshold: cli.thumb_threshold,
        high_resolution: cli.high_resolution,
    };
    let res = config.capture_resolution();
    info!("camera {} at {}x{}", cli.camera, res.width, res.height);

    let action = build_action(cli.action, &cli.command, cli.dry_run);

    let mut session =
        DetectionSession::new(config, action).context("invalid session configuration")?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => {
            info!("reading frames from stdin");
            Box::new(BufReader::new(io::stdin()))
        }
    };
    let mut source = SexpFrameSource::new(reader).with_mirror(cli.mirror);

    run(&mut session, &mut source)?;

    info!("frame stream ended");
    println!("{}", session.status_sexp());
    Ok(())
}

/// Build the selected action, wrapped for dry runs.
fn build_action(kind: ActionKind, command: &[String], dry_run: bool) -> Box<dyn Action> {
    if !command.is_empty() && kind != ActionKind::Launch {
        warn!(
            "--command is only used by the launch action, ignoring it for {:?}",
            kind
        );
    }
    let action = kind.build(command);
    if dry_run {
        Box::new(DryRun::new(action))
    } else {
        action
    }
}

/// Drive the session until the source is exhausted.  Bad frames are
/// logged and skipped; I/O failures end the loop.
fn run(session: &mut DetectionSession, source: &mut impl FrameSource) -> anyhow::Result<()> {
    loop {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if frame.hand_count > 1 {
                    debug!("{} hands in frame, using the first", frame.hand_count);
                }
                session.process_frame(&frame);
            }
            Ok(None) => return Ok(()),
            Err(GestureError::Io(e)) => {
                error!("failed to read frame: {}", e);
                return Err(e).context("frame source failed");
            }
            Err(e) => warn!("skipping frame: {}", e),
        }
    }
}
