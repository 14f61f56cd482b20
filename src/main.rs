use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use fishtrack::{DetectorConfig, FishTracker, FishTrackerConfig, ProcessOptions};

#[derive(Parser, Debug)]
#[command(name = "fishtrack", about = "Track fish in video via background subtraction")]
struct Args {
    /// Path to input video file
    video: PathBuf,
    /// Path to output video file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Minimum area (pixels^2) for fish detection
    #[arg(long, default_value_t = 500.0)]
    min_area: f64,
    /// Background subtractor history length in frames
    #[arg(long, default_value_t = 500)]
    history: i32,
    /// Background subtractor variance threshold
    #[arg(long, default_value_t = 16.0)]
    var_threshold: f64,
    /// Classify and exclude shadow pixels
    #[arg(long)]
    detect_shadows: bool,
    /// Frames a fish may go undetected before its track is dropped
    #[arg(long, default_value_t = 50)]
    max_disappeared: u32,
    /// Do not display video during processing
    #[arg(long)]
    no_display: bool,
    /// Write JSONL tracking events to this path
    #[arg(long)]
    log_json: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    log_interval_seconds: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let config = FishTrackerConfig {
        detector: DetectorConfig {
            min_area: args.min_area,
            history: args.history,
            var_threshold: args.var_threshold,
            detect_shadows: args.detect_shadows,
        },
        max_disappeared: args.max_disappeared,
    };
    let mut tracker = FishTracker::new(&config)?;

    let source = args.video.to_string_lossy().to_string();
    let options = ProcessOptions {
        output: args.output.clone(),
        display: !args.no_display,
        log_json: args.log_json.clone(),
        log_interval_seconds: args.log_interval_seconds,
    };

    tracing::info!("Processing video: {}", source);
    let frame_count = tracker.process_video(&source, &options)?;
    tracing::info!(
        "Processed {} frames, {} unique fish",
        frame_count,
        tracker.total_unique()
    );
    if let Some(output) = args.output.as_ref() {
        tracing::info!("Output saved to: {}", output.display());
    }
    Ok(())
}
