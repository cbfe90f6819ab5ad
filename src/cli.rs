use clap::Parser;
use std::path::PathBuf;

/// Headless multi-stream video player harness
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video files to play concurrently (one playback engine per file,
    /// up to the deck size)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Number of engine slots in the deck
    #[arg(short = 'n', long = "slots", value_name = "N", default_value = "4")]
    pub slots: usize,

    /// How long to run before closing all engines, in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECS", default_value = "10")]
    pub duration: f64,

    /// Restart a stream when it finishes instead of leaving it paused
    #[arg(short = 'o', long = "loop")]
    pub loop_playback: bool,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
