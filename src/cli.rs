use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlsforge")]
#[command(author, version, about = "Adaptive HLS ladder encoder and layout checker")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a source into a segmented multi-rendition HLS ladder
    Convert {
        /// Source video file
        #[arg(required = true)]
        input: PathBuf,

        /// Where to write the ladder (defaults to the input's directory)
        output_dir: Option<PathBuf>,

        /// Segment duration in seconds
        #[arg(long)]
        segment_duration: Option<u32>,

        /// x264 preset
        #[arg(long)]
        preset: Option<String>,
    },

    /// Prefix bare segment and variant paths in deployed ladders
    FixPaths {
        /// Directory to scan for ladders
        #[arg(required = true)]
        dir: PathBuf,
    },

    /// Check references and segment alignment below a master playlist
    Verify {
        /// Published master playlist
        #[arg(required = true)]
        master: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
