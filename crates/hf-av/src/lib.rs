//! # hf-av
//!
//! Segmentation pipeline and external tool management for hlsforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   cancellation and streamed stderr for running external processes.
//! - **Source probing** ([`FfprobeProber`]) -- duration, audio presence and
//!   dimensions of the source.
//! - **Actions** ([`actions`]) -- the multi-rendition ffmpeg argument builder
//!   and `-progress` parsing.
//! - **Pipeline** ([`segment_source`]) -- encode, publish, normalize and
//!   verify one source.

pub mod actions;
pub mod command;
pub mod pipeline;
pub mod probe;
pub mod tools;

// ---- Re-exports for convenience ----

pub use actions::{build_ladder_args, EncodeProgress, ProgressParser};
pub use command::{ToolCommand, ToolOutput};
pub use pipeline::{publish_master, segment_source, LadderOutput, LadderRequest};
pub use probe::{parse_probe_json, FfprobeProber, SourceProbe};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
