//! Encoder actions: ladder argument construction and progress parsing.

mod ladder;
mod progress;

pub use ladder::{build_filter_graph, build_ladder_args, build_var_stream_map};
pub use progress::{EncodeProgress, ProgressParser};
