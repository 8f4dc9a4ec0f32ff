//! HLS playlist model.
//!
//! Master playlists list the variants of one source with their bandwidth
//! metadata; media playlists list the segments of one variant. Only closed
//! (VOD) media playlists are produced by the pipeline.

mod generator;
pub(crate) mod parser;
mod types;

pub use generator::{generate_master_playlist, generate_media_playlist};
pub use parser::{parse_master_playlist, parse_media_playlist, parse_playlist};
pub use types::{MasterPlaylist, MediaPlaylist, Playlist, PlaylistType, Segment, VariantStream};
