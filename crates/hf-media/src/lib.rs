//! hf-media: the manifest/playlist model for segmented HLS output.
//!
//! Everything here is pure data plus filesystem checks; nothing in this crate
//! invokes an encoder, so layouts produced elsewhere can be verified in
//! isolation.
//!
//! # Modules
//!
//! - [`hls`] - Master and media playlist types, M3U8 generation and parsing
//! - [`layout`] - Naming of the deployed artifact tree
//! - [`paths`] - Relative-path normalization and reference validation
//! - [`alignment`] - Cross-rendition segment boundary checks
//! - [`verify`] - Whole-artifact verification of a published master

pub mod alignment;
pub mod hls;
pub mod layout;
pub mod paths;
pub mod verify;

// Re-export commonly used items at the crate root.
pub use alignment::{check_alignment, AlignmentReport, DEFAULT_BOUNDARY_TOLERANCE};
pub use hls::{
    generate_master_playlist, generate_media_playlist, parse_master_playlist,
    parse_media_playlist, parse_playlist, MasterPlaylist, MediaPlaylist, Playlist, PlaylistType,
    Segment, VariantStream,
};
pub use layout::{discover_layouts, OutputLayout};
pub use paths::{
    check_references, ensure_resolved, normalize_layout, prefix_bare_uris, NormalizeReport,
    UnresolvedReference,
};
pub use verify::{verify_master, VerifyReport};
