//! Unified error type for hlsforge.
//!
//! Build-time failures (input, toolchain, encode, path resolution, alignment)
//! abort the pipeline. Playback-time failures are split into the recoverable
//! classes ([`Error::Network`], [`Error::Decode`]) that sessions retry in place
//! and the terminal ones ([`Error::UnsupportedFormat`], [`Error::FatalSession`]).

use std::path::PathBuf;

/// Unified error type covering all failure modes in hlsforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad arguments or a missing/unreadable source asset.
    #[error("Input error: {0}")]
    Input(String),

    /// A required external tool could not be located or started.
    #[error("Toolchain unavailable [{tool}]: {message}")]
    ToolchainUnavailable {
        /// Name of the missing tool.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The encoder ran but failed (non-zero exit, timeout, missing output).
    #[error("Encode failed [{tool}]: {message}")]
    EncodeFailure {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A playlist references a URI that does not resolve next to it.
    #[error("Unresolved reference in {}: {uri}", playlist.display())]
    PathResolution {
        /// Playlist containing the reference.
        playlist: PathBuf,
        /// The URI as recorded in the playlist.
        uri: String,
    },

    /// A playlist could not be parsed or is structurally invalid.
    #[error("Playlist error: {0}")]
    Playlist(String),

    /// Renditions of one source do not share segment boundaries.
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// No viable playback path exists for the source on this host.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A segment or manifest fetch failed or timed out.
    #[error("Network error: {0}")]
    Network(String),

    /// A segment could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The playback session hit an unrecoverable fault.
    #[error("Fatal session error: {0}")]
    FatalSession(String),

    /// Configuration or request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a playback session may retry in place after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Decode(_))
    }

    /// Convenience constructor for [`Error::ToolchainUnavailable`].
    pub fn toolchain(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolchainUnavailable {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::EncodeFailure`].
    pub fn encode(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::EncodeFailure {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::PathResolution`].
    pub fn unresolved(playlist: impl Into<PathBuf>, uri: impl Into<String>) -> Self {
        Error::PathResolution {
            playlist: playlist.into(),
            uri: uri.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
