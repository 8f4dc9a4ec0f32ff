//! Cross-rendition segment boundary checks.
//!
//! A player switches renditions at segment boundaries, so every variant of a
//! source must cut its segments at the same timestamps. Only the tail may
//! differ: one rendition can carry a single extra (short) segment when the
//! encoder rounds the last frame differently.

use hf_core::{Error, Result};

use crate::hls::MediaPlaylist;

/// Default tolerance, in seconds, for matching boundaries across renditions.
pub const DEFAULT_BOUNDARY_TOLERANCE: f64 = 0.1;

/// Summary of a successful alignment check.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    pub renditions: usize,
    pub min_segments: usize,
    pub max_segments: usize,
    /// Largest boundary difference observed, in seconds.
    pub max_drift: f64,
}

/// Verify that all `playlists` share segment boundaries within `tolerance`.
pub fn check_alignment(playlists: &[MediaPlaylist], tolerance: f64) -> Result<AlignmentReport> {
    let Some(reference) = playlists.first() else {
        return Err(Error::Alignment("no renditions to compare".into()));
    };

    let counts: Vec<usize> = playlists.iter().map(|p| p.segments.len()).collect();
    let min_segments = counts.iter().copied().min().unwrap_or(0);
    let max_segments = counts.iter().copied().max().unwrap_or(0);

    if min_segments == 0 {
        return Err(Error::Alignment("a rendition has no segments".into()));
    }
    if max_segments - min_segments > 1 {
        return Err(Error::Alignment(format!(
            "segment counts differ by more than one: {counts:?}"
        )));
    }

    // Boundary i is the start of segment i. The end of the shortest
    // rendition is its tail and is allowed to differ.
    let expected = reference.boundaries();
    let mut max_drift: f64 = 0.0;
    for (rendition, playlist) in playlists.iter().enumerate().skip(1) {
        let actual = playlist.boundaries();
        for i in 0..min_segments {
            let drift = (expected[i] - actual[i]).abs();
            if drift > tolerance {
                return Err(Error::Alignment(format!(
                    "rendition {rendition} segment {i} starts at {:.3}s, expected {:.3}s",
                    actual[i], expected[i]
                )));
            }
            max_drift = max_drift.max(drift);
        }
    }

    tracing::debug!(
        renditions = playlists.len(),
        min_segments,
        max_segments,
        max_drift,
        "Renditions aligned"
    );

    Ok(AlignmentReport {
        renditions: playlists.len(),
        min_segments,
        max_segments,
        max_drift,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::Segment;

    fn playlist(durations: &[f64]) -> MediaPlaylist {
        let segments = durations
            .iter()
            .enumerate()
            .map(|(i, &duration)| Segment {
                duration,
                uri: format!("segment_{i:03}.ts"),
                title: None,
            })
            .collect();
        MediaPlaylist::vod(6, segments)
    }

    #[test]
    fn identical_ladders_align() {
        let p = playlist(&[6.0, 6.0, 6.0, 6.0, 6.0]);
        let report = check_alignment(&[p.clone(), p.clone(), p.clone(), p], DEFAULT_BOUNDARY_TOLERANCE)
            .unwrap();
        assert_eq!(report.renditions, 4);
        assert_eq!(report.min_segments, 5);
        assert_eq!(report.max_segments, 5);
        assert_eq!(report.max_drift, 0.0);
    }

    #[test]
    fn one_extra_tail_segment_is_tolerated() {
        let a = playlist(&[6.0, 6.0, 6.0]);
        let b = playlist(&[6.0, 6.0, 5.96, 0.04]);
        let report = check_alignment(&[a, b], DEFAULT_BOUNDARY_TOLERANCE).unwrap();
        assert_eq!(report.min_segments, 3);
        assert_eq!(report.max_segments, 4);
    }

    #[test]
    fn small_drift_within_tolerance() {
        let a = playlist(&[6.0, 6.0, 6.0]);
        let b = playlist(&[6.04, 5.98, 6.0]);
        let report = check_alignment(&[a, b], DEFAULT_BOUNDARY_TOLERANCE).unwrap();
        assert!(report.max_drift > 0.03 && report.max_drift < 0.05);
    }

    #[test]
    fn shifted_boundary_is_rejected() {
        let a = playlist(&[6.0, 6.0, 6.0]);
        let b = playlist(&[6.0, 6.5, 5.5]);
        let err = check_alignment(&[a, b], DEFAULT_BOUNDARY_TOLERANCE).unwrap_err();
        assert!(matches!(err, Error::Alignment(_)));
        assert!(err.to_string().contains("segment 2"));
    }

    #[test]
    fn count_gap_over_one_is_rejected() {
        let a = playlist(&[6.0, 6.0, 6.0, 6.0]);
        let b = playlist(&[12.0, 12.0]);
        assert!(check_alignment(&[a, b], DEFAULT_BOUNDARY_TOLERANCE).is_err());
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(check_alignment(&[], DEFAULT_BOUNDARY_TOLERANCE).is_err());
        assert!(check_alignment(&[playlist(&[])], DEFAULT_BOUNDARY_TOLERANCE).is_err());
    }
}
