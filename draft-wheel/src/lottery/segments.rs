// Cumulative wheel segments and position resolution.

use serde::{Deserialize, Serialize};

use super::probability::Distribution;

/// Width of the position domain. Positions run over `[0, POSITION_DOMAIN]`.
pub const POSITION_DOMAIN: f64 = 100.0;

/// A player's slice of the wheel, as cumulative percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub player: String,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Lay the distribution out as contiguous segments in its iteration order.
pub fn build_segments(distribution: &Distribution) -> Vec<Segment> {
    let mut current = 0.0;
    distribution
        .iter()
        .map(|(player, probability)| {
            let start = current;
            current += probability * POSITION_DOMAIN;
            Segment {
                player: player.to_string(),
                start,
                end: current,
            }
        })
        .collect()
}

/// The player whose segment contains `position`.
///
/// Segments are half-open (`start <= position < end`). The top of the domain
/// belongs to the last segment with non-zero width, which also absorbs any
/// floating-point shortfall in the final `end`. Positions outside the domain
/// resolve to nobody.
pub fn resolve(position: f64, segments: &[Segment]) -> Option<&str> {
    if !(0.0..=POSITION_DOMAIN).contains(&position) {
        return None;
    }

    if let Some(seg) = segments
        .iter()
        .find(|s| s.start <= position && position < s.end)
    {
        return Some(seg.player.as_str());
    }

    let last = segments
        .iter()
        .rev()
        .find(|s| s.width() > 0.0)
        .or_else(|| segments.last())?;
    (position >= last.end).then_some(last.player.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::approx_eq;

    fn dist(entries: &[(&str, f64)]) -> Distribution {
        Distribution::from_entries(entries.iter().map(|(n, p)| (n.to_string(), *p)).collect())
    }

    #[test]
    fn segments_are_contiguous_and_cover_domain() {
        let segments = build_segments(&dist(&[("A", 0.2), ("B", 0.5), ("C", 0.3)]));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start, 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start <= pair[0].end);
        }
        assert!(approx_eq(segments[2].end, 100.0, 1e-9));
        assert!(approx_eq(segments[1].width(), 50.0, 1e-9));
    }

    #[test]
    fn segments_follow_distribution_order() {
        let segments = build_segments(&dist(&[("Z", 0.5), ("A", 0.5)]));
        assert_eq!(segments[0].player, "Z");
        assert_eq!(segments[1].player, "A");
    }

    #[test]
    fn empty_distribution_has_no_segments() {
        assert!(build_segments(&Distribution::default()).is_empty());
        assert_eq!(resolve(50.0, &[]), None);
    }

    #[test]
    fn resolve_uses_half_open_bounds() {
        let segments = build_segments(&dist(&[("A", 0.25), ("B", 0.75)]));
        assert_eq!(resolve(0.0, &segments), Some("A"));
        assert_eq!(resolve(24.999, &segments), Some("A"));
        assert_eq!(resolve(25.0, &segments), Some("B"));
        assert_eq!(resolve(99.999, &segments), Some("B"));
    }

    #[test]
    fn top_of_domain_clamps_to_last_segment() {
        let segments = build_segments(&dist(&[("A", 0.5), ("B", 0.5)]));
        assert_eq!(resolve(100.0, &segments), Some("B"));
    }

    #[test]
    fn float_shortfall_resolves_to_last_segment() {
        let segments = vec![
            Segment { player: "A".into(), start: 0.0, end: 33.333333 },
            Segment { player: "B".into(), start: 33.333333, end: 99.9999999 },
        ];
        assert_eq!(resolve(99.99999995, &segments), Some("B"));
    }

    #[test]
    fn zero_width_tail_is_skipped_at_the_top() {
        let segments = build_segments(&dist(&[("A", 1.0), ("B", 0.0)]));
        assert_eq!(resolve(100.0, &segments), Some("A"));
    }

    #[test]
    fn out_of_domain_positions_resolve_to_nobody() {
        let segments = build_segments(&dist(&[("A", 1.0)]));
        assert_eq!(resolve(-0.1, &segments), None);
        assert_eq!(resolve(100.1, &segments), None);
        assert_eq!(resolve(f64::NAN, &segments), None);
    }

    #[test]
    fn resolve_is_total_over_the_domain() {
        let segments = build_segments(&dist(&[("A", 0.1), ("B", 0.2), ("C", 0.3), ("D", 0.4)]));
        let mut position = 0.0;
        while position < 100.0 {
            assert!(resolve(position, &segments).is_some(), "no winner at {position}");
            position += 0.37;
        }
    }
}
