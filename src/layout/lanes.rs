//! Lane packing (overlap resolution) for one technician row.
//!
//! # Algorithm
//!
//! Deterministic greedy interval-graph coloring:
//!
//! 1. Sort spans by start ascending; ties keep input order.
//! 2. For each span, collect the already-placed spans it overlaps
//!    (`!(end <= other.start || start >= other.end)`).
//! 3. If any, flag all of them and the current span as overlapping.
//! 4. Give the current span the smallest lane not used by that set.
//!
//! Two overlapping spans never share a lane. The lane count is not
//! guaranteed minimal, only collision-free and stable across runs.
//!
//! # Complexity
//! O(n²) in the number of spans on the row, which is dozens at most.

/// A horizontal extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// Left edge (px).
    pub start: f64,
    /// Right edge (px).
    pub end: f64,
}

impl Span {
    /// Creates a span.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether two spans overlap. Touching edges do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

/// Lane assignment for one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneSlot {
    /// Vertical lane index (0 = top).
    pub lane: usize,
    /// Whether the span overlaps any other span on the row.
    pub has_overlap: bool,
}

/// Assigns a lane to every span. The result is index-aligned with `spans`.
pub fn pack_lanes(spans: &[Span]) -> Vec<LaneSlot> {
    let mut slots = vec![LaneSlot::default(); spans.len()];

    let mut order: Vec<usize> = (0..spans.len()).collect();
    // `sort_by` is stable, so equal starts keep input order
    order.sort_by(|&a, &b| spans[a].start.total_cmp(&spans[b].start));

    let mut placed: Vec<usize> = Vec::with_capacity(spans.len());
    let mut used: Vec<bool> = Vec::new();

    for &idx in &order {
        let span = spans[idx];
        used.clear();
        let mut any = false;

        for &other in &placed {
            if span.overlaps(&spans[other]) {
                any = true;
                slots[other].has_overlap = true;
                let lane = slots[other].lane;
                if lane >= used.len() {
                    used.resize(lane + 1, false);
                }
                used[lane] = true;
            }
        }

        let lane = used.iter().position(|&u| !u).unwrap_or(used.len());
        slots[idx] = LaneSlot {
            lane,
            has_overlap: any,
        };
        placed.push(idx);
    }

    slots
}

/// Highest lane index in use, 0 for an empty row.
pub fn max_lane(slots: &[LaneSlot]) -> usize {
    slots.iter().map(|s| s.lane).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn spans(v: &[(f64, f64)]) -> Vec<Span> {
        v.iter().map(|&(s, e)| Span::new(s, e)).collect()
    }

    fn random_spans(rng: &mut SmallRng, n: usize) -> Vec<Span> {
        (0..n)
            .map(|_| {
                let start = rng.random_range(0..1_900) as f64;
                let len = rng.random_range(1..240) as f64;
                Span::new(start, start + len)
            })
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(pack_lanes(&[]).is_empty());
        assert_eq!(max_lane(&[]), 0);
    }

    #[test]
    fn test_disjoint_spans_share_lane_zero() {
        let slots = pack_lanes(&spans(&[(0.0, 80.0), (80.0, 160.0), (200.0, 240.0)]));
        for s in &slots {
            assert_eq!(s.lane, 0);
            assert!(!s.has_overlap);
        }
    }

    #[test]
    fn test_two_overlapping() {
        // 09:00–10:00 and 09:30–10:30 at 80 px/h
        let slots = pack_lanes(&spans(&[(720.0, 800.0), (760.0, 840.0)]));
        assert_eq!(slots[0].lane, 0);
        assert_eq!(slots[1].lane, 1);
        assert!(slots[0].has_overlap);
        assert!(slots[1].has_overlap);
    }

    #[test]
    fn test_first_fit_reuses_freed_lane() {
        // A [0,100), B [50,150), C [100,200): C overlaps B only → lane 0
        let slots = pack_lanes(&spans(&[(0.0, 100.0), (50.0, 150.0), (100.0, 200.0)]));
        assert_eq!(slots[0].lane, 0);
        assert_eq!(slots[1].lane, 1);
        assert_eq!(slots[2].lane, 0);
        assert!(slots.iter().all(|s| s.has_overlap));
    }

    #[test]
    fn test_equal_starts_keep_input_order() {
        let slots = pack_lanes(&spans(&[(0.0, 50.0), (0.0, 100.0), (0.0, 10.0)]));
        assert_eq!(slots[0].lane, 0);
        assert_eq!(slots[1].lane, 1);
        assert_eq!(slots[2].lane, 2);
    }

    #[test]
    fn test_unsorted_input() {
        let slots = pack_lanes(&spans(&[(100.0, 200.0), (0.0, 150.0)]));
        // Sorted order places (0,150) first
        assert_eq!(slots[1].lane, 0);
        assert_eq!(slots[0].lane, 1);
    }

    #[test]
    fn test_non_overlapping_span_not_flagged() {
        let slots = pack_lanes(&spans(&[(0.0, 100.0), (50.0, 120.0), (300.0, 400.0)]));
        assert!(slots[0].has_overlap);
        assert!(slots[1].has_overlap);
        assert!(!slots[2].has_overlap);
        assert_eq!(slots[2].lane, 0);
    }

    #[test]
    fn test_max_lane() {
        let slots = pack_lanes(&spans(&[(0.0, 100.0), (10.0, 100.0), (20.0, 100.0)]));
        assert_eq!(max_lane(&slots), 2);
    }

    #[test]
    fn test_randomized_determinism() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let n = rng.random_range(0..30);
            let input = random_spans(&mut rng, n);
            assert_eq!(pack_lanes(&input), pack_lanes(&input));
        }
    }

    #[test]
    fn test_randomized_no_collision() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let n = rng.random_range(0..40);
            let input = random_spans(&mut rng, n);
            let slots = pack_lanes(&input);

            for i in 0..n {
                for j in (i + 1)..n {
                    let overlap = input[i].overlaps(&input[j]);
                    if slots[i].lane == slots[j].lane {
                        assert!(!overlap, "spans {i} and {j} collide in lane {}", slots[i].lane);
                    }
                    if overlap {
                        assert!(slots[i].has_overlap && slots[j].has_overlap);
                    }
                }
            }
        }
    }
}
