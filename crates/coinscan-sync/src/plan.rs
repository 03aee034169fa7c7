//! Batch planning: partitioning a height range into bounded batches.
//!
//! The plan tiles `[start, end]` with contiguous batches of at most
//! `batch_size` heights each, strictly increasing, no overlap, no gaps.

/// One contiguous batch of block heights, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: i64,
    pub end: i64,
}

impl Batch {
    /// Number of heights this batch covers.
    pub fn heights(&self) -> u64 {
        (self.end - self.start + 1) as u64
    }
}

/// Iterator over the batches covering `[start, end]`.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    next: i64,
    end: i64,
    batch_size: u64,
}

impl BatchPlan {
    /// Plan batches of `batch_size` heights over `[start, end]`.
    ///
    /// An inverted range yields an empty plan; `batch_size` must be at
    /// least 1 (validated upstream by the driver's config).
    pub fn new(start: i64, end: i64, batch_size: u64) -> Self {
        Self {
            next: start,
            end,
            batch_size: batch_size.max(1),
        }
    }
}

impl Iterator for BatchPlan {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.next > self.end {
            return None;
        }
        let start = self.next;
        let end = start
            .saturating_add(self.batch_size as i64 - 1)
            .min(self.end);
        self.next = end + 1;
        Some(Batch { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_range_exactly() {
        // Empty store, max height 2500, batch 1000.
        let batches: Vec<Batch> = BatchPlan::new(0, 2500, 1000).collect();
        assert_eq!(
            batches,
            vec![
                Batch { start: 0, end: 999 },
                Batch { start: 1000, end: 1999 },
                Batch { start: 2000, end: 2500 },
            ]
        );
    }

    #[test]
    fn no_gaps_no_overlaps_full_coverage() {
        let batches: Vec<Batch> = BatchPlan::new(17, 4242, 97).collect();
        assert_eq!(batches.first().unwrap().start, 17);
        assert_eq!(batches.last().unwrap().end, 4242);
        for pair in batches.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + 1);
        }
        let covered: u64 = batches.iter().map(Batch::heights).sum();
        assert_eq!(covered, 4242 - 17 + 1);
    }

    #[test]
    fn single_height_range() {
        let batches: Vec<Batch> = BatchPlan::new(5, 5, 1000).collect();
        assert_eq!(batches, vec![Batch { start: 5, end: 5 }]);
        assert_eq!(batches[0].heights(), 1);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert_eq!(BatchPlan::new(10, 9, 1000).count(), 0);
    }

    #[test]
    fn exact_multiple_has_no_stub_batch() {
        let batches: Vec<Batch> = BatchPlan::new(0, 1999, 1000).collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], Batch { start: 1000, end: 1999 });
    }
}
