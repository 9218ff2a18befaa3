//! Chunk planning for large documents.
//!
//! Partitions a document's page range into bounded work units so very
//! large PDFs can be extracted without holding the whole document's
//! working set at once. Chunk boundaries are derived from the target
//! chunk size and an estimated bytes-per-page figure.

use super::processor::ProcessError;

/// A contiguous half-open page-index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Number of pages in the range.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Iterate over the page indices in the range.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..self.end
    }
}

/// Plans page ranges that partition `[0, page_count)` exactly once.
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    chunk_size_bytes: u64,
}

impl ChunkPlanner {
    pub fn new(chunk_size_bytes: u64) -> Self {
        Self { chunk_size_bytes }
    }

    /// Plan chunks for a document of `page_count` pages and `byte_size`
    /// bytes.
    ///
    /// Documents at or below the chunk threshold, or with chunking
    /// disabled, get a single chunk. A zero-page document is a validation
    /// error surfaced before any extraction starts. A chunk size finer
    /// than one page clamps to page granularity.
    pub fn plan(
        &self,
        page_count: u32,
        byte_size: u64,
        enabled: bool,
    ) -> Result<Vec<PageRange>, ProcessError> {
        if page_count == 0 {
            return Err(ProcessError::EmptyDocument);
        }

        if !enabled || byte_size <= self.chunk_size_bytes {
            return Ok(vec![PageRange {
                start: 0,
                end: page_count,
            }]);
        }

        let avg_page_size = (byte_size / u64::from(page_count)).max(1);
        let pages_per_chunk = u32::try_from(self.chunk_size_bytes / avg_page_size)
            .unwrap_or(u32::MAX)
            .max(1);

        let mut ranges = Vec::new();
        let mut start = 0;
        while start < page_count {
            let end = start.saturating_add(pages_per_chunk).min(page_count);
            ranges.push(PageRange { start, end });
            start = end;
        }

        tracing::debug!(
            chunks = ranges.len(),
            pages = page_count,
            pages_per_chunk,
            "planned extraction chunks"
        );
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ranges must be ordered, disjoint, and cover [0, n) with no gaps.
    fn assert_partition(ranges: &[PageRange], page_count: u32) {
        assert!(!ranges.is_empty());
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, page_count);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(!pair[0].is_empty());
        }
        assert!(!ranges.last().unwrap().is_empty());
    }

    #[test]
    fn small_document_is_one_chunk() {
        let planner = ChunkPlanner::new(10 * 1024 * 1024);
        let ranges = planner.plan(37, 1024, true).unwrap();
        assert_eq!(ranges, vec![PageRange { start: 0, end: 37 }]);
    }

    #[test]
    fn chunking_disabled_is_one_chunk() {
        let planner = ChunkPlanner::new(1024);
        let ranges = planner.plan(100, 1_000_000, false).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_partition(&ranges, 100);
    }

    #[test]
    fn large_document_splits_evenly() {
        // 100 pages of ~1 MB each, 10 MB chunks -> 10 pages per chunk.
        let planner = ChunkPlanner::new(10 * 1024 * 1024);
        let ranges = planner.plan(100, 100 * 1024 * 1024, true).unwrap();
        assert_eq!(ranges.len(), 10);
        assert_partition(&ranges, 100);
        assert!(ranges.iter().all(|r| r.len() == 10));
    }

    #[test]
    fn final_chunk_may_be_short() {
        let planner = ChunkPlanner::new(10 * 1024 * 1024);
        let ranges = planner.plan(25, 25 * 1024 * 1024, true).unwrap();
        assert_partition(&ranges, 25);
        assert_eq!(ranges.last().unwrap().len(), 5);
    }

    #[test]
    fn sub_page_chunk_size_clamps_to_one_page() {
        // Chunk size far below a single page's size.
        let planner = ChunkPlanner::new(10);
        let ranges = planner.plan(4, 40_000, true).unwrap();
        assert_eq!(ranges.len(), 4);
        assert_partition(&ranges, 4);
        assert!(ranges.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn zero_pages_is_an_error() {
        let planner = ChunkPlanner::new(1024);
        assert!(matches!(
            planner.plan(0, 1024, true),
            Err(ProcessError::EmptyDocument)
        ));
    }

    #[test]
    fn partition_property_over_many_configurations() {
        for chunk_size in [1, 512, 4096, 1 << 20] {
            let planner = ChunkPlanner::new(chunk_size);
            for page_count in [1, 2, 3, 7, 64, 999] {
                for byte_size in [1, 1000, 1 << 22] {
                    let ranges = planner.plan(page_count, byte_size, true).unwrap();
                    assert_partition(&ranges, page_count);
                }
            }
        }
    }
}
