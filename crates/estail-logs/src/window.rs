use std::cmp::Ordering;
use std::collections::HashSet;

use estail_types::LogDocument;

/// Base page size, and the step it grows by when a page overflows
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Dedup and pagination state for the poll loop.
///
/// Tracks the watermark (lower bound of the next query), the identifiers
/// already emitted at exactly that timestamp, and the page size to request.
/// The seen set only ever holds identifiers sharing one timestamp.
#[derive(Clone, Debug)]
pub struct DedupWindow {
    /// Lower bound for the next query; never decreases
    watermark: i64,

    /// Identifiers emitted at `watermark`
    seen: HashSet<String>,

    /// Page size for the next query
    page_size: usize,

    /// Base size and growth step
    base_page_size: usize,
}

impl DedupWindow {
    /// Create a window starting at `watermark` with the default page size
    pub fn new(watermark: i64) -> Self {
        Self::with_base_page_size(watermark, DEFAULT_PAGE_SIZE)
    }

    /// Create a window with a custom base page size (at least 1)
    pub fn with_base_page_size(watermark: i64, base_page_size: usize) -> Self {
        let base_page_size = base_page_size.max(1);
        Self {
            watermark,
            seen: HashSet::new(),
            page_size: base_page_size,
            base_page_size,
        }
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn base_page_size(&self) -> usize {
        self.base_page_size
    }

    /// Number of identifiers seen at the current watermark
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Whether a page reporting `total_hits` brings nothing beyond what is seen.
    ///
    /// Deliberately loose: the backend total covers everything at or after the
    /// watermark while the seen set only covers the watermark itself.
    pub fn is_idle(&self, total_hits: u64) -> bool {
        total_hits <= self.seen.len() as u64
    }

    /// Fold one ascending page into the window, returning the unseen documents
    /// in page order.
    pub fn absorb(&mut self, hits: Vec<LogDocument>) -> Vec<LogDocument> {
        let page_len = hits.len();
        let mut fresh = Vec::new();

        for doc in hits {
            let is_new = !self.seen.contains(&doc.id);

            match doc.timestamp.cmp(&self.watermark) {
                Ordering::Equal => {
                    if is_new {
                        self.seen.insert(doc.id.clone());
                    }
                    // A full page stuck on one timestamp may hide siblings
                    // past the page boundary
                    if page_len == self.page_size {
                        self.page_size += self.base_page_size;
                    }
                }
                Ordering::Greater => {
                    self.page_size = self.base_page_size;
                    self.seen.clear();
                    self.seen.insert(doc.id.clone());
                    self.watermark = doc.timestamp;
                }
                Ordering::Less => {}
            }

            if is_new {
                fresh.push(doc);
            }
        }

        fresh
    }
}
