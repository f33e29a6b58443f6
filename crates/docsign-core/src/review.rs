//! Per-document read tracking
//!
//! A document counts as read once its viewer has been scrolled to within a
//! small tolerance of the bottom of its content. Content shorter than the
//! viewport is read as soon as it is displayed. Read flags only ever move from
//! false to true.

use serde::Serialize;
use tracing::{debug, info};

/// Default distance (in CSS pixels) from the bottom that still counts as the end
pub const DEFAULT_SCROLL_TOLERANCE: f64 = 5.0;

/// One document in the signing order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    index: usize,
    page_urls: Vec<String>,
    read: bool,
}

impl DocumentEntry {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_urls(&self) -> &[String] {
        &self.page_urls
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Status label shown next to the document link
    pub fn read_label(&self) -> &'static str {
        if self.read {
            "(Read)"
        } else {
            ""
        }
    }
}

/// Scroll position of the document viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            viewport_height,
        }
    }

    /// Whether the bottom of the content is visible, give or take `tolerance`
    pub fn reached_end(&self, tolerance: f64) -> bool {
        if self.scroll_height <= self.viewport_height {
            return true;
        }
        self.scroll_top + self.viewport_height >= self.scroll_height - tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewProgress {
    pub read: usize,
    pub total: usize,
}

/// Tracks which documents in a session have been read
#[derive(Debug, Clone)]
pub struct DocumentReviewTracker {
    documents: Vec<DocumentEntry>,
    current_index: usize,
    tolerance: f64,
}

impl DocumentReviewTracker {
    /// Create `document_count` unread documents with no known pages
    pub fn initialize(document_count: usize) -> Self {
        Self::with_documents(vec![Vec::new(); document_count])
    }

    /// Create one unread document per page list, in signing order
    pub fn with_documents(page_lists: Vec<Vec<String>>) -> Self {
        let documents = page_lists
            .into_iter()
            .enumerate()
            .map(|(index, page_urls)| DocumentEntry {
                index,
                page_urls,
                read: false,
            })
            .collect();

        Self {
            documents,
            current_index: 0,
            tolerance: DEFAULT_SCROLL_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn documents(&self) -> &[DocumentEntry] {
        &self.documents
    }

    pub fn document(&self, index: usize) -> Option<&DocumentEntry> {
        self.documents.get(index)
    }

    pub fn current(&self) -> Option<&DocumentEntry> {
        self.documents.get(self.current_index)
    }

    pub fn is_read(&self, index: usize) -> bool {
        self.documents.get(index).is_some_and(|d| d.read)
    }

    /// Switch the displayed document.
    ///
    /// Out-of-range indices and re-selecting the current document are ignored.
    /// Returns whether the selection changed.
    pub fn select_document(&mut self, index: usize) -> bool {
        if index >= self.documents.len() {
            debug!(index, count = self.documents.len(), "Ignoring out-of-range selection");
            return false;
        }
        if index == self.current_index {
            return false;
        }
        self.current_index = index;
        debug!(index, "Selected document");
        true
    }

    /// Feed a scroll position for document `index`.
    ///
    /// Returns `true` exactly once per document: on the call that first marks
    /// it read.
    pub fn on_scroll_progress(
        &mut self,
        index: usize,
        scroll_top: f64,
        scroll_height: f64,
        viewport_height: f64,
    ) -> bool {
        let metrics = ScrollMetrics::new(scroll_top, scroll_height, viewport_height);
        self.observe(index, metrics)
    }

    /// Check a freshly displayed document before any scroll event arrives
    pub fn on_displayed(&mut self, index: usize, scroll_height: f64, viewport_height: f64) -> bool {
        self.observe(index, ScrollMetrics::new(0.0, scroll_height, viewport_height))
    }

    fn observe(&mut self, index: usize, metrics: ScrollMetrics) -> bool {
        let tolerance = self.tolerance;
        let Some(entry) = self.documents.get_mut(index) else {
            return false;
        };
        if entry.read || !metrics.reached_end(tolerance) {
            return false;
        }
        entry.read = true;
        info!(index, "Document read");
        true
    }

    pub fn all_read(&self) -> bool {
        self.documents.iter().all(|d| d.read)
    }

    pub fn progress(&self) -> ReviewProgress {
        ReviewProgress {
            read: self.documents.iter().filter(|d| d.read).count(),
            total: self.documents.len(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Action {
        Select(usize),
        Scroll(usize, f64),
    }

    fn action(count: usize) -> impl Strategy<Value = Action> {
        prop_oneof![
            (0..count + 2).prop_map(Action::Select),
            (0..count + 2, 0.0f64..1300.0).prop_map(|(i, top)| Action::Scroll(i, top)),
        ]
    }

    proptest! {
        #[test]
        fn read_flags_never_revert(actions in prop::collection::vec(action(4), 0..60)) {
            let mut tracker = DocumentReviewTracker::initialize(4);
            let mut seen = [false; 4];
            for action in actions {
                match action {
                    Action::Select(i) => { tracker.select_document(i); }
                    Action::Scroll(i, top) => { tracker.on_scroll_progress(i, top, 2000.0, 800.0); }
                }
                for (i, was_read) in seen.iter_mut().enumerate() {
                    prop_assert!(!*was_read || tracker.is_read(i));
                    *was_read = tracker.is_read(i);
                }
                prop_assert!(tracker.current_index() < 4);
            }
        }

        #[test]
        fn all_read_is_order_independent(order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()) {
            let mut tracker = DocumentReviewTracker::initialize(5);
            for (step, index) in order.iter().enumerate() {
                prop_assert!(!tracker.all_read());
                tracker.select_document(*index);
                tracker.on_scroll_progress(*index, 1200.0, 2000.0, 800.0);
                prop_assert_eq!(tracker.progress().read, step + 1);
            }
            prop_assert!(tracker.all_read());
        }
    }
}
