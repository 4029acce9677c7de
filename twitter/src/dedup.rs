use std::collections::HashSet;

use crate::tweet::FeedItem;

/// Snapshot of already processed tweet ids.
///
/// Loaded once per run; ids recorded by another process after the snapshot
/// was taken are not seen until the next run.
#[derive(Clone, Debug, Default)]
pub struct DedupFilter {
    processed: HashSet<i64>,
}

impl DedupFilter {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            processed: ids.into_iter().collect(),
        }
    }

    pub fn is_processed(&self, id: i64) -> bool {
        self.processed.contains(&id)
    }

    /// Keep only items that have not been processed before
    pub fn filter_unseen(&self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        items
            .into_iter()
            .filter(|i| !self.is_processed(i.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
