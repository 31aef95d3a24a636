//! Search results container

use serde::{Deserialize, Serialize};

use crate::search::types::SearchableContent;

/// One page of scored results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchableContent>,
    /// Documents matching the query, before pagination
    pub total_count: usize,
    pub skip: usize,
    pub limit: usize,
}

impl SearchPage {
    #[must_use]
    pub fn empty(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    /// Check if there are more results available
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.skip + self.results.len() < self.total_count
    }

    /// Get the next page offset
    #[must_use]
    pub fn next_skip(&self) -> Option<usize> {
        self.has_more().then(|| self.skip + self.results.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_skip_advances_past_returned_results() {
        let page = SearchPage {
            results: vec![SearchableContent::new("a"), SearchableContent::new("b")],
            total_count: 5,
            skip: 2,
            limit: 2,
        };
        assert!(page.has_more());
        assert_eq!(page.next_skip(), Some(4));

        let last = SearchPage {
            results: vec![SearchableContent::new("e")],
            total_count: 5,
            skip: 4,
            limit: 2,
        };
        assert_eq!(last.next_skip(), None);
    }
}
