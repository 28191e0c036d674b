//! Shared ordered log of observable actions.

use parking_lot::Mutex;
use std::sync::Arc;

/// An append-only log shared by fakes so tests can check what happened
/// before what.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Timeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the index of the first matching entry.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    /// Returns how many entries match.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_and_count() {
        let timeline = Timeline::new();
        timeline.record("a");
        timeline.record("b");
        timeline.record("a");

        assert_eq!(timeline.position("a"), Some(0));
        assert_eq!(timeline.position("b"), Some(1));
        assert_eq!(timeline.position("c"), None);
        assert_eq!(timeline.count("a"), 2);
    }
}
