//! Rolling window of recently refined text.

use std::collections::VecDeque;

/// Bounded FIFO of the most recent refined strings.
///
/// Appending beyond capacity evicts the oldest entry. Owned and mutated
/// only by the refiner's run loop; nothing else touches it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl HistoryBuffer {
    /// Creates an empty buffer holding at most `max_entries` strings.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Appends an entry, evicting the oldest once over capacity.
    pub fn record(&mut self, entry: String) {
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Joins the last `window` entries with single spaces.
    ///
    /// Returns the empty string when the buffer is empty.
    pub fn context(&self, window: usize) -> String {
        let start = self.entries.len().saturating_sub(window);
        self.entries
            .iter()
            .skip(start)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let buffer = HistoryBuffer::new(10);
        assert!(buffer.is_empty());
        assert_eq!(buffer.context(3), "");
    }

    #[test]
    fn test_record_and_context() {
        let mut buffer = HistoryBuffer::new(10);
        buffer.record("First.".to_string());
        buffer.record("Second.".to_string());
        assert_eq!(buffer.context(3), "First. Second.");
    }

    #[test]
    fn test_context_uses_only_last_window_entries() {
        let mut buffer = HistoryBuffer::new(10);
        for word in ["One.", "Two.", "Three.", "Four.", "Five."] {
            buffer.record(word.to_string());
        }
        assert_eq!(buffer.context(3), "Three. Four. Five.");
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = HistoryBuffer::new(3);
        for i in 0..20 {
            buffer.record(format!("entry {i}"));
            assert!(buffer.len() <= 3);
        }
        // Holds exactly the last three appended items, in append order.
        assert_eq!(buffer.context(3), "entry 17 entry 18 entry 19");
    }

    #[test]
    fn test_window_larger_than_contents() {
        let mut buffer = HistoryBuffer::new(10);
        buffer.record("Only.".to_string());
        assert_eq!(buffer.context(3), "Only.");
    }
}
