//! A fixed-capacity FIFO log.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Keeps the newest `capacity` entries in insertion order.
///
/// Used for chat and round history, which would otherwise grow for as long
/// as a room lives.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Creates an empty log. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest one when full.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Copies the entries out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for BoundedLog<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity_keeps_everything() {
        let mut log = BoundedLog::new(3);
        log.push(1);
        log.push(2);
        assert_eq!(log.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_push_over_capacity_evicts_oldest() {
        let mut log = BoundedLog::new(50);
        for i in 1..=55 {
            log.push(i);
        }
        assert_eq!(log.len(), 50);
        assert_eq!(log.iter().next(), Some(&6));
        assert_eq!(log.last(), Some(&55));
    }

    #[test]
    fn test_zero_capacity_behaves_as_one() {
        let mut log = BoundedLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut log = BoundedLog::new(2);
        log.push("x");
        log.push("y");
        log.push("z");
        assert_eq!(serde_json::to_value(&log).unwrap(), serde_json::json!(["y", "z"]));
    }
}
