//! Specials inventory - a bounded FIFO

use arrayvec::ArrayVec;

use crate::types::{Special, SPECIAL_CAPACITY_LIMIT};

/// Collected specials in receipt order; the oldest is used first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialsQueue {
    items: ArrayVec<Special, SPECIAL_CAPACITY_LIMIT>,
    capacity: usize,
}

impl SpecialsQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: ArrayVec::new(),
            capacity: capacity.min(SPECIAL_CAPACITY_LIMIT),
        }
    }

    /// Append a special; returns false (and drops it) when full
    pub fn push(&mut self, special: Special) -> bool {
        if self.is_full() || !special.is_queueable() {
            return false;
        }
        self.items.push(special);
        true
    }

    /// Take the oldest special
    pub fn pop(&mut self) -> Option<Special> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.remove(0))
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty the queue and adopt a new capacity
    pub fn reset(&mut self, capacity: usize) {
        self.items.clear();
        self.capacity = capacity.min(SPECIAL_CAPACITY_LIMIT);
    }

    pub fn as_slice(&self) -> &[Special] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut q = SpecialsQueue::new(5);
        q.push(Special::AddLine);
        q.push(Special::Gravity);
        assert_eq!(q.pop(), Some(Special::AddLine));
        assert_eq!(q.pop(), Some(Special::Gravity));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_capacity_drops_silently() {
        let mut q = SpecialsQueue::new(2);
        assert!(q.push(Special::AddLine));
        assert!(q.push(Special::ClearLine));
        assert!(!q.push(Special::NukeField));
        assert_eq!(q.as_slice(), &[Special::AddLine, Special::ClearLine]);
    }

    #[test]
    fn test_configured_capacity_is_kept() {
        let mut q = SpecialsQueue::new(40);
        assert_eq!(q.capacity(), 40);
        for _ in 0..45 {
            q.push(Special::Gravity);
        }
        assert_eq!(q.len(), 40);
        assert_eq!(SpecialsQueue::new(1000).capacity(), SPECIAL_CAPACITY_LIMIT);
    }

    #[test]
    fn test_classic_add_line_not_queueable() {
        let mut q = SpecialsQueue::new(3);
        assert!(!q.push(Special::ClassicAddLine(2)));
        assert!(q.is_empty());
    }
}
