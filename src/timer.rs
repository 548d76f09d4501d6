//! Deadline queue driven by the audio clock.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy)]
struct Deadline {
    due: f64,
    seq: u64,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    /// Earlier deadlines first; ties fire in scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Tasks keyed by due time in seconds.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Deadline>>,
    tasks: HashMap<u64, T>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        TimerQueue {
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Deadline { due, seq }));
        self.tasks.insert(seq, task);
    }

    /// Due time of the earliest task.
    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(d)| d.due)
    }

    /// Pop the earliest task if it is due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, T)> {
        let Reverse(head) = *self.heap.peek()?;
        if head.due > now {
            return None;
        }
        self.heap.pop();
        self.tasks.remove(&head.seq).map(|task| (head.due, task))
    }

    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(2.0, "b");
        q.schedule(1.0, "a");
        q.schedule(3.0, "c");

        assert_eq!(q.next_due(), Some(1.0));
        assert_eq!(q.pop_due(2.5), Some((1.0, "a")));
        assert_eq!(q.pop_due(2.5), Some((2.0, "b")));
        assert_eq!(q.pop_due(2.5), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule(1.0, 1);
        q.schedule(1.0, 2);
        assert_eq!(q.pop_due(1.0).map(|(_, t)| t), Some(1));
        assert_eq!(q.pop_due(1.0).map(|(_, t)| t), Some(2));
    }
}
