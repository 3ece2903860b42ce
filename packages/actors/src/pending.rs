//! Ordered container behind the queue actor.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use spool_core::{Discipline, QueueEntry, QueuedJob};

/// Pending entries, stored in the shape the active discipline needs.
#[derive(Debug)]
enum Entries {
    /// Arrival order.
    Fifo(VecDeque<QueueEntry>),
    /// Min-heap on (priority, seq).
    Priority(BinaryHeap<Reverse<QueueEntry>>),
}

/// Jobs waiting for a worker.
///
/// The container is only rebuilt when the discipline changes; push and pop
/// never re-sort.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    entries: Entries,
}

impl PendingQueue {
    pub fn new(discipline: Discipline) -> Self {
        let entries = match discipline {
            Discipline::Fifo => Entries::Fifo(VecDeque::new()),
            Discipline::Priority => Entries::Priority(BinaryHeap::new()),
        };
        Self { entries }
    }

    pub fn discipline(&self) -> Discipline {
        match self.entries {
            Entries::Fifo(_) => Discipline::Fifo,
            Entries::Priority(_) => Discipline::Priority,
        }
    }

    /// Add a newly arrived entry. Its `seq` must exceed every seq already held.
    pub fn push(&mut self, entry: QueueEntry) {
        match &mut self.entries {
            Entries::Fifo(deque) => deque.push_back(entry),
            Entries::Priority(heap) => heap.push(Reverse(entry)),
        }
    }

    /// Remove the next entry per the active discipline.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        match &mut self.entries {
            Entries::Fifo(deque) => deque.pop_front(),
            Entries::Priority(heap) => heap.pop().map(|Reverse(entry)| entry),
        }
    }

    /// Put back an entry returned by `pop` that could not be handed out.
    pub fn restore(&mut self, entry: QueueEntry) {
        match &mut self.entries {
            Entries::Fifo(deque) => deque.push_front(entry),
            Entries::Priority(heap) => heap.push(Reverse(entry)),
        }
    }

    /// Entries in dequeue order. Nothing is removed.
    pub fn snapshot(&self) -> Vec<QueuedJob> {
        match &self.entries {
            Entries::Fifo(deque) => deque.iter().map(QueueEntry::view).collect(),
            Entries::Priority(heap) => {
                let mut entries: Vec<&QueueEntry> = heap.iter().map(|r| &r.0).collect();
                entries.sort();
                entries.into_iter().map(QueueEntry::view).collect()
            }
        }
    }

    /// Switch discipline, rebuilding the container once. Returns whether
    /// anything changed.
    pub fn set_discipline(&mut self, discipline: Discipline) -> bool {
        if self.discipline() == discipline {
            return false;
        }

        let entries = std::mem::replace(&mut self.entries, Entries::Fifo(VecDeque::new()));
        self.entries = match entries {
            Entries::Fifo(deque) => Entries::Priority(deque.into_iter().map(Reverse).collect()),
            Entries::Priority(heap) => {
                let mut entries: Vec<QueueEntry> =
                    heap.into_iter().map(|Reverse(entry)| entry).collect();
                entries.sort_by_key(|entry| entry.seq);
                Entries::Fifo(entries.into())
            }
        };
        true
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Fifo(deque) => deque.len(),
            Entries::Priority(heap) => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use spool_core::{Job, JobId, Priority};

    use super::*;

    fn entry(priority: i32, seq: u64) -> QueueEntry {
        let job = Job::new(JobId::new(), format!("job-{}.pdf", seq), "uploads/x.pdf", 1);
        QueueEntry::new(Priority(priority), seq, job)
    }

    fn drain(queue: &mut PendingQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop()).map(|e| e.seq).collect()
    }

    #[test]
    fn fifo_ignores_priority() {
        let mut queue = PendingQueue::new(Discipline::Fifo);
        for (priority, seq) in [(5, 0), (1, 1), (3, 2)] {
            queue.push(entry(priority, seq));
        }
        assert_eq!(drain(&mut queue), vec![0, 1, 2]);
    }

    #[test]
    fn priority_orders_by_value_then_arrival() {
        let mut queue = PendingQueue::new(Discipline::Priority);
        for (priority, seq) in [(5, 0), (1, 1), (3, 2), (1, 3)] {
            queue.push(entry(priority, seq));
        }
        let snapshot: Vec<i32> = queue.snapshot().iter().map(|j| j.priority.0).collect();
        assert_eq!(snapshot, vec![1, 1, 3, 5]);
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&mut queue), vec![1, 3, 2, 0]);
    }

    #[test]
    fn switching_keeps_every_entry() {
        let mut queue = PendingQueue::new(Discipline::Fifo);
        for (priority, seq) in [(4, 0), (2, 1), (9, 2)] {
            queue.push(entry(priority, seq));
        }

        assert!(queue.set_discipline(Discipline::Priority));
        assert!(!queue.set_discipline(Discipline::Priority));
        assert_eq!(queue.pop().map(|e| e.seq), Some(1));

        assert!(queue.set_discipline(Discipline::Fifo));
        assert_eq!(drain(&mut queue), vec![0, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn restore_puts_entry_back_in_front() {
        let mut queue = PendingQueue::new(Discipline::Fifo);
        queue.push(entry(1, 0));
        queue.push(entry(1, 1));

        let first = queue.pop().unwrap();
        queue.restore(first);
        assert_eq!(drain(&mut queue), vec![0, 1]);
    }
}
