use crate::ports::HapticKind;

pub const DEFERRED_QUEUE_CAPACITY: usize = 16;

/// Work the controller schedules for later on its own event loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Deferred {
    CheckStart,
    Adjust { delta: f32 },
    ToggleMode,
    HapticPulse(HapticKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredKind {
    CheckStart,
    Adjust,
    ToggleMode,
    HapticPulse,
}

impl Deferred {
    pub const fn kind(&self) -> DeferredKind {
        match self {
            Self::CheckStart => DeferredKind::CheckStart,
            Self::Adjust { .. } => DeferredKind::Adjust,
            Self::ToggleMode => DeferredKind::ToggleMode,
            Self::HapticPulse(_) => DeferredKind::HapticPulse,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    due_ms: u64,
    seq: u32,
    task: Deferred,
}

/// Single-threaded delayed-message queue with cancel-by-kind.
///
/// Tasks fire in due order; tasks due at the same instant fire in the order
/// they were posted.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    pending: heapless::Vec<Pending, DEFERRED_QUEUE_CAPACITY>,
    next_seq: u32,
}

impl DeferredQueue {
    pub const fn new() -> Self {
        Self {
            pending: heapless::Vec::new(),
            next_seq: 0,
        }
    }

    /// Returns `false` when the queue is full and the task was dropped.
    pub fn post(&mut self, task: Deferred, now_ms: u64, delay_ms: u64) -> bool {
        let pending = Pending {
            due_ms: now_ms.saturating_add(delay_ms),
            seq: self.next_seq,
            task,
        };
        if self.pending.push(pending).is_err() {
            log::warn!("gesture: deferred queue full, dropped {:?}", task.kind());
            return false;
        }
        self.next_seq = self.next_seq.wrapping_add(1);
        true
    }

    /// Replaces any pending task of the same kind.
    pub fn post_debounced(&mut self, task: Deferred, now_ms: u64, delay_ms: u64) -> bool {
        self.cancel(task.kind());
        self.post(task, now_ms, delay_ms)
    }

    pub fn cancel(&mut self, kind: DeferredKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.task.kind() != kind);
        before - self.pending.len()
    }

    pub fn clear(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    /// Removes and returns the earliest task due at or before `now_ms`,
    /// together with its due time.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, Deferred)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, pending)| pending.due_ms <= now_ms)
            .min_by_key(|(_, pending)| (pending.due_ms, pending.seq))
            .map(|(index, _)| index)?;
        let pending = self.pending.swap_remove(index);
        Some((pending.due_ms, pending.task))
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.iter().map(|pending| pending.due_ms).min()
    }

    pub fn contains(&self, kind: DeferredKind) -> bool {
        self.pending
            .iter()
            .any(|pending| pending.task.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order_then_post_order() {
        let mut queue = DeferredQueue::new();
        queue.post(Deferred::ToggleMode, 0, 300);
        queue.post(Deferred::Adjust { delta: 0.1 }, 0, 100);
        queue.post(Deferred::Adjust { delta: 0.2 }, 0, 100);

        assert_eq!(queue.pop_due(50), None);
        assert_eq!(queue.next_due_ms(), Some(100));
        assert_eq!(
            queue.pop_due(400),
            Some((100, Deferred::Adjust { delta: 0.1 }))
        );
        assert_eq!(
            queue.pop_due(400),
            Some((100, Deferred::Adjust { delta: 0.2 }))
        );
        assert_eq!(queue.pop_due(400), Some((300, Deferred::ToggleMode)));
        assert!(queue.is_empty());
    }

    #[test]
    fn debounced_post_replaces_same_kind_only() {
        let mut queue = DeferredQueue::new();
        queue.post(Deferred::CheckStart, 0, 500);
        queue.post(Deferred::HapticPulse(HapticKind::End), 0, 150);
        queue.post_debounced(Deferred::CheckStart, 200, 500);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_due(600), Some((150, Deferred::HapticPulse(HapticKind::End))));
        assert_eq!(queue.pop_due(600), None);
        assert_eq!(queue.pop_due(700), Some((700, Deferred::CheckStart)));
    }

    #[test]
    fn cancel_and_clear_report_counts() {
        let mut queue = DeferredQueue::new();
        queue.post(Deferred::Adjust { delta: 0.0 }, 0, 0);
        queue.post(Deferred::Adjust { delta: 0.0 }, 0, 0);
        queue.post(Deferred::CheckStart, 0, 500);
        assert_eq!(queue.cancel(DeferredKind::Adjust), 2);
        assert!(queue.contains(DeferredKind::CheckStart));
        assert_eq!(queue.clear(), 1);
        assert!(!queue.contains(DeferredKind::CheckStart));
    }

    #[test]
    fn full_queue_drops_new_tasks() {
        let mut queue = DeferredQueue::new();
        for _ in 0..DEFERRED_QUEUE_CAPACITY {
            assert!(queue.post(Deferred::ToggleMode, 0, 10));
        }
        assert!(!queue.post(Deferred::CheckStart, 0, 10));
        assert!(!queue.contains(DeferredKind::CheckStart));
    }
}
