use std::collections::VecDeque;

/// Upper bound for the recycle pool whatever the window asks for.
pub const POOL_CAPACITY_MAX: usize = 128;

// One pooled slot per 8 ms of window, roughly one per input frame.
const POOL_MS_PER_SLOT: u64 = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TouchSample {
    pub x: f32,
    pub y: f32,
    pub t_ms: u64,
}

impl TouchSample {
    pub const fn new(x: f32, y: f32, t_ms: u64) -> Self {
        Self { x, y, t_ms }
    }
}

pub const fn pool_capacity_for_window(window_ms: u64) -> usize {
    let slots = (window_ms / POOL_MS_PER_SLOT) as usize;
    if slots > POOL_CAPACITY_MAX {
        POOL_CAPACITY_MAX
    } else {
        slots
    }
}

/// Time-ordered touch samples stored in a slot arena.
///
/// Removed samples hand their slot back to a bounded free-list so the move
/// path does not allocate once the arena is warm. When a removal overflows
/// the free-list the live samples are packed to the front and the arena is
/// cut to `len() + pool_capacity()`, so it never holds more than that after
/// any removal.
pub struct SampleBuffer {
    slots: Vec<TouchSample>,
    live: VecDeque<usize>,
    free: heapless::Vec<usize, POOL_CAPACITY_MAX>,
    pool_capacity: usize,
}

impl SampleBuffer {
    pub fn new(window_ms: u64) -> Self {
        Self::with_pool_capacity(pool_capacity_for_window(window_ms))
    }

    pub fn with_pool_capacity(pool_capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            live: VecDeque::new(),
            free: heapless::Vec::new(),
            pool_capacity: pool_capacity.min(POOL_CAPACITY_MAX),
        }
    }

    pub fn push(&mut self, sample: TouchSample) {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = sample;
                slot
            }
            None => {
                self.slots.push(sample);
                self.slots.len() - 1
            }
        };
        self.live.push_back(slot);
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn first(&self) -> Option<&TouchSample> {
        self.live.front().map(|&slot| &self.slots[slot])
    }

    pub fn last(&self) -> Option<&TouchSample> {
        self.live.back().map(|&slot| &self.slots[slot])
    }

    /// Held samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TouchSample> + '_ {
        self.live.iter().map(move |&slot| &self.slots[slot])
    }

    /// Drops leading samples older than `now_ms - window_ms`.
    pub fn evict_expired(&mut self, now_ms: u64, window_ms: u64) -> usize {
        let mut removed = 0;
        while let Some(&slot) = self.live.front() {
            if now_ms.saturating_sub(self.slots[slot].t_ms) <= window_ms {
                break;
            }
            self.live.pop_front();
            self.recycle(slot);
            removed += 1;
        }
        self.compact_if_overflowed();
        removed
    }

    /// Drops the `count` oldest samples.
    pub fn evict_front(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count {
            let Some(slot) = self.live.pop_front() else {
                break;
            };
            self.recycle(slot);
            removed += 1;
        }
        self.compact_if_overflowed();
        removed
    }

    pub fn clear(&mut self) {
        while let Some(slot) = self.live.pop_front() {
            self.recycle(slot);
        }
        self.compact_if_overflowed();
    }

    /// Slots currently waiting in the recycle pool.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Slots allocated in the arena, live or pooled.
    pub fn arena_len(&self) -> usize {
        self.slots.len()
    }

    fn recycle(&mut self, slot: usize) {
        self.slots[slot] = TouchSample::default();
        // A full free-list leaves the slot orphaned until the next compaction.
        if self.free.len() < self.pool_capacity {
            let _ = self.free.push(slot);
        }
    }

    fn compact_if_overflowed(&mut self) {
        let live = self.live.len();
        if self.slots.len() == live + self.free.len() {
            return;
        }
        // Only reached with a full free-list, so the arena never grows here.
        let packed: Vec<TouchSample> = self.live.iter().map(|&slot| self.slots[slot]).collect();
        self.slots[..live].copy_from_slice(&packed);
        self.live.clear();
        self.live.extend(0..live);
        self.slots.truncate(live + self.pool_capacity);
        self.slots[live..].fill(TouchSample::default());
        self.free.clear();
        for slot in (live..self.slots.len()).rev() {
            let _ = self.free.push(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: u64, step_ms: u64) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(300);
        for i in 0..count {
            buffer.push(TouchSample::new(i as f32, 0.0, i * step_ms));
        }
        buffer
    }

    #[test]
    fn default_window_pool_capacity() {
        assert_eq!(pool_capacity_for_window(300), 37);
        assert_eq!(pool_capacity_for_window(5), 0);
        assert_eq!(pool_capacity_for_window(60_000), POOL_CAPACITY_MAX);
        assert_eq!(SampleBuffer::new(300).pool_capacity(), 37);
    }

    #[test]
    fn iterates_oldest_first() {
        let buffer = filled(4, 10);
        let xs: Vec<f32> = buffer.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(buffer.first().map(|s| s.t_ms), Some(0));
        assert_eq!(buffer.last().map(|s| s.t_ms), Some(30));
    }

    #[test]
    fn evict_expired_removes_only_stale_prefix() {
        let mut buffer = filled(10, 50);
        // now=450, window=300: samples at 0..=100 are older than 150.
        assert_eq!(buffer.evict_expired(450, 300), 3);
        assert_eq!(buffer.len(), 7);
        assert_eq!(buffer.first().map(|s| s.t_ms), Some(150));
        assert_eq!(buffer.pooled(), 3);
        assert_eq!(buffer.evict_expired(450, 300), 0);
    }

    #[test]
    fn pushes_reuse_recycled_slots() {
        let mut buffer = filled(5, 10);
        buffer.evict_front(2);
        assert_eq!(buffer.pooled(), 2);
        buffer.push(TouchSample::new(9.0, 9.0, 60));
        buffer.push(TouchSample::new(10.0, 9.0, 70));
        assert_eq!(buffer.pooled(), 0);
        assert_eq!(buffer.arena_len(), 5);
        let xs: Vec<f32> = buffer.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0, 9.0, 10.0]);
    }

    #[test]
    fn pool_never_exceeds_capacity() {
        let mut buffer = filled(100, 4);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pooled(), 37);
        assert_eq!(buffer.arena_len(), 37);

        for i in 0..80 {
            buffer.push(TouchSample::new(0.0, 0.0, i));
            assert!(buffer.pooled() <= buffer.pool_capacity());
        }
        assert_eq!(buffer.evict_expired(1_000, 300), 80);
        assert_eq!(buffer.pooled(), 37);
        assert_eq!(buffer.arena_len(), 37);
    }

    #[test]
    fn bursts_inside_one_session_keep_the_arena_bounded() {
        let mut buffer = SampleBuffer::new(300);
        let mut now = 0u64;
        for _ in 0..10 {
            for _ in 0..75 {
                now += 4;
                buffer.push(TouchSample::new(now as f32, 0.0, now));
                buffer.evict_expired(now, 300);
                assert!(
                    buffer.arena_len() <= buffer.len() + buffer.pool_capacity(),
                    "arena {} live {}",
                    buffer.arena_len(),
                    buffer.len()
                );
            }
            now += 400;
            buffer.push(TouchSample::new(now as f32, 0.0, now));
            buffer.evict_expired(now, 300);
            assert_eq!(buffer.len(), 1);
            assert_eq!(buffer.arena_len(), 1 + buffer.pool_capacity());
        }
    }

    #[test]
    fn compaction_keeps_order_after_slot_reuse() {
        let mut buffer = SampleBuffer::with_pool_capacity(2);
        for i in 0..4u64 {
            buffer.push(TouchSample::new(i as f32, 0.0, i));
        }
        // Free slots 0 and 1, then refill them with newer samples.
        buffer.evict_front(2);
        buffer.push(TouchSample::new(4.0, 0.0, 4));
        buffer.push(TouchSample::new(5.0, 0.0, 5));
        // Overflows the free-list and forces a compaction.
        buffer.evict_front(3);
        assert_eq!(buffer.arena_len(), 1 + 2);
        let xs: Vec<f32> = buffer.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![5.0]);

        buffer.push(TouchSample::new(6.0, 0.0, 6));
        buffer.push(TouchSample::new(7.0, 0.0, 7));
        buffer.push(TouchSample::new(8.0, 0.0, 8));
        let xs: Vec<f32> = buffer.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn zero_capacity_pool_still_buffers() {
        let mut buffer = SampleBuffer::with_pool_capacity(0);
        buffer.push(TouchSample::new(1.0, 2.0, 3));
        buffer.clear();
        assert_eq!(buffer.pooled(), 0);
        assert_eq!(buffer.arena_len(), 0);
        buffer.push(TouchSample::new(4.0, 5.0, 6));
        assert_eq!(buffer.first(), Some(&TouchSample::new(4.0, 5.0, 6)));
    }
}
