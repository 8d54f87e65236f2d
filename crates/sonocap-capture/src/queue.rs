use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bounded single-producer delivery queue that favors freshness: a push onto
/// a full queue evicts the oldest element instead of blocking or failing.
pub struct DeliveryQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl<T> DeliveryQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "delivery queue capacity must be non-zero");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Enqueue, evicting the oldest element when full. Never blocks.
    pub fn push(&self, item: T) {
        let mut queue = self.inner.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
            let total = self.evicted.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                capacity = self.capacity,
                total_evicted = total,
                "delivery queue full; discarding oldest segment"
            );
        }
        queue.push_back(item);
    }

    /// `realtime == false`: plain FIFO pop. `realtime == true`: discard
    /// everything but the most recently enqueued element and return it.
    pub fn pop_latest(&self, realtime: bool) -> Option<T> {
        let mut queue = self.inner.lock();
        if realtime {
            let stale = queue.len().saturating_sub(1);
            if stale > 0 {
                queue.drain(..stale);
                tracing::warn!(discarded = stale, "drained stale segments for realtime read");
            }
        }
        queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total elements evicted by full-queue pushes.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_without_realtime() {
        let queue = DeliveryQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.pop_latest(false), Some(1));
        assert_eq!(queue.pop_latest(false), Some(2));
    }

    #[test]
    fn push_beyond_capacity_evicts_oldest() {
        let queue = DeliveryQueue::new(3);
        for seq in 0..4 {
            queue.push(seq);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.evicted(), 1);
        assert_eq!(queue.pop_latest(false), Some(1));
    }

    #[test]
    fn realtime_read_drains_to_freshest() {
        let queue = DeliveryQueue::new(10);
        queue.push("a");
        queue.push("b");
        queue.push("c");
        assert_eq!(queue.pop_latest(true), Some("c"));
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_queue_reads_none() {
        let queue: DeliveryQueue<u8> = DeliveryQueue::new(2);
        assert_eq!(queue.pop_latest(true), None);
        assert_eq!(queue.pop_latest(false), None);
    }
}
