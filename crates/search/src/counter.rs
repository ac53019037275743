//! Lazily synchronized shadow-op accounting across workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// A partition counter: one slot per worker plus a coalesced total.
///
/// Workers add to their own slot only, so the hot path never contends
/// on a shared cache line. Reading coalesces every slot into the
/// total first, which makes the read a consistent running sum of
/// everything the workers have reported so far.
#[derive(Debug)]
pub struct PartitionCounter {
    total: AtomicU64,
    slots: Vec<AtomicU64>,
}

impl PartitionCounter {
    pub fn new(slots: usize) -> Self {
        Self {
            total: AtomicU64::new(0),
            slots: (0..slots).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Add to one worker's slot. Called only by that worker.
    pub fn add(&self, slot: usize, value: u64) {
        self.slots[slot].fetch_add(value, Ordering::Relaxed);
    }

    /// Drain every slot into the total.
    pub fn sync(&self) {
        for slot in &self.slots {
            let drained = slot.swap(0, Ordering::Relaxed);
            if drained != 0 {
                self.total.fetch_add(drained, Ordering::Relaxed);
            }
        }
    }

    /// The running sum across all workers, after a sync.
    pub fn read(&self) -> u64 {
        self.sync();
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn read_coalesces_every_slot() {
        let counter = PartitionCounter::new(3);
        counter.add(0, 5);
        counter.add(1, 7);
        counter.add(2, 11);
        assert_eq!(counter.read(), 23);
        // Slots were drained; the total persists.
        counter.add(1, 2);
        assert_eq!(counter.read(), 25);
    }

    #[test]
    fn concurrent_adds_sum_exactly() {
        let counter = Arc::new(PartitionCounter::new(4));
        let handles: Vec<_> = (0..4)
            .map(|slot| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        counter.add(slot, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.read(), 40_000);
    }
}
