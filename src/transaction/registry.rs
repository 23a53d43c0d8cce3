use std::time::{Duration, Instant};

use crate::transaction::record::Transaction;

/// Outcome of trying to admit a new transaction.
pub enum Admission<T> {
    /// The transaction was inserted; if the table was full, `evicted`
    /// carries the expired entry that made room (its resources are
    /// released when the caller drops it).
    Accepted { evicted: Option<Transaction<T>> },
    /// Table full and no entry has exceeded the idle timeout; the
    /// connection is handed back to be refused.
    Refused(Transaction<T>),
}

struct Slot<T> {
    txn: Transaction<T>,
    /// Next slot in this descriptor's hash chain.
    chain_next: Option<usize>,
    /// Access-order queue links; `prev` is toward the most-recently-used end.
    queue_prev: Option<usize>,
    queue_next: Option<usize>,
}

/// Capacity-bounded collection of transactions keyed by descriptor.
///
/// A fixed-size hash table (`descriptor mod table_size`, chained) gives
/// O(1) amortized lookup; an access-order queue threaded through the same
/// slots drives idle-timeout eviction, which happens lazily when an
/// allocation finds the table full. Chains and queue links are arena
/// indices into the slot vector, so there are no pointer graphs to manage.
///
/// Keying purely by descriptor is sound only because release is
/// synchronous with teardown: within the single-threaded event loop the
/// OS cannot reassign a descriptor before its entry is gone.
pub struct Registry<T> {
    buckets: Box<[Option<usize>]>,
    slots: Vec<Option<Slot<T>>>,
    free: Vec<usize>,
    /// Most-recently-used end of the access-order queue.
    head: Option<usize>,
    /// Least-recently-used end; the eviction candidate.
    tail: Option<usize>,
    len: usize,
    capacity: usize,
    idle_timeout: Duration,
}

impl<T> Registry<T> {
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            buckets: vec![None; capacity.max(1)].into_boxed_slice(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            capacity: capacity.max(1),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a transaction at the most-recently-used end.
    ///
    /// At capacity, the least-recently-used entry is force-evicted if and
    /// only if it has exceeded the idle timeout; otherwise the insertion
    /// is refused.
    pub fn allocate(&mut self, txn: Transaction<T>, now: Instant) -> Admission<T> {
        debug_assert!(self.find_index(txn.descriptor).is_none());

        let mut evicted = None;
        if self.len == self.capacity {
            match self.expired_tail(now) {
                Some(fd) => evicted = self.release(fd),
                None => return Admission::Refused(txn),
            }
        }

        let slot = Slot {
            txn,
            chain_next: None,
            queue_prev: None,
            queue_next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        let bucket = self.bucket_of(idx);
        if let Some(s) = self.slots[idx].as_mut() {
            s.chain_next = self.buckets[bucket];
        }
        self.buckets[bucket] = Some(idx);
        self.queue_push_front(idx);
        self.len += 1;

        Admission::Accepted { evicted }
    }

    /// O(1) amortized lookup by descriptor.
    pub fn lookup(&mut self, descriptor: usize) -> Option<&mut Transaction<T>> {
        let idx = self.find_index(descriptor)?;
        self.slots[idx].as_mut().map(|s| &mut s.txn)
    }

    /// Removes an entry from the hash chain and the access-order queue
    /// together. No-op when the descriptor is not present.
    pub fn release(&mut self, descriptor: usize) -> Option<Transaction<T>> {
        let idx = self.find_index(descriptor)?;
        self.chain_unlink(descriptor, idx);
        self.queue_unlink(idx);
        let slot = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(slot.txn)
    }

    /// Refreshes the last-access timestamp and relinks the entry to the
    /// most-recently-used end in O(1).
    pub fn touch(&mut self, descriptor: usize, now: Instant) {
        let Some(idx) = self.find_index(descriptor) else {
            return;
        };
        if let Some(s) = self.slots[idx].as_mut() {
            s.txn.last_active = now;
        }
        self.queue_unlink(idx);
        self.queue_push_front(idx);
    }

    /// Descriptor of the least-recently-used entry, if it has been idle
    /// beyond the timeout.
    fn expired_tail(&self, now: Instant) -> Option<usize> {
        let idx = self.tail?;
        let slot = self.slots[idx].as_ref()?;
        if now.duration_since(slot.txn.last_active) > self.idle_timeout {
            Some(slot.txn.descriptor)
        } else {
            None
        }
    }

    fn bucket_of(&self, idx: usize) -> usize {
        let fd = self.slots[idx]
            .as_ref()
            .map(|s| s.txn.descriptor)
            .unwrap_or(0);
        fd % self.buckets.len()
    }

    fn find_index(&self, descriptor: usize) -> Option<usize> {
        let mut cur = self.buckets[descriptor % self.buckets.len()];
        while let Some(idx) = cur {
            let slot = self.slots[idx].as_ref()?;
            if slot.txn.descriptor == descriptor {
                return Some(idx);
            }
            cur = slot.chain_next;
        }
        None
    }

    fn chain_unlink(&mut self, descriptor: usize, idx: usize) {
        let bucket = descriptor % self.buckets.len();
        let next = self.slots[idx].as_ref().and_then(|s| s.chain_next);

        if self.buckets[bucket] == Some(idx) {
            self.buckets[bucket] = next;
            return;
        }
        let mut cur = self.buckets[bucket];
        while let Some(i) = cur {
            let chain_next = self.slots[i].as_ref().and_then(|s| s.chain_next);
            if chain_next == Some(idx) {
                if let Some(s) = self.slots[i].as_mut() {
                    s.chain_next = next;
                }
                return;
            }
            cur = chain_next;
        }
    }

    fn queue_push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(s) = self.slots[idx].as_mut() {
            s.queue_prev = None;
            s.queue_next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(s) = self.slots[h].as_mut() {
                s.queue_prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn queue_unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(s) => (s.queue_prev, s.queue_next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slots[p].as_mut() {
                    s.queue_next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.queue_prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(s) = self.slots[idx].as_mut() {
            s.queue_prev = None;
            s.queue_next = None;
        }
    }
}
