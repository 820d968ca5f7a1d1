use crate::tick::Tick;

/// A tick-ordered queue with a stable tie-break: entries are keyed by
/// (tick, monotonic sequence number), so messages sharing a tick always pop
/// in original arrival order. Cross-peer delivery determinism depends on
/// this; an arbitrary tie-break would make replay order irreproducible.
///
/// Backed by an insertion-sorted vector scanned from the back, since
/// arrivals are nearly in tick order.
pub struct TickQueue<T> {
    list: Vec<(Tick, u64, T)>,
    next_seq: u64,
}

impl<T> TickQueue<T> {
    pub fn new() -> Self {
        Self {
            list: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Queue an item at the given tick, after any item already queued for
    /// that tick.
    pub fn push(&mut self, tick: Tick, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let mut index = self.list.len();
        loop {
            if index == 0 {
                self.list.insert(0, (tick, seq, item));
                return;
            }

            index -= 1;

            let (old_tick, _, _) = &self.list[index];
            if *old_tick <= tick {
                self.list.insert(index + 1, (tick, seq, item));
                return;
            }
        }
    }

    /// The tick and item at the front of the queue, without dequeuing.
    pub fn peek(&self) -> Option<(Tick, &T)> {
        self.list.first().map(|(tick, _, item)| (*tick, item))
    }

    pub fn pop(&mut self) -> Option<(Tick, T)> {
        if self.list.is_empty() {
            return None;
        }
        let (tick, _, item) = self.list.remove(0);
        Some((tick, item))
    }

    /// Remove every entry queued at the given tick, preserving their
    /// relative order. Used to retag sentinel-tagged messages at bootstrap.
    pub fn drain_tick(&mut self, tick: Tick) -> Vec<T> {
        let mut drained = Vec::new();
        let mut index = 0;
        while index < self.list.len() {
            if self.list[index].0 == tick {
                let (_, _, item) = self.list.remove(index);
                drained.push(item);
            } else {
                index += 1;
            }
        }
        drained
    }
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
