//! Binary-heap priority queue with a comparator chosen at construction.
//!
//! The ordering is a plain function: bids pass highest-price-first, asks
//! lowest-price-first.
//!
//! Every pushed element is stamped with an insertion sequence. When the
//! comparator reports two elements equal, the earlier insertion wins.
//!
//! Complexity: `push` / `pop` / `update_head` are O(log n), `peek` /
//! `len` are O(1).

use std::cmp::Ordering;

/// Returns `Ordering::Less` when `a` must be served before `b`.
pub type Comparator<T> = fn(&T, &T) -> Ordering;

#[derive(Debug, Clone)]
struct Entry<T> {
    seq: u64,
    item: T,
}

#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    entries: Vec<Entry<T>>,
    cmp: Comparator<T>,
    next_seq: u64,
}

impl<T> PriorityQueue<T> {
    pub fn new(cmp: Comparator<T>) -> Self {
        PriorityQueue {
            entries: Vec::new(),
            cmp,
            next_seq: 0,
        }
    }

    /// Insert `item`, restoring heap order.
    pub fn push(&mut self, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, item });
        self.sift_up(self.entries.len() - 1);
    }

    /// Remove and return the highest-priority element.
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let top = self.entries.pop()?;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(top.item)
    }

    /// Highest-priority element without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.item)
    }

    /// Mutate the head element in place and re-settle it.
    ///
    /// The head can only move down, so any mutation keeps the heap valid.
    /// Returns `false` if the queue is empty.
    pub fn update_head<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.entries.first_mut() {
            Some(head) => {
                f(&mut head.item);
                self.sift_down(0);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone out every element in the order `pop` would return them.
    pub fn to_sorted_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut refs: Vec<&Entry<T>> = self.entries.iter().collect();
        refs.sort_by(|a, b| self.order(a, b));
        refs.into_iter().map(|e| e.item.clone()).collect()
    }

    // -------------------------------------------------------------------------
    // Heap maintenance
    // -------------------------------------------------------------------------

    fn order(&self, a: &Entry<T>, b: &Entry<T>) -> Ordering {
        (self.cmp)(&a.item, &b.item).then(a.seq.cmp(&b.seq))
    }

    fn before(&self, i: usize, j: usize) -> bool {
        self.order(&self.entries[i], &self.entries[j]) == Ordering::Less
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.before(idx, parent) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut best = idx;

            if left < len && self.before(left, best) {
                best = left;
            }
            if right < len && self.before(right, best) {
                best = right;
            }
            if best == idx {
                break;
            }
            self.entries.swap(idx, best);
            idx = best;
        }
    }
}
