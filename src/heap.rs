//! Binary min-heap for triage: lower priority class first, then earlier arrival.
//!
//! The heap is a dense array (`parent(i) = (i - 1) / 2`, children `2i + 1` and
//! `2i + 2`). Entries also carry an insertion sequence number, used only when
//! priority and arrival are both equal, so such entries leave in FIFO order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry<T> {
    /// External identity used by [`PriorityQueue::remove_by_id`].
    pub id: String,
    /// Lower is more urgent.
    pub priority: u32,
    /// Arrival time (seconds); breaks ties within a priority class.
    pub arrival: i64,
    pub payload: T,
    #[serde(skip)]
    seq: u64,
}

impl<T> QueueEntry<T> {
    pub fn new(id: impl Into<String>, priority: u32, arrival: i64, payload: T) -> Self {
        Self {
            id: id.into(),
            priority,
            arrival,
            payload,
            seq: 0,
        }
    }
}

/// `(priority, arrival)` ascending, then insertion order.
#[inline]
fn order<T>(a: &QueueEntry<T>, b: &QueueEntry<T>) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.arrival.cmp(&b.arrival))
        .then(a.seq.cmp(&b.seq))
}

/// Work done by one sift pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SiftCounters {
    comparisons: usize,
    swaps: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub comparisons: usize,
    pub swaps: usize,
    /// 1-based position of the new entry in extraction order.
    pub rank: usize,
}

#[derive(Debug)]
pub struct Popped<T> {
    pub entry: QueueEntry<T>,
    pub comparisons: usize,
    pub swaps: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub height: u32,
    pub complete: bool,
    pub by_priority: BTreeMap<u32, usize>,
    pub total_comparisons: usize,
    pub total_swaps: usize,
    /// Mean time waited so far, in minutes.
    pub mean_wait_minutes: f64,
    /// `(floor(log2(len)) + 1) / height * 100`; 100 for one entry or none.
    pub efficiency: f64,
}

#[derive(Clone, Debug)]
pub struct PriorityQueue<T> {
    heap: Vec<QueueEntry<T>>,
    next_seq: u64,
    total_comparisons: usize,
    total_swaps: usize,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            next_seq: 0,
            total_comparisons: 0,
            total_swaps: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Raw heap order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry<T>> {
        self.heap.iter()
    }

    pub fn insert(&mut self, mut entry: QueueEntry<T>) -> PushReport {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(entry);

        let mut ctr = SiftCounters::default();
        let at = self.sift_up(self.heap.len() - 1, &mut ctr);
        self.record(ctr);

        let placed = &self.heap[at];
        let rank = 1 + self
            .heap
            .iter()
            .filter(|e| order(*e, placed) == Ordering::Less)
            .count();
        PushReport {
            comparisons: ctr.comparisons,
            swaps: ctr.swaps,
            rank,
        }
    }

    /// Remove and return the most urgent entry.
    pub fn extract_min(&mut self) -> Result<Popped<T>> {
        if self.heap.is_empty() {
            return Err(Error::EmptyQueue);
        }
        // swap_remove moves the last entry into the root slot.
        let entry = self.heap.swap_remove(0);
        let mut ctr = SiftCounters::default();
        if !self.heap.is_empty() {
            self.sift_down(0, &mut ctr);
        }
        self.record(ctr);
        Ok(Popped {
            entry,
            comparisons: ctr.comparisons,
            swaps: ctr.swaps,
        })
    }

    #[inline]
    pub fn peek_min(&self) -> Option<&QueueEntry<T>> {
        self.heap.first()
    }

    /// Remove the entry with the given id (linear scan).
    pub fn remove_by_id(&mut self, id: &str) -> Option<QueueEntry<T>> {
        let idx = self.heap.iter().position(|e| e.id == id)?;
        let removed = self.heap.swap_remove(idx);
        if idx < self.heap.len() {
            // The replacement came from the last leaf: it may belong above or
            // below this slot.
            let mut ctr = SiftCounters::default();
            self.sift_up(idx, &mut ctr);
            self.sift_down(idx, &mut ctr);
            self.record(ctr);
        }
        Some(removed)
    }

    /// Entries in extraction order, without touching the heap.
    pub fn ordered(&self) -> Vec<&QueueEntry<T>> {
        let mut out: Vec<&QueueEntry<T>> = self.heap.iter().collect();
        out.sort_by(|a, b| order(*a, *b));
        out
    }

    /// 1-based extraction position of the entry with `id`.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        let target = self.heap.iter().find(|e| e.id == id)?;
        Some(
            1 + self
                .heap
                .iter()
                .filter(|e| order(*e, target) == Ordering::Less)
                .count(),
        )
    }

    pub fn count_by_priority(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.heap {
            *counts.entry(e.priority).or_insert(0) += 1;
        }
        counts
    }

    /// `floor(log2(n)) + 1`, or 0 when empty.
    pub fn height(&self) -> u32 {
        usize::BITS - self.heap.len().leading_zeros()
    }

    pub fn is_complete(&self) -> bool {
        match self.height() {
            0 => true,
            h => self.heap.len() >= 1usize << (h - 1),
        }
    }

    /// Optimal height over actual height, as a percentage.
    pub fn efficiency(&self) -> f64 {
        let n = self.heap.len();
        if n <= 1 {
            return 100.0;
        }
        let optimal = n.ilog2() + 1;
        f64::from(optimal) / f64::from(self.height()) * 100.0
    }

    /// Check min-heap order over the whole array.
    pub fn is_valid(&self) -> bool {
        (1..self.heap.len()).all(|i| order(&self.heap[(i - 1) / 2], &self.heap[i]) != Ordering::Greater)
    }

    pub fn stats(&self, now: i64) -> QueueStats {
        let mean_wait_minutes = if self.heap.is_empty() {
            0.0
        } else {
            let waited: i64 = self.heap.iter().map(|e| now - e.arrival).sum();
            waited as f64 / self.heap.len() as f64 / 60.0
        };
        QueueStats {
            len: self.heap.len(),
            height: self.height(),
            complete: self.is_complete(),
            by_priority: self.count_by_priority(),
            total_comparisons: self.total_comparisons,
            total_swaps: self.total_swaps,
            mean_wait_minutes,
            efficiency: self.efficiency(),
        }
    }

    /// Text rendering of the heap shape: `id (p<priority>)`, right child first.
    pub fn outline(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.heap.len());
        if !self.heap.is_empty() {
            self.outline_rec(0, "", true, &mut out);
        }
        out
    }

    fn outline_rec(&self, i: usize, prefix: &str, last: bool, out: &mut Vec<String>) {
        let e = &self.heap[i];
        let branch = if last { "└── " } else { "├── " };
        out.push(format!("{prefix}{branch}{} (p{})", e.id, e.priority));
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        let (l, r) = (2 * i + 1, 2 * i + 2);
        if r < self.heap.len() {
            self.outline_rec(r, &child_prefix, false, out);
        }
        if l < self.heap.len() {
            self.outline_rec(l, &child_prefix, true, out);
        }
    }

    fn record(&mut self, ctr: SiftCounters) {
        self.total_comparisons += ctr.comparisons;
        self.total_swaps += ctr.swaps;
    }

    fn sift_up(&mut self, mut i: usize, ctr: &mut SiftCounters) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            ctr.comparisons += 1;
            if order(&self.heap[i], &self.heap[parent]) != Ordering::Less {
                break;
            }
            self.heap.swap(i, parent);
            ctr.swaps += 1;
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize, ctr: &mut SiftCounters) {
        let n = self.heap.len();
        loop {
            let mut smallest = i;
            for child in [2 * i + 1, 2 * i + 2] {
                if child < n {
                    ctr.comparisons += 1;
                    if order(&self.heap[child], &self.heap[smallest]) == Ordering::Less {
                        smallest = child;
                    }
                }
            }
            if smallest == i {
                break;
            }
            self.heap.swap(i, smallest);
            ctr.swaps += 1;
            i = smallest;
        }
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn check_heap<T>(q: &PriorityQueue<T>) {
    for i in 1..q.heap.len() {
        let parent = &q.heap[(i - 1) / 2];
        let child = &q.heap[i];
        assert!(
            (parent.priority, parent.arrival) <= (child.priority, child.arrival),
            "heap order violated at index {i}"
        );
    }
    assert!(q.is_valid());
    assert!(q.is_complete());
}
