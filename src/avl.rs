//! AVL tree keyed by any totally ordered key (appointment timestamps in practice).
//!
//! Nodes own their children through `Box`; rebalancing happens on the way back
//! up the recursion, so no parent links are stored. Every mutating operation
//! reports how many key comparisons and rotations it performed.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    /// Height of the subtree rooted here; a leaf has height 1.
    height: u32,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    #[inline]
    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// `height(left) - height(right)`.
    #[inline]
    fn balance(&self) -> i32 {
        height(&self.left) as i32 - height(&self.right) as i32
    }
}

#[inline]
fn height<K, V>(link: &Link<K, V>) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

#[inline]
fn balance_of<K, V>(link: &Link<K, V>) -> i32 {
    link.as_ref().map_or(0, |n| n.balance())
}

/// Per-operation work counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpCounters {
    pub comparisons: usize,
    pub rotations: usize,
}

#[derive(Debug)]
pub struct InsertReport<V> {
    /// Previous payload when the key was already present.
    pub replaced: Option<V>,
    pub comparisons: usize,
    pub rotations: usize,
    /// Tree height after the insert.
    pub height: u32,
}

#[derive(Debug)]
pub struct RemoveReport<V> {
    pub removed: Option<V>,
    pub comparisons: usize,
    pub rotations: usize,
    pub height: u32,
}

#[derive(Debug)]
pub struct Lookup<'a, V> {
    pub value: Option<&'a V>,
    pub comparisons: usize,
}

impl<V> Lookup<'_, V> {
    #[inline]
    pub fn found(&self) -> bool {
        self.value.is_some()
    }
}

/// In-order snapshot plus a structural health check.
#[derive(Debug)]
pub struct Listing<'a, K, V> {
    pub entries: Vec<(&'a K, &'a V)>,
    pub height: u32,
    pub balanced: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexStats {
    pub len: usize,
    pub height: u32,
    /// `floor(log2(len))`, the height of a perfectly packed tree minus one.
    pub min_height: u32,
    pub balanced: bool,
    /// Rotations performed over the lifetime of the index.
    pub total_rotations: usize,
    pub root_balance: i32,
    /// Number of nodes at each depth, root first.
    pub levels: Vec<usize>,
    /// `ceil(log2(len)) / height * 100`.
    pub height_efficiency: f64,
}

/// Self-balancing ordered index.
#[derive(Clone)]
pub struct OrderedIndex<K, V> {
    root: Link<K, V>,
    count: usize,
    total_rotations: usize,
}

// =============================================================================
// Rotations
// =============================================================================

/// Right rotation around `y`: its left child `x` becomes the subtree root.
fn rotate_right<K, V>(mut y: Box<Node<K, V>>, ctr: &mut OpCounters) -> Box<Node<K, V>> {
    ctr.rotations += 1;
    let mut x = y.left.take().expect("right rotation needs a left child");
    y.left = x.right.take();
    y.update();
    x.right = Some(y);
    x.update();
    x
}

/// Left rotation around `x`: its right child `y` becomes the subtree root.
fn rotate_left<K, V>(mut x: Box<Node<K, V>>, ctr: &mut OpCounters) -> Box<Node<K, V>> {
    ctr.rotations += 1;
    let mut y = x.right.take().expect("left rotation needs a right child");
    x.right = y.left.take();
    x.update();
    y.left = Some(x);
    y.update();
    y
}

fn assert_balanced<K, V>(node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let b = node.balance();
    assert!(
        (-1..=1).contains(&b),
        "AVL rebalance left a balance factor of {b}"
    );
    node
}

/// Which way the descent went at a node.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Left,
    Right,
    Here,
}

/// Insert-time repair. `below` is the direction taken at the heavy child, which
/// is the same as comparing the inserted key against that child's key.
fn rebalance_after_insert<K, V>(
    mut node: Box<Node<K, V>>,
    below: Step,
    ctr: &mut OpCounters,
) -> Box<Node<K, V>> {
    let b = node.balance();
    let node = match below {
        Step::Left if b > 1 => rotate_right(node, ctr),
        Step::Right if b < -1 => rotate_left(node, ctr),
        Step::Right if b > 1 => {
            node.left = node.left.take().map(|l| rotate_left(l, ctr));
            rotate_right(node, ctr)
        }
        Step::Left if b < -1 => {
            node.right = node.right.take().map(|r| rotate_right(r, ctr));
            rotate_left(node, ctr)
        }
        _ => return rebalance(node, ctr),
    };
    assert_balanced(node)
}

/// Delete-time repair, driven by the children's balance factors.
fn rebalance<K, V>(mut node: Box<Node<K, V>>, ctr: &mut OpCounters) -> Box<Node<K, V>> {
    node.update();
    let b = node.balance();
    if b > 1 {
        if balance_of(&node.left) < 0 {
            node.left = node.left.take().map(|l| rotate_left(l, ctr));
        }
        node = rotate_right(node, ctr);
    } else if b < -1 {
        if balance_of(&node.right) > 0 {
            node.right = node.right.take().map(|r| rotate_right(r, ctr));
        }
        node = rotate_left(node, ctr);
    }
    assert_balanced(node)
}

// =============================================================================
// Recursive insert / remove
// =============================================================================

fn insert_at<K: Ord, V>(
    link: &mut Link<K, V>,
    key: K,
    value: V,
    ctr: &mut OpCounters,
) -> (Option<V>, Step) {
    let node = match link {
        None => {
            *link = Some(Box::new(Node::new(key, value)));
            return (None, Step::Here);
        }
        Some(node) => node,
    };

    ctr.comparisons += 1;
    let (step, (replaced, below)) = match key.cmp(&node.key) {
        Ordering::Less => (Step::Left, insert_at(&mut node.left, key, value, ctr)),
        Ordering::Greater => (Step::Right, insert_at(&mut node.right, key, value, ctr)),
        Ordering::Equal => {
            return (Some(std::mem::replace(&mut node.value, value)), Step::Here);
        }
    };

    // Payload replacement leaves the shape untouched.
    if replaced.is_some() {
        return (replaced, step);
    }

    node.update();
    if node.balance().abs() > 1 {
        if let Some(heavy) = link.take() {
            *link = Some(rebalance_after_insert(heavy, below, ctr));
        }
    }
    (None, step)
}

/// Detach the minimum of the subtree, returning it and the rebalanced rest.
fn take_min<K, V>(mut node: Box<Node<K, V>>, ctr: &mut OpCounters) -> (Box<Node<K, V>>, Link<K, V>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (node, rest)
        }
        Some(left) => {
            let (min, rest) = take_min(left, ctr);
            node.left = rest;
            (min, Some(rebalance(node, ctr)))
        }
    }
}

fn remove_at<K: Ord, V>(link: &mut Link<K, V>, key: &K, ctr: &mut OpCounters) -> Option<V> {
    let node = link.as_mut()?;
    ctr.comparisons += 1;
    let removed = match key.cmp(&node.key) {
        Ordering::Less => remove_at(&mut node.left, key, ctr)?,
        Ordering::Greater => remove_at(&mut node.right, key, ctr)?,
        Ordering::Equal => {
            let mut old = link.take()?;
            *link = match (old.left.take(), old.right.take()) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    // Splice in the in-order successor.
                    let (mut successor, rest) = take_min(right, ctr);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(successor)
                }
            };
            old.value
        }
    };

    if let Some(node) = link.take() {
        *link = Some(rebalance(node, ctr));
    }
    Some(removed)
}

// =============================================================================
// Public API
// =============================================================================

impl<K, V> OrderedIndex<K, V> {
    pub fn new() -> Self {
        Self {
            root: None,
            count: 0,
            total_rotations: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Height of the tree; 0 when empty.
    #[inline]
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    /// Whether every node satisfies `|balance| <= 1` with correct stored heights.
    pub fn is_balanced(&self) -> bool {
        fn check<K, V>(link: &Link<K, V>) -> Option<u32> {
            match link {
                None => Some(0),
                Some(n) => {
                    let l = check(&n.left)?;
                    let r = check(&n.right)?;
                    let h = 1 + l.max(r);
                    (l.abs_diff(r) <= 1 && n.height == h).then_some(h)
                }
            }
        }
        check(&self.root).is_some()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter { stack: Vec::new() };
        it.push_left(&self.root);
        it
    }

    pub fn in_order(&self) -> Listing<'_, K, V> {
        Listing {
            entries: self.iter().collect(),
            height: self.height(),
            balanced: self.is_balanced(),
        }
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &node.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &node.value))
    }

    pub fn stats(&self) -> IndexStats {
        let mut levels = Vec::new();
        let mut frontier: Vec<&Node<K, V>> = self.root.as_deref().into_iter().collect();
        while !frontier.is_empty() {
            levels.push(frontier.len());
            frontier = frontier
                .into_iter()
                .flat_map(|n| n.left.as_deref().into_iter().chain(n.right.as_deref()))
                .collect();
        }

        let n = self.count;
        let height = self.height();
        IndexStats {
            len: n,
            height,
            min_height: if n > 0 { (n as f64).log2().floor() as u32 } else { 0 },
            balanced: self.is_balanced(),
            total_rotations: self.total_rotations,
            root_balance: self.root.as_ref().map_or(0, |r| r.balance()),
            levels,
            height_efficiency: if n <= 1 {
                100.0
            } else {
                (n as f64).log2().ceil() / f64::from(height) * 100.0
            },
        }
    }
}

impl<K: Ord, V> OrderedIndex<K, V> {
    /// Insert `value` under `key`, replacing the payload of an existing key
    /// without touching the tree shape.
    pub fn insert(&mut self, key: K, value: V) -> InsertReport<V> {
        let mut ctr = OpCounters::default();
        let (replaced, _) = insert_at(&mut self.root, key, value, &mut ctr);
        if replaced.is_none() {
            self.count += 1;
        }
        self.total_rotations += ctr.rotations;
        InsertReport {
            replaced,
            comparisons: ctr.comparisons,
            rotations: ctr.rotations,
            height: self.height(),
        }
    }

    pub fn remove(&mut self, key: &K) -> RemoveReport<V> {
        let mut ctr = OpCounters::default();
        let removed = remove_at(&mut self.root, key, &mut ctr);
        if removed.is_some() {
            self.count -= 1;
        }
        self.total_rotations += ctr.rotations;
        RemoveReport {
            removed,
            comparisons: ctr.comparisons,
            rotations: ctr.rotations,
            height: self.height(),
        }
    }

    pub fn lookup(&self, key: &K) -> Lookup<'_, V> {
        let mut comparisons = 0;
        let mut link = &self.root;
        while let Some(node) = link {
            comparisons += 1;
            link = match key.cmp(&node.key) {
                Ordering::Less => &node.left,
                Ordering::Greater => &node.right,
                Ordering::Equal => {
                    return Lookup {
                        value: Some(&node.value),
                        comparisons,
                    }
                }
            };
        }
        Lookup {
            value: None,
            comparisons,
        }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.lookup(key).value
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Depth of `key` (root = 0).
    pub fn level_of(&self, key: &K) -> Option<usize> {
        let mut depth = 0;
        let mut link = &self.root;
        while let Some(node) = link {
            link = match key.cmp(&node.key) {
                Ordering::Less => &node.left,
                Ordering::Greater => &node.right,
                Ordering::Equal => return Some(depth),
            };
            depth += 1;
        }
        None
    }

    /// Entries with `lo <= key <= hi`, in order.
    pub fn range(&self, lo: &K, hi: &K) -> Vec<(&K, &V)> {
        fn walk<'a, K: Ord, V>(link: &'a Link<K, V>, lo: &K, hi: &K, out: &mut Vec<(&'a K, &'a V)>) {
            let Some(node) = link else { return };
            if node.key > *lo {
                walk(&node.left, lo, hi, out);
            }
            if node.key >= *lo && node.key <= *hi {
                out.push((&node.key, &node.value));
            }
            if node.key < *hi {
                walk(&node.right, lo, hi, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.root, lo, hi, &mut out);
        out
    }
}

impl<K: fmt::Display, V> OrderedIndex<K, V> {
    /// Text rendering, right subtree above left: `key (h:height, b:balance)`.
    pub fn outline(&self) -> Vec<String> {
        fn rec<K: fmt::Display, V>(node: &Node<K, V>, prefix: &str, last: bool, out: &mut Vec<String>) {
            let branch = if last { "└── " } else { "├── " };
            out.push(format!(
                "{prefix}{branch}{} (h:{}, b:{})",
                node.key,
                node.height,
                node.balance()
            ));
            let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
            if let Some(right) = node.right.as_deref() {
                rec(right, &child_prefix, node.left.is_none(), out);
            }
            if let Some(left) = node.left.as_deref() {
                rec(left, &child_prefix, true, out);
            }
        }
        let mut out = Vec::new();
        if let Some(root) = self.root.as_deref() {
            rec(root, "", true, &mut out);
        }
        out
    }
}

impl<K, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut link: &'a Link<K, V>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
pub(crate) fn check_index<K: Ord + fmt::Debug, V>(t: &OrderedIndex<K, V>) {
    fn rec<K: Ord + fmt::Debug, V>(link: &Link<K, V>) -> (u32, usize) {
        let Some(n) = link else { return (0, 0) };
        if let Some(l) = n.left.as_deref() {
            assert!(l.key < n.key, "left key {:?} !< {:?}", l.key, n.key);
        }
        if let Some(r) = n.right.as_deref() {
            assert!(r.key > n.key, "right key {:?} !> {:?}", r.key, n.key);
        }
        let (lh, lc) = rec(&n.left);
        let (rh, rc) = rec(&n.right);
        assert!(lh.abs_diff(rh) <= 1, "unbalanced at {:?}", n.key);
        assert_eq!(n.height, 1 + lh.max(rh), "stale height at {:?}", n.key);
        (n.height, lc + rc + 1)
    }
    let (h, count) = rec(&t.root);
    assert_eq!(count, t.len(), "reachable node count must match len");
    let bound = (1.44 * ((t.len() + 2) as f64).log2()).ceil() as u32;
    assert!(h <= bound, "height {h} exceeds AVL bound {bound} for n={}", t.len());
    let keys: Vec<&K> = t.iter().map(|(k, _)| k).collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "in-order keys not ascending");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_basic() {
        let mut t: OrderedIndex<u32, &str> = OrderedIndex::new();
        assert!(t.insert(2, "b").replaced.is_none());
        t.insert(1, "a");
        t.insert(3, "c");
        assert_eq!(t.get(&1), Some(&"a"));
        assert_eq!(t.get(&3), Some(&"c"));
        assert_eq!(t.get(&4), None);
        assert_eq!(t.len(), 3);
        check_index(&t);
    }

    #[test]
    fn test_balanced_insert_order_needs_no_rotation() {
        let mut t = OrderedIndex::new();
        let a = t.insert(ts("10:00"), "a");
        let b = t.insert(ts("09:00"), "b");
        assert_eq!((a.rotations, b.rotations), (0, 0));
        assert_eq!(b.height, 2);
        assert_eq!(t.stats().root_balance, 1);

        let c = t.insert(ts("11:00"), "c");
        assert_eq!(c.rotations, 0);
        assert_eq!(c.comparisons, 1);
        assert_eq!(t.stats().root_balance, 0);

        let keys: Vec<String> = t.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["09:00", "10:00", "11:00"]);
    }

    #[test]
    fn test_single_rotations() {
        // Ascending keys unbalance to the right: one left rotation.
        let mut t = OrderedIndex::new();
        t.insert(ts("09:00"), ());
        t.insert(ts("10:00"), ());
        let r = t.insert(ts("11:00"), ());
        assert_eq!(r.rotations, 1);
        assert_eq!(t.level_of(&ts("10:00")), Some(0));
        assert_eq!(r.height, 2);

        // Descending keys: one right rotation.
        let mut t = OrderedIndex::new();
        t.insert(3, ());
        t.insert(2, ());
        let r = t.insert(1, ());
        assert_eq!(r.rotations, 1);
        assert_eq!(t.level_of(&2), Some(0));
    }

    #[test]
    fn test_double_rotations() {
        // Left-right case.
        let mut t = OrderedIndex::new();
        t.insert(30, ());
        t.insert(10, ());
        let r = t.insert(20, ());
        assert_eq!(r.rotations, 2);
        assert_eq!(t.level_of(&20), Some(0));
        check_index(&t);

        // Right-left case.
        let mut t = OrderedIndex::new();
        t.insert(10, ());
        t.insert(30, ());
        let r = t.insert(20, ());
        assert_eq!(r.rotations, 2);
        assert_eq!(t.level_of(&20), Some(0));
        assert_eq!(t.stats().total_rotations, 2);
    }

    #[test]
    fn test_duplicate_key_replaces_payload() {
        let mut t = OrderedIndex::new();
        t.insert(ts("2024-03-01 09:00"), "first");
        t.insert(ts("2024-03-01 10:00"), "other");
        let h = t.height();
        let r = t.insert(ts("2024-03-01T09:00:00Z"), "second");
        assert_eq!(r.replaced, Some("first"));
        assert_eq!(r.rotations, 0);
        assert_eq!(r.height, h);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&ts("2024-03-01 09:00:00")), Some(&"second"));
    }

    #[test]
    fn test_remove_cases() {
        let mut t = OrderedIndex::new();
        for k in [50, 30, 70, 20, 40, 60, 80, 35] {
            t.insert(k, k * 10);
        }

        // leaf
        assert_eq!(t.remove(&80).removed, Some(800));
        check_index(&t);
        // one child
        assert_eq!(t.remove(&40).removed, Some(400));
        check_index(&t);
        // root with two children: successor splice
        let r = t.remove(&50);
        assert_eq!(r.removed, Some(500));
        assert!(r.comparisons >= 1);
        check_index(&t);
        assert!(!t.contains_key(&50));
        assert_eq!(t.level_of(&60), Some(0));

        let miss = t.remove(&999);
        assert!(miss.removed.is_none());
        assert_eq!(miss.rotations, 0);
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn test_remove_root_two_children_uses_successor() {
        let mut t = OrderedIndex::new();
        for k in [2, 1, 4, 3, 5] {
            t.insert(k, ());
        }
        t.remove(&2);
        assert_eq!(t.level_of(&3), Some(0));
        check_index(&t);
    }

    #[test]
    fn test_remove_triggers_rotation() {
        let mut t = OrderedIndex::new();
        for k in [2, 1, 3, 4] {
            t.insert(k, ());
        }
        let r = t.remove(&1);
        assert_eq!(r.rotations, 1);
        assert_eq!(t.level_of(&3), Some(0));
        check_index(&t);
    }

    #[test]
    fn test_lookup_comparisons() {
        let mut t = OrderedIndex::new();
        for k in 1..=7 {
            t.insert(k, ());
        }
        // Perfect tree rooted at 4.
        assert_eq!(t.lookup(&4).comparisons, 1);
        assert_eq!(t.lookup(&1).comparisons, 3);
        let miss = t.lookup(&8);
        assert!(!miss.found());
        assert_eq!(miss.comparisons, 3);
    }

    #[test]
    fn test_listing_range_and_ends() {
        let mut t = OrderedIndex::new();
        for k in [5, 3, 8, 1, 4, 9] {
            t.insert(k, k);
        }
        let listing = t.in_order();
        assert!(listing.balanced);
        let keys: Vec<i32> = listing.entries.iter().map(|(k, _)| **k).collect();
        assert_eq!(keys, vec![1, 3, 4, 5, 8, 9]);
        let mid: Vec<i32> = t.range(&3, &8).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(mid, vec![3, 4, 5, 8]);
        assert_eq!(t.first(), Some((&1, &1)));
        assert_eq!(t.last(), Some((&9, &9)));
    }

    #[test]
    fn test_stats_and_outline() {
        let mut t = OrderedIndex::new();
        for k in 1..=7 {
            t.insert(k, ());
        }
        let s = t.stats();
        assert_eq!(s.len, 7);
        assert_eq!(s.height, 3);
        assert_eq!(s.min_height, 2);
        assert_eq!(s.levels, vec![1, 2, 4]);
        assert!(s.balanced);
        assert!((s.height_efficiency - 100.0).abs() < 1e-9);

        let lines = t.outline();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "└── 4 (h:3, b:0)");
        assert_eq!(lines[1], "    ├── 6 (h:2, b:0)");
    }

    #[test]
    fn test_randomized_against_btreemap() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::BTreeMap;

        let mut rng = StdRng::seed_from_u64(3);
        let mut t: OrderedIndex<u32, u64> = OrderedIndex::new();
        let mut m: BTreeMap<u32, u64> = BTreeMap::new();

        for i in 0..20_000 {
            let k = rng.gen_range(0..2_000u32);
            match rng.gen_range(0..100) {
                0..=54 => {
                    let v: u64 = rng.gen();
                    assert_eq!(t.insert(k, v).replaced, m.insert(k, v));
                }
                55..=84 => assert_eq!(t.remove(&k).removed, m.remove(&k)),
                _ => assert_eq!(t.get(&k), m.get(&k)),
            }
            if i % 1000 == 0 {
                check_index(&t);
            }
        }

        check_index(&t);
        let got: Vec<(u32, u64)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u32, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    }
}
