//! Separately chained hash table keyed by normalized identifiers.
//!
//! Keys are reduced to their ASCII digits before hashing, so `"123.456.789-01"`
//! and `"12345678901"` address the same record. The bucket count is always
//! prime and the table rehashes into the next prime at or above twice its size
//! once the load factor passes [`MAX_LOAD_FACTOR`].

use std::collections::BTreeMap;

use serde::Serialize;
use smallvec::SmallVec;

/// Bucket count used by [`KeyedTable::new`].
pub const DEFAULT_CAPACITY: usize = 1009;

/// Growth is triggered as soon as `len / capacity` exceeds this.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

type Bucket<V> = SmallVec<[(String, V); 2]>;

/// Strip every non-digit character from `key`.
pub fn normalize_key(key: &str) -> String {
    key.chars().filter(char::is_ascii_digit).collect()
}

/// Weighted positional digit sum: `sum(digit[i] * (i + 1)) mod capacity`.
#[inline]
fn bucket_of(normalized: &str, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    let sum = normalized
        .bytes()
        .enumerate()
        .fold(0u64, |acc, (i, b)| {
            acc.wrapping_add(u64::from(b - b'0').wrapping_mul(i as u64 + 1))
        });
    (sum % capacity as u64) as usize
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n == 2 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= n`.
pub fn next_prime(mut n: usize) -> usize {
    while !is_prime(n) {
        n += 1;
    }
    n
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertKind {
    Inserted,
    Updated,
}

/// What an insert did and where the record ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub kind: InsertKind,
    /// Bucket holding the record once the insert (and any growth) finished.
    pub bucket: usize,
    /// Other records sharing that bucket.
    pub collisions_in_bucket: usize,
    /// Whether this insert triggered a rehash.
    pub grew: bool,
}

#[derive(Debug)]
pub struct Lookup<'a, V> {
    pub value: Option<&'a V>,
    /// Key comparisons made while scanning the bucket.
    pub comparisons: usize,
    pub bucket: usize,
}

impl<V> Lookup<'_, V> {
    #[inline]
    pub fn found(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableStats {
    pub len: usize,
    pub capacity: usize,
    pub load_factor: f64,
    pub empty_buckets: usize,
    pub occupied_buckets: usize,
    pub colliding_buckets: usize,
    /// Sum over buckets of `max(0, bucket_len - 1)`.
    pub total_collisions: usize,
    pub max_bucket_len: usize,
    /// `total_collisions / len * 100`, or 0 for an empty table.
    pub collision_rate: f64,
    /// `len / (len + total_collisions) * 100`, or 100 for an empty table.
    pub efficiency: f64,
    /// Bucket length -> number of buckets with that length.
    pub distribution: BTreeMap<usize, usize>,
}

/// Hash table of records keyed by a digit-normalized identifier.
#[derive(Clone)]
pub struct KeyedTable<V> {
    buckets: Vec<Bucket<V>>,
    count: usize,
}

impl<V> KeyedTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a table with at least `capacity` buckets, rounded up to a prime.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = next_prime(capacity.max(2));
        Self {
            buckets: (0..capacity).map(|_| Bucket::new()).collect(),
            count: 0,
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

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Insert or replace the record stored under `key`.
    pub fn insert(&mut self, key: &str, value: V) -> InsertOutcome {
        let key = normalize_key(key);
        let idx = bucket_of(&key, self.capacity());
        let fits = (self.count + 1) as f64 / self.capacity() as f64 <= MAX_LOAD_FACTOR;
        let bucket = &mut self.buckets[idx];

        if let Some(slot) = bucket.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return InsertOutcome {
                kind: InsertKind::Updated,
                bucket: idx,
                collisions_in_bucket: bucket.len() - 1,
                grew: false,
            };
        }

        if fits {
            bucket.push((key, value));
            self.count += 1;
            return InsertOutcome {
                kind: InsertKind::Inserted,
                bucket: idx,
                collisions_in_bucket: bucket.len() - 1,
                grew: false,
            };
        }

        let placed = key.clone();
        bucket.push((key, value));
        self.count += 1;
        while self.load_factor() > MAX_LOAD_FACTOR {
            self.grow();
        }
        let bucket = bucket_of(&placed, self.capacity());
        InsertOutcome {
            kind: InsertKind::Inserted,
            bucket,
            collisions_in_bucket: self.buckets[bucket].len() - 1,
            grew: true,
        }
    }

    /// Rehash every pair into `next_prime(2 * capacity)` buckets.
    fn grow(&mut self) {
        let new_capacity = next_prime(self.capacity() * 2);
        tracing::debug!(
            from = self.capacity(),
            to = new_capacity,
            len = self.count,
            "growing keyed table"
        );
        let old = std::mem::replace(
            &mut self.buckets,
            (0..new_capacity).map(|_| Bucket::new()).collect(),
        );
        for (key, value) in old.into_iter().flatten() {
            let idx = bucket_of(&key, new_capacity);
            self.buckets[idx].push((key, value));
        }
    }

    pub fn lookup(&self, key: &str) -> Lookup<'_, V> {
        let key = normalize_key(key);
        let bucket = bucket_of(&key, self.capacity());
        let mut comparisons = 0;
        for (k, v) in &self.buckets[bucket] {
            comparisons += 1;
            if *k == key {
                return Lookup {
                    value: Some(v),
                    comparisons,
                    bucket,
                };
            }
        }
        Lookup {
            value: None,
            comparisons,
            bucket,
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.lookup(key).value
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let key = normalize_key(key);
        let idx = bucket_of(&key, self.capacity());
        self.buckets[idx]
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove the record under `key`, keeping the remaining bucket order.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let key = normalize_key(key);
        let idx = bucket_of(&key, self.capacity());
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|(k, _)| *k == key)?;
        let (_, value) = bucket.remove(pos);
        self.count -= 1;
        Some(value)
    }

    /// All pairs in bucket order, then insertion order within a bucket.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.buckets
            .iter()
            .flat_map(|b| b.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Lengths of the first `limit` buckets.
    pub fn distribution(&self, limit: usize) -> Vec<usize> {
        self.buckets.iter().take(limit).map(|b| b.len()).collect()
    }

    pub fn stats(&self) -> TableStats {
        let mut empty_buckets = 0;
        let mut colliding_buckets = 0;
        let mut total_collisions = 0;
        let mut max_bucket_len = 0;
        let mut distribution = BTreeMap::new();

        for bucket in &self.buckets {
            let n = bucket.len();
            if n == 0 {
                empty_buckets += 1;
            } else if n > 1 {
                colliding_buckets += 1;
                total_collisions += n - 1;
            }
            max_bucket_len = max_bucket_len.max(n);
            *distribution.entry(n).or_insert(0) += 1;
        }

        TableStats {
            len: self.count,
            capacity: self.capacity(),
            load_factor: self.load_factor(),
            empty_buckets,
            occupied_buckets: self.capacity() - empty_buckets,
            colliding_buckets,
            total_collisions,
            max_bucket_len,
            collision_rate: if self.count > 0 {
                total_collisions as f64 / self.count as f64 * 100.0
            } else {
                0.0
            },
            efficiency: if self.count > 0 {
                self.count as f64 / (self.count + total_collisions) as f64 * 100.0
            } else {
                100.0
            },
            distribution,
        }
    }
}

impl<V> Default for KeyedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for KeyedTable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
pub(crate) fn check_table<V>(t: &KeyedTable<V>) {
    assert!(is_prime(t.capacity()), "capacity {} is not prime", t.capacity());
    let mut seen = std::collections::HashSet::new();
    let mut n = 0;
    for (idx, bucket) in t.buckets.iter().enumerate() {
        for (k, _) in bucket {
            assert!(k.bytes().all(|b| b.is_ascii_digit()), "unnormalized key {k:?}");
            assert_eq!(bucket_of(k, t.capacity()), idx, "key {k} in wrong bucket");
            assert!(seen.insert(k.clone()), "duplicate key {k}");
            n += 1;
        }
    }
    assert_eq!(n, t.len(), "stored pairs must match len");
    assert!(t.load_factor() <= MAX_LOAD_FACTOR);
}
