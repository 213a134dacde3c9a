use super::*;

use crate::avl::check_index;
use crate::heap::check_heap;
use crate::table::{check_table, normalize_key};

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
enum MapOp {
    Insert(String, u64),
    Remove(String),
    Get(String),
}

fn digit_key_strategy() -> impl Strategy<Value = String> + Clone {
    // Short digit strings collide often; punctuation checks normalization.
    "[0-9]{0,4}|[0-9]{3}\\.[0-9]{3}-[0-9]{2}"
}

fn map_ops_strategy() -> impl Strategy<Value = Vec<MapOp>> {
    let key = digit_key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        25 => key.clone().prop_map(MapOp::Remove),
        25 => key.clone().prop_map(MapOp::Get),
    ];
    prop::collection::vec(op, 0..=1500)
}

#[derive(Clone, Debug)]
enum IndexOp {
    Insert(u16, u64),
    Remove(u16),
    Get(u16),
}

fn index_ops_strategy() -> impl Strategy<Value = Vec<IndexOp>> {
    let key = 0u16..512;
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| IndexOp::Insert(k, v)),
        30 => key.clone().prop_map(IndexOp::Remove),
        20 => key.prop_map(IndexOp::Get),
    ];
    prop::collection::vec(op, 0..=2000)
}

#[derive(Clone, Debug, Arbitrary)]
enum HeapOp {
    #[proptest(weight = 5)]
    Push(
        #[proptest(strategy = "1u32..=3")] u32,
        #[proptest(strategy = "0i64..32")] i64,
    ),
    #[proptest(weight = 3)]
    Pop,
    #[proptest(weight = 2)]
    RemoveNth(#[proptest(strategy = "0usize..64")] usize),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_table_matches_hashmap(ops in map_ops_strategy()) {
        let mut t: KeyedTable<u64> = KeyedTable::with_capacity(11);
        let mut m: HashMap<String, u64> = HashMap::new();
        for op in ops {
            match op {
                MapOp::Insert(key, value) => {
                    let outcome = t.insert(&key, value);
                    let old = m.insert(normalize_key(&key), value);
                    prop_assert_eq!(outcome.kind == InsertKind::Updated, old.is_some());
                }
                MapOp::Remove(key) => {
                    let got = t.remove(&key);
                    let expected = m.remove(&normalize_key(&key));
                    prop_assert_eq!(got, expected);
                }
                MapOp::Get(key) => {
                    let got = t.get(&key).copied();
                    let expected = m.get(&normalize_key(&key)).copied();
                    prop_assert_eq!(got, expected);
                }
            }
            prop_assert_eq!(t.len(), m.len());
            prop_assert!(t.load_factor() <= 0.75);
        }
        check_table(&t);
        let mut got: Vec<(String, u64)> = t.iter().map(|(k, v)| (k.to_owned(), *v)).collect();
        let mut expected: Vec<(String, u64)> = m.into_iter().collect();
        got.sort();
        expected.sort();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_index_matches_btreemap(ops in index_ops_strategy()) {
        let mut t: OrderedIndex<u16, u64> = OrderedIndex::new();
        let mut m: BTreeMap<u16, u64> = BTreeMap::new();
        for op in ops {
            match op {
                IndexOp::Insert(key, value) => {
                    let report = t.insert(key, value);
                    prop_assert_eq!(report.replaced, m.insert(key, value));
                }
                IndexOp::Remove(key) => {
                    let report = t.remove(&key);
                    prop_assert_eq!(report.removed, m.remove(&key));
                }
                IndexOp::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                }
            }
            prop_assert_eq!(t.len(), m.len());
            prop_assert!(t.is_balanced());
        }
        check_index(&t);
        let got: Vec<(u16, u64)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_heap_matches_sorted_model(ops in prop::collection::vec(any::<HeapOp>(), 0..=1500)) {
        let mut q: PriorityQueue<u64> = PriorityQueue::new();
        let mut model: Vec<(u32, i64, u64)> = Vec::new();
        let mut next = 0u64;
        for op in ops {
            match op {
                HeapOp::Push(priority, arrival) => {
                    let report = q.insert(QueueEntry::new(next.to_string(), priority, arrival, next));
                    let ahead = model.iter().filter(|m| (m.0, m.1) <= (priority, arrival)).count();
                    prop_assert_eq!(report.rank, ahead + 1);
                    model.push((priority, arrival, next));
                    next += 1;
                }
                HeapOp::Pop => {
                    model.sort();
                    let expected = (!model.is_empty()).then(|| model.remove(0).2);
                    prop_assert_eq!(q.extract_min().ok().map(|p| p.entry.payload), expected);
                }
                HeapOp::RemoveNth(n) => {
                    if model.is_empty() {
                        continue;
                    }
                    let (_, _, id) = model.swap_remove(n % model.len());
                    let removed = q.remove_by_id(&id.to_string());
                    prop_assert_eq!(removed.map(|e| e.payload), Some(id));
                }
            }
            prop_assert_eq!(q.len(), model.len());
            check_heap(&q);
        }
        model.sort();
        let got: Vec<u64> = q.ordered().iter().map(|e| e.payload).collect();
        let expected: Vec<u64> = model.iter().map(|m| m.2).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_huffman_round_trip(data in prop::collection::vec(any::<u8>(), 1..=2048)) {
        let packed = huffman::compress(&data)?;
        prop_assert_eq!(packed.bits.len() as u64, packed.stats.encoded_bits);
        prop_assert!(packed.stats.efficiency <= 100.0 + 1e-9);

        let restored = huffman::decompress(&packed.bits, &packed.tree)?;
        prop_assert_eq!(&restored, &data);

        // The descriptor survives JSON and decodes identically.
        let json = packed.tree.to_json()?;
        let tree = huffman::HuffmanTree::from_descriptor(&huffman::TreeDescriptor::from_json(&json)?)?;
        prop_assert_eq!(tree.decode(&packed.bits)?.into_complete()?, data);
    }

    #[test]
    fn prop_huffman_single_symbol(symbol in any::<u8>(), n in 1usize..=512) {
        let data = vec![symbol; n];
        let packed = huffman::compress(&data)?;
        prop_assert_eq!(packed.bits.len(), n);
        prop_assert_eq!(huffman::decompress(&packed.bits, &packed.tree)?, data);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_index_insert_order() {
    let keys: Vec<u32> = (1..=7).collect();
    for_each_permutation(&keys, |perm| {
        let mut t: OrderedIndex<u32, usize> = OrderedIndex::new();
        for (i, k) in perm.into_iter().enumerate() {
            assert!(t.insert(k, i).replaced.is_none());
        }
        check_index(&t);
        assert!(t.height() <= 4);
        let got: Vec<u32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, keys);
    });
}

#[test]
fn exhaustive_index_remove_order() {
    let keys: Vec<u32> = (1..=7).collect();
    let mut base: OrderedIndex<u32, u32> = OrderedIndex::new();
    for &k in &keys {
        base.insert(k, k * 10);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        for k in perm {
            assert_eq!(t.remove(&k).removed, Some(k * 10));
            check_index(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.height(), 0);
    });
}

#[test]
fn exhaustive_heap_push_order() {
    let entries = [(1u32, 4i64), (1, 2), (2, 1), (3, 0), (2, 1), (1, 2)];
    for_each_permutation(&entries, |perm| {
        let mut q = PriorityQueue::new();
        for (i, (p, t)) in perm.iter().enumerate() {
            q.insert(QueueEntry::new(i.to_string(), *p, *t, ()));
        }
        check_heap(&q);
        let mut popped = Vec::new();
        while let Ok(p) = q.extract_min() {
            popped.push((p.entry.priority, p.entry.arrival));
        }
        let mut expected = perm.clone();
        expected.sort();
        assert_eq!(popped, expected);
    });
}
