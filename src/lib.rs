//! # clinic-core
//!
//! Instrumented data structures for a clinic's records:
//!
//! - [`KeyedTable`]: separate-chaining hash table keyed by digit strings
//!   (national IDs), with prime capacity and growth past 0.75 load.
//! - [`OrderedIndex`]: AVL tree for chronological lookups, reporting rotations
//!   and comparisons per operation.
//! - [`PriorityQueue`]: binary min-heap ordered by priority class, then arrival.
//! - [`huffman`]: byte-level Huffman compression with a portable tree descriptor.
//!
//! Every mutating call returns a small report of the work it did so callers can
//! surface it (comparisons, collisions, rotations, swaps).
//!
//! ## Example
//!
//! ```rust
//! use clinic_core::{KeyedTable, OrderedIndex, PriorityQueue, QueueEntry, Timestamp};
//!
//! let mut patients: KeyedTable<&str> = KeyedTable::new();
//! patients.insert("529.982.247-25", "Ana");
//! assert_eq!(patients.get("52998224725"), Some(&"Ana"));
//!
//! let mut agenda: OrderedIndex<Timestamp, &str> = OrderedIndex::new();
//! agenda.insert(Timestamp::parse("2024-03-01 10:00").unwrap(), "check-up");
//! agenda.insert(Timestamp::parse("2024-03-01T09:00:00Z").unwrap(), "exam");
//! let first = agenda.first().map(|(_, v)| *v);
//! assert_eq!(first, Some("exam"));
//!
//! let mut triage = PriorityQueue::new();
//! triage.insert(QueueEntry::new("a", 3, 1, ()));
//! triage.insert(QueueEntry::new("b", 1, 2, ()));
//! assert_eq!(triage.extract_min().unwrap().entry.id, "b");
//!
//! let packed = clinic_core::huffman::compress(b"AAAAB").unwrap();
//! assert_eq!(packed.bits.len(), 5);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod avl;
pub mod error;
pub mod heap;
pub mod huffman;
pub mod record;
pub mod table;
pub mod timestamp;

pub use avl::{IndexStats, OrderedIndex};
pub use error::{Error, Result};
pub use heap::{PriorityQueue, QueueEntry, QueueStats};
pub use huffman::{BitString, Compressed, CompressionStats, TreeDescriptor};
pub use record::{Record, Value};
pub use table::{InsertKind, InsertOutcome, KeyedTable, TableStats};
pub use timestamp::Timestamp;

#[cfg(test)]
mod proptests;
