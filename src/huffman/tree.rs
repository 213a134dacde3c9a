use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use super::bits::BitString;
use crate::error::{Error, Result};

/// Symbol → occurrence count. Iteration order (ascending symbol) seeds the
/// build queue, which keeps tree construction deterministic.
pub type FrequencyTable = BTreeMap<u8, u64>;

/// Symbol → prefix-free code.
pub type CodeTable = BTreeMap<u8, BitString>;

pub fn frequencies(data: &[u8]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for &b in data {
        *table.entry(b).or_insert(0) += 1;
    }
    table
}

/// Portable form of a code tree, stored next to the encoded bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeDescriptor {
    Leaf {
        symbol: u8,
        frequency: u64,
    },
    Internal {
        frequency: u64,
        left: Box<TreeDescriptor>,
        right: Box<TreeDescriptor>,
    },
}

impl TreeDescriptor {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedTree(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedTree(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HuffmanTree {
    Leaf {
        symbol: u8,
        freq: u64,
    },
    Internal {
        freq: u64,
        left: Box<HuffmanTree>,
        right: Box<HuffmanTree>,
    },
}

/// Output of [`HuffmanTree::decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub symbols: Vec<u8>,
    /// Bits consumed after the last complete code. Non-zero means the stream
    /// was cut inside a code.
    pub dangling_bits: usize,
}

impl Decoded {
    pub fn into_complete(self) -> Result<Vec<u8>> {
        match self.dangling_bits {
            0 => Ok(self.symbols),
            n => Err(Error::TruncatedCode(n)),
        }
    }
}

impl HuffmanTree {
    /// Build a code tree by repeatedly merging the two lightest nodes.
    ///
    /// Equal frequencies are broken by creation order: leaves in ascending
    /// symbol order first, then merged nodes as they are made. The first node
    /// popped becomes the left (`0`) child. Zero counts are ignored.
    pub fn build(freqs: &FrequencyTable) -> Result<Self> {
        let mut pending: Vec<Option<HuffmanTree>> = Vec::with_capacity(freqs.len() * 2);
        let mut queue = BinaryHeap::with_capacity(freqs.len());
        for (&symbol, &freq) in freqs.iter().filter(|(_, f)| **f > 0) {
            queue.push(Reverse((freq, pending.len())));
            pending.push(Some(HuffmanTree::Leaf { symbol, freq }));
        }

        loop {
            let Some(first) = pop_lightest(&mut queue, &mut pending) else {
                return Err(Error::EmptyInput);
            };
            let Some(second) = pop_lightest(&mut queue, &mut pending) else {
                return Ok(first);
            };
            let freq = first.freq() + second.freq();
            queue.push(Reverse((freq, pending.len())));
            pending.push(Some(HuffmanTree::Internal {
                freq,
                left: Box::new(first),
                right: Box::new(second),
            }));
        }
    }

    #[inline]
    pub fn freq(&self) -> u64 {
        match self {
            HuffmanTree::Leaf { freq, .. } | HuffmanTree::Internal { freq, .. } => *freq,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HuffmanTree::Leaf { .. })
    }

    /// Longest root-to-leaf path, in edges.
    pub fn height(&self) -> u32 {
        match self {
            HuffmanTree::Leaf { .. } => 0,
            HuffmanTree::Internal { left, right, .. } => 1 + left.height().max(right.height()),
        }
    }

    pub fn leaves(&self) -> usize {
        match self {
            HuffmanTree::Leaf { .. } => 1,
            HuffmanTree::Internal { left, right, .. } => left.leaves() + right.leaves(),
        }
    }

    pub fn internal_nodes(&self) -> usize {
        match self {
            HuffmanTree::Leaf { .. } => 0,
            HuffmanTree::Internal { left, right, .. } => {
                1 + left.internal_nodes() + right.internal_nodes()
            }
        }
    }

    /// Codes by path: left appends `0`, right appends `1`. A lone leaf gets `0`.
    pub fn codes(&self) -> CodeTable {
        let mut table = CodeTable::new();
        match self {
            HuffmanTree::Leaf { symbol, .. } => {
                table.insert(*symbol, BitString::from_iter([false]));
            }
            HuffmanTree::Internal { .. } => {
                let mut path = BitString::new();
                self.collect_codes(&mut path, &mut table);
            }
        }
        table
    }

    fn collect_codes(&self, path: &mut BitString, table: &mut CodeTable) {
        match self {
            HuffmanTree::Leaf { symbol, .. } => {
                table.insert(*symbol, path.clone());
            }
            HuffmanTree::Internal { left, right, .. } => {
                path.push(false);
                left.collect_codes(path, table);
                path.pop();
                path.push(true);
                right.collect_codes(path, table);
                path.pop();
            }
        }
    }

    /// Text rendering of the tree, right child first. Leaves show their
    /// symbol, count and code; internal nodes show their combined count.
    pub fn outline(&self) -> Vec<String> {
        let codes = self.codes();
        let mut out = Vec::with_capacity(self.leaves() + self.internal_nodes());
        self.outline_rec(&codes, "", true, &mut out);
        out
    }

    fn outline_rec(&self, codes: &CodeTable, prefix: &str, last: bool, out: &mut Vec<String>) {
        let branch = if last { "└── " } else { "├── " };
        match self {
            HuffmanTree::Leaf { symbol, freq } => {
                let code = codes.get(symbol).map(BitString::to_string).unwrap_or_default();
                out.push(format!(
                    "{prefix}{branch}{} (freq: {freq}, code: {code})",
                    symbol_label(*symbol)
                ));
            }
            HuffmanTree::Internal { freq, left, right } => {
                out.push(format!("{prefix}{branch}Internal (freq: {freq})"));
                let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
                right.outline_rec(codes, &child_prefix, false, out);
                left.outline_rec(codes, &child_prefix, true, out);
            }
        }
    }

    /// Walk the tree bit by bit, restarting at the root after each leaf.
    pub fn decode(&self, bits: &BitString) -> Result<Decoded> {
        let mut symbols = Vec::new();
        if let HuffmanTree::Leaf { symbol, .. } = self {
            for (pos, bit) in bits.iter().enumerate() {
                if bit {
                    return Err(Error::InvalidBitPath(pos));
                }
                symbols.push(*symbol);
            }
            return Ok(Decoded {
                symbols,
                dangling_bits: 0,
            });
        }

        let mut node = self;
        let mut dangling_bits = 0;
        for bit in bits.iter() {
            node = match node {
                HuffmanTree::Internal { left, right, .. } => {
                    if bit {
                        &**right
                    } else {
                        &**left
                    }
                }
                HuffmanTree::Leaf { .. } => unreachable!("walk restarts at every leaf"),
            };
            dangling_bits += 1;
            if let HuffmanTree::Leaf { symbol, .. } = node {
                symbols.push(*symbol);
                node = self;
                dangling_bits = 0;
            }
        }
        Ok(Decoded {
            symbols,
            dangling_bits,
        })
    }

    pub fn descriptor(&self) -> TreeDescriptor {
        match self {
            HuffmanTree::Leaf { symbol, freq } => TreeDescriptor::Leaf {
                symbol: *symbol,
                frequency: *freq,
            },
            HuffmanTree::Internal { freq, left, right } => TreeDescriptor::Internal {
                frequency: *freq,
                left: Box::new(left.descriptor()),
                right: Box::new(right.descriptor()),
            },
        }
    }

    /// Rebuild a tree from its descriptor. A symbol appearing in two leaves
    /// would make decoding ambiguous, so it is rejected.
    pub fn from_descriptor(desc: &TreeDescriptor) -> Result<Self> {
        let mut seen = BTreeSet::new();
        Self::from_descriptor_rec(desc, &mut seen)
    }

    fn from_descriptor_rec(desc: &TreeDescriptor, seen: &mut BTreeSet<u8>) -> Result<Self> {
        match desc {
            TreeDescriptor::Leaf { symbol, frequency } => {
                if !seen.insert(*symbol) {
                    return Err(Error::MalformedTree(format!(
                        "symbol {symbol:#04x} appears in more than one leaf"
                    )));
                }
                Ok(HuffmanTree::Leaf {
                    symbol: *symbol,
                    freq: *frequency,
                })
            }
            TreeDescriptor::Internal {
                frequency,
                left,
                right,
            } => Ok(HuffmanTree::Internal {
                freq: *frequency,
                left: Box::new(Self::from_descriptor_rec(left, seen)?),
                right: Box::new(Self::from_descriptor_rec(right, seen)?),
            }),
        }
    }
}

// Queue entries are `(frequency, slot)`: the slot doubles as creation order.
fn pop_lightest(
    queue: &mut BinaryHeap<Reverse<(u64, usize)>>,
    pending: &mut [Option<HuffmanTree>],
) -> Option<HuffmanTree> {
    let Reverse((_, slot)) = queue.pop()?;
    pending[slot].take()
}

/// Concatenate the code of each input byte.
pub fn encode(data: &[u8], codes: &CodeTable) -> Result<BitString> {
    let mut out = BitString::with_capacity(data.len() * 4);
    for &b in data {
        let code = codes.get(&b).ok_or(Error::UnknownSymbol(b))?;
        out.extend_from(code);
    }
    Ok(out)
}

/// `'A'`, `'\n'`, or `0xC3` for bytes outside ASCII.
fn symbol_label(symbol: u8) -> String {
    if symbol.is_ascii() {
        format!("'{}'", symbol.escape_ascii())
    } else {
        format!("{symbol:#04X}")
    }
}
