//! Huffman compression over bytes.
//!
//! [`compress`] runs the whole pipeline (frequencies, tree, codes, bits) and
//! returns everything a caller needs to persist. The encoded bits are useless
//! without the [`TreeDescriptor`] that produced them; [`decompress`] takes both.

mod bits;
mod tree;

pub use bits::BitString;
pub use tree::{encode, frequencies, CodeTable, Decoded, FrequencyTable, HuffmanTree, TreeDescriptor};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub distinct_symbols: usize,
    /// Eight bits per input byte.
    pub original_bits: u64,
    pub encoded_bits: u64,
    /// `encoded_bits / original_bits`.
    pub ratio: f64,
    pub percent_saved: f64,
    pub bits_saved: i64,
    /// Frequency-weighted mean code length.
    pub average_code_length: f64,
    /// Shannon entropy in bits per symbol.
    pub entropy: f64,
    /// `entropy / average_code_length * 100`.
    pub efficiency: f64,
    pub tree_height: u32,
    pub internal_nodes: usize,
    pub leaves: usize,
}

impl CompressionStats {
    pub fn compute(freqs: &FrequencyTable, codes: &CodeTable, tree: &HuffmanTree) -> Self {
        let total: u64 = freqs.values().sum();
        let original_bits = total * 8;
        let encoded_bits: u64 = freqs
            .iter()
            .map(|(sym, &n)| n * codes.get(sym).map_or(0, |c| c.len() as u64))
            .sum();

        let (mut average_code_length, mut entropy) = (0.0, 0.0);
        if total > 0 {
            for (sym, &n) in freqs.iter().filter(|(_, n)| **n > 0) {
                let p = n as f64 / total as f64;
                average_code_length += p * codes.get(sym).map_or(0, BitString::len) as f64;
                entropy -= p * p.log2();
            }
        }
        let ratio = if original_bits == 0 {
            0.0
        } else {
            encoded_bits as f64 / original_bits as f64
        };
        let efficiency = if average_code_length > 0.0 {
            entropy / average_code_length * 100.0
        } else {
            0.0
        };

        Self {
            distinct_symbols: freqs.values().filter(|n| **n > 0).count(),
            original_bits,
            encoded_bits,
            ratio,
            percent_saved: (1.0 - ratio) * 100.0,
            bits_saved: original_bits as i64 - encoded_bits as i64,
            average_code_length,
            entropy,
            efficiency,
            tree_height: tree.height(),
            internal_nodes: tree.internal_nodes(),
            leaves: tree.leaves(),
        }
    }
}

/// Everything produced by one compression run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compressed {
    pub bits: BitString,
    pub tree: TreeDescriptor,
    pub codes: CodeTable,
    pub frequencies: FrequencyTable,
    pub stats: CompressionStats,
}

impl Compressed {
    /// [`HuffmanTree::outline`] of the tree this run produced.
    pub fn tree_outline(&self) -> Result<Vec<String>> {
        Ok(HuffmanTree::from_descriptor(&self.tree)?.outline())
    }
}

/// Compress `data`. Fails with [`crate::Error::EmptyInput`] on empty input.
pub fn compress(data: &[u8]) -> Result<Compressed> {
    let freqs = frequencies(data);
    let tree = HuffmanTree::build(&freqs)?;
    let codes = tree.codes();
    let bits = encode(data, &codes)?;
    let stats = CompressionStats::compute(&freqs, &codes, &tree);
    debug!(
        input_bytes = data.len(),
        encoded_bits = bits.len(),
        distinct = stats.distinct_symbols,
        "compressed"
    );
    Ok(Compressed {
        bits,
        tree: tree.descriptor(),
        codes,
        frequencies: freqs,
        stats,
    })
}

/// Decode `bits` with the tree described by `tree`. A stream that stops inside
/// a code is an error, not a shorter result.
pub fn decompress(bits: &BitString, tree: &TreeDescriptor) -> Result<Vec<u8>> {
    let tree = HuffmanTree::from_descriptor(tree)?;
    tree.decode(bits)?.into_complete()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_round_trip() {
        let note = "Paciente relata dor de cabeça há 3 dias. Sem febre. PA 12x8.";
        let packed = compress(note.as_bytes()).unwrap();
        assert!(packed.stats.encoded_bits < packed.stats.original_bits);
        let restored = decompress(&packed.bits, &packed.tree).unwrap();
        assert_eq!(String::from_utf8(restored).unwrap(), note);
    }

    #[test]
    fn test_round_trip_through_json() {
        let data = b"abracadabra";
        let packed = compress(data).unwrap();
        let json = serde_json::to_string(&packed).unwrap();
        let back: Compressed = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bits, packed.bits);
        assert_eq!(back.codes, packed.codes);
        assert_eq!(back.frequencies, packed.frequencies);
        assert_eq!(decompress(&back.bits, &back.tree).unwrap(), data);
    }

    #[test]
    fn test_stats_two_symbols() {
        let packed = compress(b"AAAAB").unwrap();
        let s = &packed.stats;
        assert_eq!(s.distinct_symbols, 2);
        assert_eq!(s.original_bits, 40);
        assert_eq!(s.encoded_bits, 5);
        assert_eq!(s.bits_saved, 35);
        assert!((s.ratio - 0.125).abs() < 1e-12);
        assert!((s.percent_saved - 87.5).abs() < 1e-9);
        assert!((s.average_code_length - 1.0).abs() < 1e-12);
        let entropy = -(0.8f64 * 0.8f64.log2() + 0.2f64 * 0.2f64.log2());
        assert!((s.entropy - entropy).abs() < 1e-12);
        assert!((s.efficiency - entropy * 100.0).abs() < 1e-9);
        assert_eq!((s.tree_height, s.internal_nodes, s.leaves), (1, 1, 2));
        assert_eq!(packed.tree_outline().unwrap(), HuffmanTree::build(&packed.frequencies).unwrap().outline());
    }

    #[test]
    fn test_single_symbol_is_n_bits() {
        let packed = compress(&[7u8; 12]).unwrap();
        assert_eq!(packed.bits.len(), 12);
        assert_eq!(packed.stats.entropy, 0.0);
        assert_eq!(decompress(&packed.bits, &packed.tree).unwrap(), [7u8; 12]);
    }

    #[test]
    fn test_rejects_empty_and_truncated() {
        assert_eq!(compress(b""), Err(Error::EmptyInput));

        let packed = compress(b"ABCD").unwrap();
        let mut cut = packed.bits.clone();
        cut.pop();
        assert_eq!(decompress(&cut, &packed.tree), Err(Error::TruncatedCode(1)));
    }
}
