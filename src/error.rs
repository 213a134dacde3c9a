//! Error types shared by every structure in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Queue is empty")]
    EmptyQueue,

    /// A symbol was handed to the encoder that has no code in the table.
    #[error("Symbol {0:#04x} has no assigned code")]
    UnknownSymbol(u8),

    #[error("Malformed code tree: {0}")]
    MalformedTree(String),

    /// The key text could not be turned into an orderable instant.
    #[error("Cannot order key {0:?}: not a recognised timestamp")]
    InvalidKeyOrdering(String),

    #[error("Invalid bit {0:?} in encoded stream")]
    InvalidBit(char),

    #[error("Bit {0} leads outside the code tree")]
    InvalidBitPath(usize),

    /// Decoding stopped part-way through a code.
    #[error("Encoded stream ends {0} bits into an incomplete code")]
    TruncatedCode(usize),

    #[error("Cannot build a prefix code from empty input")]
    EmptyInput,
}

impl Error {
    /// Stable identifier for callers that report errors over a wire.
    pub fn code(&self) -> &'static str {
        match self {
            // An empty queue is a lookup that found nothing.
            Error::NotFound(_) | Error::EmptyQueue => "NOT_FOUND",
            Error::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
            Error::MalformedTree(_) => "MALFORMED_TREE",
            Error::InvalidKeyOrdering(_) => "INVALID_KEY_ORDERING",
            Error::InvalidBit(_) | Error::InvalidBitPath(_) | Error::TruncatedCode(_) => {
                "MALFORMED_BITS"
            }
            Error::EmptyInput => "EMPTY_INPUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::EmptyQueue.code(), Error::NotFound("x".into()).code());
        assert_eq!(Error::TruncatedCode(3).code(), "MALFORMED_BITS");
        assert_eq!(Error::UnknownSymbol(b'A').to_string(), "Symbol 0x41 has no assigned code");
    }
}
