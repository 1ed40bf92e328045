//! Error taxonomy shared by the entropy math, alphabet, codec, and generator.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, PuidError>;

/// Every failure the core can report.
///
/// Configuration-time errors (alphabet and entropy problems) surface once from
/// [`crate::Generator::builder`]; generation-time errors come from the entropy
/// source or from decoding caller-supplied identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuidError {
    /// A numeric input to the entropy math was non-finite or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The alphabet has no symbols.
    #[error("alphabet is empty")]
    EmptyAlphabet,

    /// The alphabet repeats a symbol.
    #[error("alphabet repeats symbol {symbol:?}")]
    DuplicateCharacter {
        /// First symbol seen twice.
        symbol: char,
    },

    /// The alphabet has more than 256 symbols.
    #[error("alphabet has {count} symbols; at most 256 are supported")]
    TooManySymbols {
        /// Number of symbols supplied.
        count: usize,
    },

    /// The alphabet has a single symbol and therefore carries no entropy.
    #[error("alphabet has {count} symbol; at least 2 are required")]
    TooFewSymbols {
        /// Number of symbols supplied.
        count: usize,
    },

    /// The alphabet contains a control, whitespace, or quoting character.
    #[error("alphabet symbol {symbol:?} is not allowed in identifiers")]
    InvalidCharacter {
        /// Offending symbol.
        symbol: char,
    },

    /// An identifier being decoded contains a symbol outside the alphabet.
    #[error("symbol {symbol:?} is not part of the alphabet")]
    UnknownSymbol {
        /// Offending symbol.
        symbol: char,
    },

    /// Decoding (or raw encoding) was requested for an alphabet whose size is not a power of two.
    #[error("alphabet of {count} symbols is not a power of two; bit slices cannot be reversed")]
    NonPowerOfTwoAlphabet {
        /// Alphabet size.
        count: usize,
    },

    /// The entropy source returned fewer bytes than requested.
    #[error("entropy source returned {received} of {requested} requested bytes")]
    InsufficientEntropy {
        /// Bytes asked for.
        requested: usize,
        /// Bytes delivered.
        received: usize,
    },

    /// The entropy source itself failed.
    #[error("entropy source failure: {0}")]
    EntropySource(String),
}

impl PuidError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
