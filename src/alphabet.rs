//! Validated symbol sets and the slice geometry derived from them.
//!
//! An [`Alphabet`] is built once and then shared read-only by the codec and the
//! generator. Besides the symbols it carries everything the codec needs to
//! slice bits without floating point:
//! - `bits_per_symbol`, the slice width `ceil(log2(n))`
//! - a rejection table giving, for each out-of-range slice value, how many
//!   leading bits are provably wasted (see [`Alphabet::discard_width`])

use crate::chars::{CharSet, Preset};
use crate::entropy;
use crate::error::{PuidError, Result};
use std::collections::{HashMap, HashSet};

/// Largest supported alphabet; every index fits in a byte.
pub const MAX_SYMBOLS: usize = 256;

/// An immutable, validated symbol set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    characters: String,
    symbols: Vec<char>,
    index: HashMap<char, u8>,
    preset: Option<Preset>,
    bits_per_symbol: u32,
    // Discard widths for slice values `len..2^bits_per_symbol`, offset by `len`.
    rejections: Vec<u32>,
}

impl Alphabet {
    /// Validate a caller-supplied symbol sequence.
    ///
    /// Checks run in this order: empty, duplicate symbol, more than 256
    /// symbols, a single symbol, disallowed characters (control, whitespace,
    /// `"`, `'`, `\`, `` ` ``, and U+007F..=U+00A0).
    ///
    /// # Errors
    /// Returns the [`PuidError`] variant for the first failed check.
    pub fn new(symbols: &str) -> Result<Self> {
        let chars: Vec<char> = symbols.chars().collect();
        if chars.is_empty() {
            return Err(PuidError::EmptyAlphabet);
        }

        let mut seen = HashSet::with_capacity(chars.len());
        for &symbol in &chars {
            if !seen.insert(symbol) {
                return Err(PuidError::DuplicateCharacter { symbol });
            }
        }

        match chars.len() {
            count if count > MAX_SYMBOLS => return Err(PuidError::TooManySymbols { count }),
            count if count < 2 => return Err(PuidError::TooFewSymbols { count }),
            _ => {}
        }

        if let Some(&symbol) = chars.iter().find(|c| !is_valid_symbol(**c)) {
            return Err(PuidError::InvalidCharacter { symbol });
        }

        Ok(Self::assemble(chars, None))
    }

    /// The alphabet for a preset. Preset tables are valid by construction.
    #[must_use]
    pub fn from_preset(preset: Preset) -> Self {
        Self::assemble(preset.symbols().chars().collect(), Some(preset))
    }

    /// Resolve a `chars` option.
    ///
    /// # Errors
    /// Custom symbol sets are validated as in [`Alphabet::new`].
    pub fn from_char_set(chars: &CharSet) -> Result<Self> {
        match chars {
            CharSet::Preset(preset) => Ok(Self::from_preset(*preset)),
            CharSet::Custom(symbols) => Self::new(symbols),
        }
    }

    fn assemble(symbols: Vec<char>, preset: Option<Preset>) -> Self {
        let count = symbols.len();
        let bits_per_symbol = usize::BITS - count.saturating_sub(1).leading_zeros();
        let count_u32 = u32::try_from(count).map_or(u32::MAX, |c| c);
        let rejections = (count_u32..(1u32 << bits_per_symbol))
            .map(|value| rejection_width(value, count_u32, bits_per_symbol))
            .collect();
        let index = symbols.iter().copied().zip(0..=u8::MAX).collect();

        Self {
            characters: symbols.iter().collect(),
            symbols,
            index,
            preset,
            bits_per_symbol,
            rejections,
        }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the symbol table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Bits consumed by one slice: `ceil(log2(len))`.
    #[must_use]
    pub const fn bits_per_symbol(&self) -> u32 {
        self.bits_per_symbol
    }

    /// Exact entropy carried by one symbol: `log2(len)`.
    #[must_use]
    pub fn entropy_per_symbol(&self) -> f64 {
        entropy::entropy_bits_per_symbol(self.len())
    }

    /// Entropy representation efficiency: `log2(len) / bits_per_symbol`.
    #[must_use]
    pub fn ere(&self) -> f64 {
        self.entropy_per_symbol() / f64::from(self.bits_per_symbol)
    }

    /// Entropy transform efficiency: `log2(len)` over the expected number of
    /// source bits the codec consumes per emitted symbol, bit-saving included.
    ///
    /// Equals 1.0 exactly for power-of-two alphabets.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ete(&self) -> f64 {
        let accepted = self.len() as f64 * f64::from(self.bits_per_symbol);
        let rejected: f64 = self.rejections.iter().copied().map(f64::from).sum();
        let expected_bits = (accepted + rejected) / self.len() as f64;
        self.entropy_per_symbol() / expected_bits
    }

    /// Whether `len` is an exact power of two, i.e. every slice value is in range.
    #[must_use]
    pub fn is_power_of_two(&self) -> bool {
        self.len().is_power_of_two()
    }

    /// The preset this alphabet came from, if any.
    #[must_use]
    pub const fn preset(&self) -> Option<Preset> {
        self.preset
    }

    /// Preset name, or `custom`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.preset.map_or("custom", Preset::name)
    }

    /// The symbols as a string, in index order.
    #[must_use]
    pub fn characters(&self) -> &str {
        &self.characters
    }

    /// Symbol at `index`.
    #[must_use]
    pub fn symbol(&self, index: u8) -> Option<char> {
        self.symbols.get(usize::from(index)).copied()
    }

    /// Index of `symbol`.
    #[must_use]
    pub fn index_of(&self, symbol: char) -> Option<u8> {
        self.index.get(&symbol).copied()
    }

    /// Whether a slice value maps to a symbol.
    #[must_use]
    pub fn accepts(&self, value: u32) -> bool {
        usize::try_from(value).is_ok_and(|v| v < self.len())
    }

    /// How many leading bits of an out-of-range slice `value` to throw away.
    ///
    /// This is the shortest prefix of `value` whose every completion is still
    /// `>= len`; the remaining low bits are unbiased and get reused. For ten
    /// symbols (4-bit slices), `101x` discards 3 bits and `11xx` discards 2.
    /// In-range values report the full slice width.
    #[must_use]
    pub fn discard_width(&self, value: u32) -> u32 {
        let Some(offset) = usize::try_from(value)
            .ok()
            .and_then(|v| v.checked_sub(self.len()))
        else {
            return self.bits_per_symbol;
        };
        self.rejections
            .get(offset)
            .copied()
            .map_or(self.bits_per_symbol, |width| width)
    }
}

fn rejection_width(value: u32, count: u32, width: u32) -> u32 {
    (1..width)
        .find(|&prefix| {
            let low = width - prefix;
            (value >> low) << low >= count
        })
        .map_or(width, |prefix| prefix)
}

fn is_valid_symbol(symbol: char) -> bool {
    !(symbol.is_control()
        || symbol.is_whitespace()
        || matches!(symbol, '"' | '\'' | '\\' | '`')
        || ('\u{7f}'..='\u{a0}').contains(&symbol))
}
