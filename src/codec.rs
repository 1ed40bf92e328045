//! Bit-slice codec: random bytes to alphabet indices and back.
//!
//! The byte stream is read as one long bit string, most significant bit first.
//! Each symbol takes `bits_per_symbol` bits. When a slice lands outside the
//! alphabet only its provably wasted leading bits are dropped (the alphabet's
//! rejection table says how many); the rest become the high bits of the next
//! slice. Every rejection consumes at least one bit, so slicing always makes
//! progress without resampling.
//!
//! Decoding is only defined for power-of-two alphabets: with bit-saving, a
//! symbol sequence over any other alphabet no longer determines the bytes it
//! came from.

use crate::alphabet::Alphabet;
use crate::error::{PuidError, Result};

/// Residual bits carried between slices.
///
/// Holds fewer than 16 valid bits at any time: at most `bits_per_symbol - 1`
/// leftover bits plus one freshly appended byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitCursor {
    buffer: u32,
    held: u32,
}

impl BitCursor {
    /// Number of valid bits held.
    #[must_use]
    pub const fn held(&self) -> u32 {
        self.held
    }

    /// Append a byte below the held bits.
    pub fn push_byte(&mut self, byte: u8) {
        self.push_bits(u32::from(byte), 8);
    }

    /// Append the low `width` bits of `value` below the held bits.
    pub fn push_bits(&mut self, value: u32, width: u32) {
        self.buffer = (self.buffer << width) | (value & mask(width));
        self.held += width;
    }

    /// The top `width` held bits, if that many are held.
    #[must_use]
    pub const fn peek(&self, width: u32) -> Option<u32> {
        if self.held < width {
            return None;
        }
        Some((self.buffer >> (self.held - width)) & mask(width))
    }

    /// Drop the top `width` held bits.
    pub fn consume(&mut self, width: u32) {
        self.held = self.held.saturating_sub(width);
        self.buffer &= mask(self.held);
    }

    /// Remove and return the top eight bits once a whole byte is held.
    pub fn pop_byte(&mut self) -> Option<u8> {
        let byte = u8::try_from(self.peek(8)?).ok()?;
        self.consume(8);
        Some(byte)
    }
}

const fn mask(width: u32) -> u32 {
    if width >= u32::BITS {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

/// Bit accounting for one slicing run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SliceStats {
    /// Bytes pulled from the input.
    pub bytes: u64,
    /// Symbols emitted.
    pub symbols: u64,
    /// Bits spent on emitted symbols or discarded by rejections.
    pub consumed_bits: u64,
    /// Bits thrown away by rejections.
    pub discarded_bits: u64,
}

/// Streaming encoder state for one call.
///
/// Bytes are pulled lazily from any iterator, so a caller can top the input up
/// and continue: a `None` from [`Slicer::next_index`] leaves the partial slice
/// in place.
#[derive(Debug, Clone)]
pub struct Slicer<'a> {
    alphabet: &'a Alphabet,
    cursor: BitCursor,
    stats: SliceStats,
}

impl<'a> Slicer<'a> {
    /// Start with an empty cursor.
    #[must_use]
    pub fn new(alphabet: &'a Alphabet) -> Self {
        Self {
            alphabet,
            cursor: BitCursor::default(),
            stats: SliceStats::default(),
        }
    }

    /// Produce the next symbol index, pulling bytes from `bytes` as needed.
    ///
    /// Returns `None` once `bytes` runs dry before a full in-range slice is available.
    pub fn next_index<I: Iterator<Item = u8>>(&mut self, bytes: &mut I) -> Option<u8> {
        let width = self.alphabet.bits_per_symbol();
        loop {
            while self.cursor.held() < width {
                self.cursor.push_byte(bytes.next()?);
                self.stats.bytes += 1;
            }
            let value = self.cursor.peek(width)?;
            if self.alphabet.accepts(value) {
                self.cursor.consume(width);
                self.stats.consumed_bits += u64::from(width);
                self.stats.symbols += 1;
                return u8::try_from(value).ok();
            }
            let discard = self.alphabet.discard_width(value);
            self.cursor.consume(discard);
            self.stats.consumed_bits += u64::from(discard);
            self.stats.discarded_bits += u64::from(discard);
        }
    }

    /// Like [`Slicer::next_index`], mapped through the alphabet.
    pub fn next_symbol<I: Iterator<Item = u8>>(&mut self, bytes: &mut I) -> Option<char> {
        let index = self.next_index(bytes)?;
        self.alphabet.symbol(index)
    }

    /// Bits pulled in but not yet used.
    #[must_use]
    pub const fn residual_bits(&self) -> u32 {
        self.cursor.held()
    }

    /// Accounting so far.
    #[must_use]
    pub const fn stats(&self) -> SliceStats {
        self.stats
    }
}

/// Slice all of `bytes` into symbols; trailing bits too short for a symbol are dropped.
#[must_use]
pub fn encode(alphabet: &Alphabet, bytes: &[u8]) -> String {
    let mut slicer = Slicer::new(alphabet);
    let mut input = bytes.iter().copied();
    std::iter::from_fn(|| slicer.next_symbol(&mut input)).collect()
}

/// Rebuild the bytes behind an identifier over a power-of-two alphabet.
///
/// A trailing partial byte (`len * bits_per_symbol % 8` bits) is dropped.
///
/// # Errors
/// [`PuidError::NonPowerOfTwoAlphabet`] for other alphabets,
/// [`PuidError::UnknownSymbol`] for symbols outside the alphabet.
pub fn decode(alphabet: &Alphabet, id: &str) -> Result<Vec<u8>> {
    if !alphabet.is_power_of_two() {
        return Err(PuidError::NonPowerOfTwoAlphabet {
            count: alphabet.len(),
        });
    }
    let width = alphabet.bits_per_symbol();
    let mut cursor = BitCursor::default();
    let mut out = Vec::with_capacity(id.len());
    for symbol in id.chars() {
        let index = alphabet
            .index_of(symbol)
            .ok_or(PuidError::UnknownSymbol { symbol })?;
        cursor.push_bits(u32::from(index), width);
        while let Some(byte) = cursor.pop_byte() {
            out.push(byte);
        }
    }
    Ok(out)
}
