//! Configured identifier generator.
//!
//! A [`Generator`] is built once (alphabet, entropy, source) and then used from
//! any number of threads. All validation happens in [`GeneratorBuilder::build`];
//! [`Generator::generate`] can only fail when the entropy source does.

use crate::alphabet::Alphabet;
use crate::chars::CharSet;
use crate::codec::{self, Slicer};
use crate::config::{EntropySpec, PuidConfig};
use crate::entropy;
use crate::error::{PuidError, Result};
use crate::source::{EntropySource, OsEntropy};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Longest identifier a generator will be configured for, in symbols.
pub const MAX_LENGTH: usize = 1 << 20;

/// Top-ups allowed per identifier after the first fetch.
///
/// Each fetch covers every remaining symbol, so an unbiased source almost never
/// needs more than one; running out means the source keeps producing
/// out-of-range slices.
const MAX_REFILLS: usize = 64;

/// Builder for [`Generator`]. Defaults: `safe64`, 128 bits, [`OsEntropy`].
#[derive(Default)]
pub struct GeneratorBuilder {
    chars: CharSet,
    entropy: EntropySpec,
    source: Option<Arc<dyn EntropySource>>,
}

impl GeneratorBuilder {
    /// Symbols to draw from.
    #[must_use]
    pub fn chars(mut self, chars: impl Into<CharSet>) -> Self {
        self.chars = chars.into();
        self
    }

    /// Entropy per identifier, in bits.
    #[must_use]
    pub fn bits(mut self, bits: f64) -> Self {
        self.entropy = EntropySpec::Bits(bits);
        self
    }

    /// Entropy sized for `total` identifiers at 1-in-`risk` collision odds.
    #[must_use]
    pub fn total_risk(mut self, total: f64, risk: f64) -> Self {
        self.entropy = EntropySpec::TotalRisk { total, risk };
        self
    }

    /// Entropy as a ready-made [`EntropySpec`].
    #[must_use]
    pub fn entropy(mut self, entropy: EntropySpec) -> Self {
        self.entropy = entropy;
        self
    }

    /// Alphabet and entropy from a config value.
    #[must_use]
    pub fn config(self, config: &PuidConfig) -> Self {
        let builder = self.chars(config.chars.clone());
        match config.entropy {
            Some(entropy) => builder.entropy(entropy),
            None => builder.entropy(EntropySpec::default()),
        }
    }

    /// Where random bytes come from.
    #[must_use]
    pub fn source(mut self, source: impl EntropySource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Same as [`GeneratorBuilder::source`] for a source that is already shared.
    #[must_use]
    pub fn shared_source(mut self, source: Arc<dyn EntropySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate everything and derive the identifier length.
    ///
    /// # Errors
    /// Alphabet validation errors, [`PuidError::InvalidArgument`] for bad
    /// entropy inputs or an identifier longer than [`MAX_LENGTH`].
    pub fn build(self) -> Result<Generator> {
        let alphabet = Alphabet::from_char_set(&self.chars)?;
        let bits = self.entropy.resolve()?;
        let length = id_length(bits, alphabet.bits_per_symbol())?;
        let source = match self.source {
            Some(source) => source,
            None => Arc::new(OsEntropy),
        };
        tracing::debug!(
            chars = alphabet.name(),
            symbols = alphabet.len(),
            bits,
            length,
            source = %source.describe(),
            "configured generator"
        );
        Ok(Generator {
            alphabet: Arc::new(alphabet),
            source,
            bits,
            length,
        })
    }
}

impl fmt::Debug for GeneratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorBuilder")
            .field("chars", &self.chars)
            .field("entropy", &self.entropy)
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .finish()
    }
}

/// Produces identifiers of a fixed length over a fixed alphabet.
///
/// Cloning is cheap and clones share the alphabet and the source.
#[derive(Clone)]
pub struct Generator {
    alphabet: Arc<Alphabet>,
    source: Arc<dyn EntropySource>,
    bits: f64,
    length: usize,
}

impl Generator {
    /// Start configuring a generator.
    #[must_use]
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    /// Build from a config value with the OS entropy source.
    ///
    /// # Errors
    /// See [`GeneratorBuilder::build`].
    pub fn from_config(config: &PuidConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// One new identifier of exactly [`Generator::length`] symbols.
    ///
    /// # Errors
    /// [`PuidError::InsufficientEntropy`] when the source answers short,
    /// [`PuidError::EntropySource`] when it fails outright.
    pub fn generate(&self) -> Result<String> {
        let mut slicer = Slicer::new(&self.alphabet);
        let mut id = String::with_capacity(self.length);
        let mut emitted = 0;
        let mut request = self.bytes_for(self.length);

        for refill in 0..=MAX_REFILLS {
            if refill > 0 {
                tracing::trace!(
                    refill,
                    remaining = self.length - emitted,
                    request,
                    "refilling entropy"
                );
            }
            let mut input = self.fetch(request)?.into_iter();
            while emitted < self.length {
                match slicer.next_symbol(&mut input) {
                    Some(symbol) => {
                        id.push(symbol);
                        emitted += 1;
                    }
                    None => break,
                }
            }
            if emitted == self.length {
                return Ok(id);
            }
            request = self.bytes_for(self.length - emitted);
        }

        let stats = slicer.stats();
        tracing::warn!(
            source = %self.source.describe(),
            bytes = stats.bytes,
            discarded_bits = stats.discarded_bits,
            "entropy source never yielded an in-range slice"
        );
        Err(PuidError::EntropySource(format!(
            "{} produced {} bytes without filling a {}-symbol identifier",
            self.source.describe(),
            stats.bytes,
            self.length
        )))
    }

    /// Identifiers that can be generated before collision odds exceed 1-in-`risk`.
    ///
    /// # Errors
    /// [`PuidError::InvalidArgument`] for a bad `risk`.
    pub fn total(&self, risk: f64) -> Result<u128> {
        entropy::total_for(self.entropy_bits(), risk)
    }

    /// Collision odds ("1-in-N") after `total` identifiers.
    ///
    /// # Errors
    /// [`PuidError::InvalidArgument`] for a bad `total`.
    pub fn risk(&self, total: f64) -> Result<u128> {
        entropy::risk_for(self.entropy_bits(), total)
    }

    /// Slice `bytes` into an identifier without touching the entropy source.
    ///
    /// # Errors
    /// [`PuidError::NonPowerOfTwoAlphabet`] unless the alphabet has 2^k symbols.
    pub fn encode(&self, bytes: &[u8]) -> Result<String> {
        self.require_power_of_two()?;
        Ok(codec::encode(&self.alphabet, bytes))
    }

    /// Recover the bytes behind an identifier; a trailing partial byte is dropped.
    ///
    /// # Errors
    /// [`PuidError::NonPowerOfTwoAlphabet`] or [`PuidError::UnknownSymbol`].
    pub fn decode(&self, id: &str) -> Result<Vec<u8>> {
        self.require_power_of_two()?;
        codec::decode(&self.alphabet, id)
    }

    /// Describe this configuration.
    #[must_use]
    pub fn info(&self) -> Info {
        Info {
            characters: self.alphabet.characters().to_string(),
            preset_name: self.alphabet.name().to_string(),
            bits_per_symbol: self.alphabet.bits_per_symbol(),
            entropy_bits_per_symbol: entropy::round_to(self.alphabet.entropy_per_symbol(), 2),
            total_entropy_bits: entropy::round_to(self.entropy_bits(), 2),
            requested_bits: self.bits,
            ere: entropy::round_to(self.alphabet.ere(), 2),
            ete: entropy::round_to(self.alphabet.ete(), 2),
            length: self.length,
            source_description: self.source.describe(),
        }
    }

    /// Symbols per identifier.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Entropy asked for at configuration time.
    #[must_use]
    pub const fn bits(&self) -> f64 {
        self.bits
    }

    /// Entropy each identifier actually carries: `length * log2(symbols)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn entropy_bits(&self) -> f64 {
        self.length as f64 * self.alphabet.entropy_per_symbol()
    }

    /// The alphabet in use.
    #[must_use]
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    fn bytes_for(&self, symbols: usize) -> usize {
        let width = self.alphabet.bits_per_symbol() as usize;
        (symbols * width).div_ceil(8)
    }

    fn fetch(&self, requested: usize) -> Result<Vec<u8>> {
        let bytes = self.source.bytes(requested)?;
        if bytes.len() < requested {
            tracing::warn!(
                source = %self.source.describe(),
                requested,
                received = bytes.len(),
                "entropy source under-delivered"
            );
            return Err(PuidError::InsufficientEntropy {
                requested,
                received: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn require_power_of_two(&self) -> Result<()> {
        if self.alphabet.is_power_of_two() {
            Ok(())
        } else {
            Err(PuidError::NonPowerOfTwoAlphabet {
                count: self.alphabet.len(),
            })
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("chars", &self.alphabet.name())
            .field("bits", &self.bits)
            .field("length", &self.length)
            .field("source", &self.source.describe())
            .finish()
    }
}

/// Snapshot of a generator's configuration, as reported by `puid info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    /// Alphabet symbols in index order.
    pub characters: String,
    /// Preset name, or `custom`.
    pub preset_name: String,
    /// Slice width: `ceil(log2(symbols))`.
    pub bits_per_symbol: u32,
    /// `log2(symbols)`.
    pub entropy_bits_per_symbol: f64,
    /// Entropy of one identifier: `length * log2(symbols)`.
    pub total_entropy_bits: f64,
    /// Entropy requested at configuration time.
    pub requested_bits: f64,
    /// Representation efficiency.
    pub ere: f64,
    /// Transform efficiency with bit-saving.
    pub ete: f64,
    /// Symbols per identifier.
    pub length: usize,
    /// Where random bytes come from.
    pub source_description: String,
}

// Smallest length with `length * width >= bits`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn id_length(bits: f64, width: u32) -> Result<usize> {
    let symbols = (bits / f64::from(width)).ceil();
    if symbols > MAX_LENGTH as f64 {
        return Err(PuidError::invalid(format!(
            "{bits} bits needs more than {MAX_LENGTH} symbols"
        )));
    }
    Ok(symbols as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::Preset;
    use crate::source::{FixedBytes, FnSource, SeededEntropy};
    use anyhow::ensure;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_safe64_at_128_bits() -> anyhow::Result<()> {
        let generator = Generator::builder().build()?;
        ensure!(generator.alphabet().preset() == Some(Preset::Safe64));
        ensure!(generator.length() == 22);
        ensure!(generator.info().source_description == "os");
        ensure!(generator.generate()?.chars().count() == 22);
        Ok(())
    }

    #[test]
    fn hex_reads_the_source_bits_verbatim() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Hex)
            .bits(16.0)
            .source(FixedBytes::new([0x9F_u8, 0x3A]))
            .build()?;
        ensure!(generator.length() == 4);
        ensure!(generator.generate()? == "9f3a");

        let upper = Generator::builder()
            .chars(Preset::HexUpper)
            .bits(16.0)
            .source(FixedBytes::new([0x9F_u8, 0x3A]))
            .build()?;
        ensure!(upper.generate()? == "9F3A");
        Ok(())
    }

    #[test]
    fn short_reads_are_insufficient_entropy() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Hex)
            .bits(32.0)
            .source(FixedBytes::new([0x01_u8, 0x02]))
            .build()?;
        ensure!(
            generator.generate()
                == Err(PuidError::InsufficientEntropy {
                    requested: 4,
                    received: 2,
                })
        );
        Ok(())
    }

    #[test]
    fn source_failures_pass_through() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .source(FnSource::new("broken", |_| {
                Err(PuidError::EntropySource("device gone".to_string()))
            }))
            .build()?;
        ensure!(generator.generate() == Err(PuidError::EntropySource("device gone".to_string())));
        Ok(())
    }

    #[test]
    fn discards_trigger_a_refill() -> anyhow::Result<()> {
        // 0xC3 = 1100_0011: `1100` is out of range, two bits are discarded and
        // `0011` leaves 3 bits short of a second digit.
        let generator = Generator::builder()
            .chars(Preset::Decimal)
            .bits(8.0)
            .source(FixedBytes::new([0xC3_u8, 0x5A]))
            .build()?;
        ensure!(generator.length() == 2);
        ensure!(generator.generate()? == "05");
        Ok(())
    }

    #[test]
    fn refill_that_runs_short_is_reported() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Decimal)
            .bits(8.0)
            .source(FixedBytes::new([0xFF_u8]))
            .build()?;
        ensure!(
            generator.generate()
                == Err(PuidError::InsufficientEntropy {
                    requested: 1,
                    received: 0,
                })
        );
        Ok(())
    }

    #[test]
    fn a_source_stuck_out_of_range_gives_up() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Decimal)
            .bits(8.0)
            .source(FixedBytes::cycle([0xFF_u8]))
            .build()?;
        ensure!(matches!(generator.generate(), Err(PuidError::EntropySource(_))));
        Ok(())
    }

    #[test]
    fn total_risk_sizes_the_identifier() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Alphanum)
            .total_risk(1.0e6, 1.0e12)
            .build()?;
        ensure!((generator.bits() - 78.73).abs() < 1e-9);
        // 62 symbols slice 6 bits wide: ceil(78.73 / 6) = 14
        ensure!(generator.length() == 14);
        ensure!(generator.risk(1.0e6)? > 0);
        Ok(())
    }

    #[test]
    fn total_and_risk_use_effective_entropy() -> anyhow::Result<()> {
        let generator = Generator::builder().chars(Preset::Hex).bits(64.0).build()?;
        ensure!(generator.total(2f64.powi(32))? == entropy::total_for(64.0, 2f64.powi(32))?);
        ensure!(generator.risk(1.0e6)? == entropy::risk_for(64.0, 1.0e6)?);

        let decimal = Generator::builder().chars(Preset::Decimal).bits(64.0).build()?;
        ensure!(decimal.length() == 16);
        ensure!(decimal.entropy_bits() < 64.0);
        ensure!(decimal.total(1.0e6)? < entropy::total_for(64.0, 1.0e6)?);
        Ok(())
    }

    #[test]
    fn encode_and_decode_need_a_power_of_two() -> anyhow::Result<()> {
        let safe32 = Generator::builder().chars(Preset::Safe32).build()?;
        let id = safe32.encode(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01])?;
        ensure!(id.chars().count() == 8);
        ensure!(safe32.decode(&id)? == vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01]);

        let alphanum = Generator::builder().chars(Preset::Alphanum).build()?;
        ensure!(alphanum.encode(&[1, 2, 3]) == Err(PuidError::NonPowerOfTwoAlphabet { count: 62 }));
        ensure!(alphanum.decode("abc") == Err(PuidError::NonPowerOfTwoAlphabet { count: 62 }));
        Ok(())
    }

    #[test]
    fn build_rejects_bad_inputs() {
        assert!(matches!(
            Generator::builder().bits(0.0).build(),
            Err(PuidError::InvalidArgument(_))
        ));
        assert!(matches!(
            Generator::builder().total_risk(1.0, 10.0).build(),
            Err(PuidError::InvalidArgument(_))
        ));
        assert!(matches!(
            Generator::builder().bits(1.0e12).build(),
            Err(PuidError::InvalidArgument(_))
        ));
        assert!(matches!(
            Generator::builder().chars(CharSet::Custom("aa".to_string())).build(),
            Err(PuidError::DuplicateCharacter { symbol: 'a' })
        ));
    }

    #[test]
    fn info_reports_the_configuration() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Decimal)
            .bits(32.0)
            .source(SeededEntropy::new(7))
            .build()?;
        let info = generator.info();
        ensure!(info.characters == "0123456789");
        ensure!(info.preset_name == "decimal");
        ensure!(info.bits_per_symbol == 4);
        ensure!(info.length == 8);
        ensure!((info.entropy_bits_per_symbol - 3.32).abs() < 1e-9);
        ensure!((info.total_entropy_bits - 26.58).abs() < 1e-9);
        ensure!((info.ere - 0.83).abs() < 1e-9);
        ensure!((info.ete - 0.62).abs() < 1e-9);
        ensure!(info.source_description == "seeded(7)");

        let value = serde_json::to_value(&info)?;
        ensure!(value["preset_name"] == "decimal");
        ensure!(value["length"] == 8);
        Ok(())
    }

    #[test]
    fn clones_share_the_source() -> anyhow::Result<()> {
        let generator = Generator::builder()
            .chars(Preset::Hex)
            .bits(8.0)
            .source(FixedBytes::new([0x12_u8, 0x34]))
            .build()?;
        let clone = generator.clone();
        ensure!(generator.generate()? == "12");
        ensure!(clone.generate()? == "34");
        ensure!(generator.generate().is_err());
        Ok(())
    }

    proptest! {
        #[test]
        fn length_always_matches_the_configuration(
            bits in 1.0f64..512.0,
            preset in prop::sample::select(Preset::ALL.to_vec()),
            seed in any::<u64>(),
        ) {
            let generator = Generator::builder()
                .chars(preset)
                .bits(bits)
                .source(SeededEntropy::new(seed))
                .build()
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let width = f64::from(generator.alphabet().bits_per_symbol());
            #[allow(clippy::cast_precision_loss)]
            let length = generator.length() as f64;
            prop_assert!(length * width >= bits);
            prop_assert!((length - 1.0) * width < bits);

            let id = generator.generate().map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(id.chars().count(), generator.length());
            prop_assert!(id.chars().all(|c| generator.alphabet().index_of(c).is_some()));
        }
    }
}
