//! `puid` generates random identifiers of a precisely specified entropy.
//!
//! It backs the `puid` CLI binary and provides:
//! - Entropy math: bits needed for N identifiers at a 1-in-R collision risk, and back
//! - A registry of preset alphabets plus validated custom ones (up to 256 symbols)
//! - A bit-slicing codec that maps random bytes onto any alphabet, recycling the
//!   bits of out-of-range slices instead of throwing them all away
//! - A thread-safe [`Generator`] over a pluggable [`EntropySource`]
//!
//! ```no_run
//! use puid::{Generator, Preset};
//!
//! let generator = Generator::builder()
//!     .chars(Preset::Alphanum)
//!     .total_risk(1.0e6, 1.0e12)
//!     .build()?;
//! let id = generator.generate()?;
//! assert_eq!(id.chars().count(), generator.length());
//! # Ok::<(), puid::PuidError>(())
//! ```

/// Validated alphabets with precomputed slicing tables.
pub mod alphabet;
/// Preset alphabets and the `chars` option.
pub mod chars;
/// Bytes to symbols and back.
pub mod codec;
/// Serializable generator configuration.
pub mod config;
/// Birthday-bound entropy math.
pub mod entropy;
/// Error type.
pub mod error;
/// Configured generator.
pub mod generator;
/// Random byte sources.
pub mod source;

pub use alphabet::Alphabet;
pub use chars::{CharSet, Preset};
pub use config::{load_config, EntropySpec, PuidConfig};
pub use error::{PuidError, Result};
pub use generator::{Generator, GeneratorBuilder, Info};
pub use source::{EntropySource, FixedBytes, FnSource, OsEntropy, SeededEntropy};
