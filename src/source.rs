//! Entropy sources: the only external collaborator of the generator.
//!
//! A source hands back exactly the number of bytes asked for, or fails. The
//! generator checks the length and reports a short read as
//! [`PuidError::InsufficientEntropy`].
//!
//! Sources take `&self` so one generator can be shared across threads; sources
//! with mutable state keep it behind a `Mutex`.

use crate::error::{PuidError, Result};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Produces random bytes on demand.
pub trait EntropySource: Send + Sync {
    /// Return `count` random bytes.
    ///
    /// # Errors
    /// [`PuidError::EntropySource`] when the underlying generator fails.
    fn bytes(&self, count: usize) -> Result<Vec<u8>>;

    /// Short human-readable name, reported by [`crate::Info`].
    fn describe(&self) -> String;
}

/// The operating system CSPRNG (`rand::rngs::OsRng`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut raw = vec![0_u8; count];
        OsRng
            .try_fill_bytes(&mut raw)
            .map_err(|err| PuidError::EntropySource(format!("read OS randomness: {err}")))?;
        Ok(raw)
    }

    fn describe(&self) -> String {
        "os".to_string()
    }
}

/// A seeded `StdRng`: reproducible, not for production identifiers.
#[derive(Debug)]
pub struct SeededEntropy {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    /// Seed a fresh generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut raw = vec![0_u8; count];
        lock(&self.rng).fill_bytes(&mut raw);
        Ok(raw)
    }

    fn describe(&self) -> String {
        format!("seeded({})", self.seed)
    }
}

/// Replays a fixed byte sequence.
///
/// Once the sequence is used up, requests are answered short (possibly empty)
/// unless the source was built with [`FixedBytes::cycle`].
#[derive(Debug)]
pub struct FixedBytes {
    data: Vec<u8>,
    cycle: bool,
    offset: Mutex<usize>,
}

impl FixedBytes {
    /// Serve `data` once.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            cycle: false,
            offset: Mutex::new(0),
        }
    }

    /// Serve `data` over and over. An empty `data` still answers short.
    #[must_use]
    pub fn cycle(data: impl Into<Vec<u8>>) -> Self {
        Self {
            cycle: true,
            ..Self::new(data)
        }
    }

    /// Bytes not yet served in the current pass.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(*lock(&self.offset))
    }
}

impl EntropySource for FixedBytes {
    fn bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut offset = lock(&self.offset);
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            if *offset >= self.data.len() {
                if !self.cycle || self.data.is_empty() {
                    break;
                }
                *offset = 0;
            }
            let want = count - out.len();
            let chunk = self.data.iter().skip(*offset).take(want);
            let before = out.len();
            out.extend(chunk);
            *offset += out.len() - before;
        }
        Ok(out)
    }

    fn describe(&self) -> String {
        format!("fixed({} bytes)", self.data.len())
    }
}

/// Adapts a closure `Fn(count) -> Result<Vec<u8>>` into a source.
pub struct FnSource<F> {
    name: String,
    fill: F,
}

impl<F> FnSource<F>
where
    F: Fn(usize) -> Result<Vec<u8>> + Send + Sync,
{
    /// Wrap `fill`, reporting `name` in generator info.
    pub fn new(name: impl Into<String>, fill: F) -> Self {
        Self {
            name: name.into(),
            fill,
        }
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").field("name", &self.name).finish()
    }
}

impl<F> EntropySource for FnSource<F>
where
    F: Fn(usize) -> Result<Vec<u8>> + Send + Sync,
{
    fn bytes(&self, count: usize) -> Result<Vec<u8>> {
        (self.fill)(count)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

// A poisoned lock only means another caller panicked mid-request; the state
// inside (an RNG or an offset) is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
