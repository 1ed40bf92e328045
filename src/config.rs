//! Generator configuration as a plain value, loadable from a JSON file.
//!
//! ```json
//! { "chars": "alphanum", "bits": 64 }
//! { "chars": { "custom": "0123456789" }, "total": 1e6, "risk": 1e12 }
//! ```
//!
//! Every field is optional; a missing `chars` means `safe64` and missing
//! entropy means 128 bits. `bits` and `total`/`risk` are mutually exclusive.

use crate::chars::CharSet;
use crate::entropy;
use crate::error::{PuidError, Result};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Entropy used when none is configured.
pub const DEFAULT_BITS: f64 = 128.0;

/// How much entropy each identifier must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntropySpec {
    /// Bits of entropy, directly.
    Bits(f64),
    /// `total` identifiers with collision odds no worse than 1-in-`risk`.
    TotalRisk {
        /// Expected number of identifiers.
        total: f64,
        /// Acceptable collision odds, as "1-in-N".
        risk: f64,
    },
}

impl EntropySpec {
    /// Resolve to a bit count.
    ///
    /// # Errors
    /// [`PuidError::InvalidArgument`] for non-finite or out-of-range inputs.
    pub fn resolve(&self) -> Result<f64> {
        match *self {
            Self::Bits(bits) => {
                entropy::check_bits(bits)?;
                Ok(bits)
            }
            Self::TotalRisk { total, risk } => entropy::bits_for(total, risk),
        }
    }
}

impl Default for EntropySpec {
    fn default() -> Self {
        Self::Bits(DEFAULT_BITS)
    }
}

/// Alphabet plus entropy: everything needed to build a [`crate::Generator`]
/// apart from the entropy source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRepr", into = "ConfigRepr")]
pub struct PuidConfig {
    /// Symbols to draw from.
    pub chars: CharSet,
    /// Entropy per identifier; `None` when not configured, meaning
    /// [`DEFAULT_BITS`].
    pub entropy: Option<EntropySpec>,
}

/// Read a [`PuidConfig`] from a JSON file.
///
/// # Errors
/// Fails when the file cannot be read or does not hold a valid configuration.
pub fn load_config(path: &Path) -> anyhow::Result<PuidConfig> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRepr {
    #[serde(default)]
    chars: CharSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bits: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    risk: Option<f64>,
}

impl TryFrom<ConfigRepr> for PuidConfig {
    type Error = PuidError;

    fn try_from(repr: ConfigRepr) -> Result<Self> {
        let entropy = match (repr.bits, repr.total, repr.risk) {
            (None, None, None) => None,
            (Some(bits), None, None) => Some(EntropySpec::Bits(bits)),
            (None, Some(total), Some(risk)) => Some(EntropySpec::TotalRisk { total, risk }),
            _ => {
                return Err(PuidError::invalid(
                    "set either `bits` or both `total` and `risk`",
                ))
            }
        };
        Ok(Self {
            chars: repr.chars,
            entropy,
        })
    }
}

impl From<PuidConfig> for ConfigRepr {
    fn from(config: PuidConfig) -> Self {
        let (bits, total, risk) = match config.entropy {
            Some(EntropySpec::Bits(bits)) => (Some(bits), None, None),
            Some(EntropySpec::TotalRisk { total, risk }) => (None, Some(total), Some(risk)),
            None => (None, None, None),
        };
        Self {
            chars: config.chars,
            bits,
            total,
            risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::Preset;
    use anyhow::ensure;

    #[test]
    fn empty_object_uses_defaults() -> anyhow::Result<()> {
        let config: PuidConfig = serde_json::from_str("{}")?;
        ensure!(config == PuidConfig::default());
        ensure!(config.chars == CharSet::Preset(Preset::Safe64));
        ensure!(config.entropy.is_none());
        Ok(())
    }

    #[test]
    fn parses_both_entropy_shapes() -> anyhow::Result<()> {
        let bits: PuidConfig = serde_json::from_str(r#"{"chars":"alphanum","bits":64}"#)?;
        ensure!(bits.chars == CharSet::Preset(Preset::Alphanum));
        ensure!(bits.entropy == Some(EntropySpec::Bits(64.0)));

        let total_risk: PuidConfig =
            serde_json::from_str(r#"{"chars":{"custom":"abc"},"total":1e6,"risk":1e12}"#)?;
        ensure!(total_risk.chars == CharSet::Custom("abc".to_string()));
        let resolved = match total_risk.entropy {
            Some(spec) => spec.resolve()?,
            None => anyhow::bail!("total/risk not parsed"),
        };
        ensure!((resolved - 78.73).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn rejects_mixed_partial_and_unknown_fields() {
        for raw in [
            r#"{"bits":64,"total":1e6,"risk":1e12}"#,
            r#"{"total":1e6}"#,
            r#"{"risk":1e12}"#,
            r#"{"bits":64,"risk":1e12}"#,
            r#"{"bits":64,"colour":"blue"}"#,
            r#"{"chars":"klingon"}"#,
        ] {
            assert!(serde_json::from_str::<PuidConfig>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn serializes_back_to_the_file_shape() -> anyhow::Result<()> {
        let config = PuidConfig {
            chars: CharSet::Custom("xyz".to_string()),
            entropy: Some(EntropySpec::TotalRisk {
                total: 1000.0,
                risk: 1.0e9,
            }),
        };
        let value = serde_json::to_value(&config)?;
        ensure!(value == serde_json::json!({"chars": {"custom": "xyz"}, "total": 1000.0, "risk": 1.0e9}));
        ensure!(serde_json::from_value::<PuidConfig>(value)? == config);

        let unset = PuidConfig {
            chars: CharSet::Preset(Preset::Hex),
            entropy: None,
        };
        ensure!(serde_json::to_value(&unset)? == serde_json::json!({"chars": "hex"}));
        Ok(())
    }

    #[test]
    fn resolve_validates_bits() {
        assert!(EntropySpec::Bits(0.0).resolve().is_err());
        assert!(EntropySpec::Bits(f64::NAN).resolve().is_err());
        assert!(EntropySpec::TotalRisk { total: 1.0, risk: 10.0 }
            .resolve()
            .is_err());
    }

    #[test]
    fn load_config_reports_the_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("puid.json");
        fs::write(&path, r#"{"chars":"hex","bits":32}"#)?;
        let config = load_config(&path)?;
        ensure!(config.chars == CharSet::Preset(Preset::Hex));

        let missing = dir.path().join("missing.json");
        let err = match load_config(&missing) {
            Ok(_) => anyhow::bail!("missing file should fail"),
            Err(err) => err,
        };
        ensure!(format!("{err:#}").contains("missing.json"));
        Ok(())
    }
}
