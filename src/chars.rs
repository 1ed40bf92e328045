//! Predefined symbol sets and the `chars` configuration value.
//!
//! The preset tables are fixed literals; identifiers generated from the same
//! preset and the same entropy bytes are identical across implementations, so
//! the exact characters and their order must never change.

use clap::builder::PossibleValue;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a literal symbol string in [`CharSet::from_str`](std::str::FromStr).
pub const CUSTOM_PREFIX: &str = "custom:";

/// Named symbol sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Upper and lower case ASCII letters.
    Alpha,
    /// Lower case ASCII letters.
    AlphaLower,
    /// Upper case ASCII letters.
    AlphaUpper,
    /// Letters followed by decimal digits.
    Alphanum,
    /// Lower case letters followed by decimal digits.
    AlphanumLower,
    /// Upper case letters followed by decimal digits.
    AlphanumUpper,
    /// Upper case hexadecimal (RFC 4648 base16).
    Base16,
    /// RFC 4648 base32.
    Base32,
    /// RFC 4648 base32 "extended hex", lower case.
    Base32Hex,
    /// RFC 4648 base32 "extended hex", upper case.
    Base32HexUpper,
    /// Crockford base32 (no I, L, O, U).
    Crockford32,
    /// Decimal digits.
    Decimal,
    /// Lower case hexadecimal.
    Hex,
    /// Upper case hexadecimal.
    HexUpper,
    /// Printable ASCII without space, quotes, backslash, or backtick.
    SafeAscii,
    /// 32 symbols avoiding look-alikes and vowels.
    Safe32,
    /// URL and file system safe base64.
    Safe64,
    /// The punctuation half of [`Preset::SafeAscii`].
    Symbol,
    /// 32 symbols chosen so identifiers rarely spell words.
    #[serde(rename = "wordSafe32", alias = "word_safe32")]
    WordSafe32,
}

impl Preset {
    /// Every preset, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Alpha,
        Self::AlphaLower,
        Self::AlphaUpper,
        Self::Alphanum,
        Self::AlphanumLower,
        Self::AlphanumUpper,
        Self::Base16,
        Self::Base32,
        Self::Base32Hex,
        Self::Base32HexUpper,
        Self::Crockford32,
        Self::Decimal,
        Self::Hex,
        Self::HexUpper,
        Self::SafeAscii,
        Self::Safe32,
        Self::Safe64,
        Self::Symbol,
        Self::WordSafe32,
    ];

    /// The literal symbol table.
    #[must_use]
    pub const fn symbols(self) -> &'static str {
        match self {
            Self::Alpha => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
            Self::AlphaLower => "abcdefghijklmnopqrstuvwxyz",
            Self::AlphaUpper => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::Alphanum => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789",
            Self::AlphanumLower => "abcdefghijklmnopqrstuvwxyz0123456789",
            Self::AlphanumUpper => "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789",
            Self::Base16 | Self::HexUpper => "0123456789ABCDEF",
            Self::Base32 => "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567",
            Self::Base32Hex => "0123456789abcdefghijklmnopqrstuv",
            Self::Base32HexUpper => "0123456789ABCDEFGHIJKLMNOPQRSTUV",
            Self::Crockford32 => "0123456789ABCDEFGHJKMNPQRSTVWXYZ",
            Self::Decimal => "0123456789",
            Self::Hex => "0123456789abcdef",
            Self::SafeAscii => {
                "!#$%&()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[]^_abcdefghijklmnopqrstuvwxyz{|}~"
            }
            Self::Safe32 => "2346789bdfghjmnpqrtBDFGHJLMNPQRT",
            Self::Safe64 => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_",
            Self::Symbol => "!#$%&()*+,-./:;<=>?@[]^_{|}~",
            Self::WordSafe32 => "23456789CFGHJMPQRVWXcfghjmpqrvwx",
        }
    }

    /// Canonical name, as accepted by configuration and the CLI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::AlphaLower => "alpha_lower",
            Self::AlphaUpper => "alpha_upper",
            Self::Alphanum => "alphanum",
            Self::AlphanumLower => "alphanum_lower",
            Self::AlphanumUpper => "alphanum_upper",
            Self::Base16 => "base16",
            Self::Base32 => "base32",
            Self::Base32Hex => "base32_hex",
            Self::Base32HexUpper => "base32_hex_upper",
            Self::Crockford32 => "crockford32",
            Self::Decimal => "decimal",
            Self::Hex => "hex",
            Self::HexUpper => "hex_upper",
            Self::SafeAscii => "safe_ascii",
            Self::Safe32 => "safe32",
            Self::Safe64 => "safe64",
            Self::Symbol => "symbol",
            Self::WordSafe32 => "wordSafe32",
        }
    }

    /// Short human description, shown by `puid chars` and in `--help`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Alpha => "A-Z a-z (52)",
            Self::AlphaLower => "a-z (26)",
            Self::AlphaUpper => "A-Z (26)",
            Self::Alphanum => "A-Z a-z 0-9 (62)",
            Self::AlphanumLower => "a-z 0-9 (36)",
            Self::AlphanumUpper => "A-Z 0-9 (36)",
            Self::Base16 => "RFC 4648 base16 (16)",
            Self::Base32 => "RFC 4648 base32 (32)",
            Self::Base32Hex => "RFC 4648 base32hex, lower case (32)",
            Self::Base32HexUpper => "RFC 4648 base32hex, upper case (32)",
            Self::Crockford32 => "Crockford base32 (32)",
            Self::Decimal => "0-9 (10)",
            Self::Hex => "0-9 a-f (16)",
            Self::HexUpper => "0-9 A-F (16)",
            Self::SafeAscii => "Printable ASCII minus quotes, backslash, backtick (90)",
            Self::Safe32 => "No look-alikes or vowels (32)",
            Self::Safe64 => "URL/file safe base64 (64)",
            Self::Symbol => "Punctuation from safe_ascii (28)",
            Self::WordSafe32 => "Avoids spelling words (32)",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ValueEnum for Preset {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        let pv = PossibleValue::new(self.name()).help(self.description());
        Some(match self {
            Self::WordSafe32 => pv.alias("word_safe32"),
            _ => pv,
        })
    }
}

impl std::str::FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("word_safe32") {
            return Ok(Self::WordSafe32);
        }
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown character preset: {s}"))
    }
}

/// The `chars` option: a preset or a caller-supplied symbol sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CharSetRepr", into = "CharSetRepr")]
pub enum CharSet {
    /// A named preset.
    Preset(Preset),
    /// Literal symbols, in index order.
    Custom(String),
}

impl CharSet {
    /// Preset name, or `custom`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Preset(preset) => preset.name(),
            Self::Custom(_) => "custom",
        }
    }
}

impl Default for CharSet {
    fn default() -> Self {
        Self::Preset(Preset::Safe64)
    }
}

impl From<Preset> for CharSet {
    fn from(preset: Preset) -> Self {
        Self::Preset(preset)
    }
}

impl std::str::FromStr for CharSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(CUSTOM_PREFIX) {
            Some(symbols) => Ok(Self::Custom(symbols.to_string())),
            None => Ok(Self::Preset(s.parse()?)),
        }
    }
}

// JSON shape: `"alphanum"` or `{"custom": "abc"}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CharSetRepr {
    Preset(Preset),
    Custom { custom: String },
}

impl From<CharSetRepr> for CharSet {
    fn from(repr: CharSetRepr) -> Self {
        match repr {
            CharSetRepr::Preset(preset) => Self::Preset(preset),
            CharSetRepr::Custom { custom } => Self::Custom(custom),
        }
    }
}

impl From<CharSet> for CharSetRepr {
    fn from(chars: CharSet) -> Self {
        match chars {
            CharSet::Preset(preset) => Self::Preset(preset),
            CharSet::Custom(custom) => Self::Custom { custom },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;
    use std::collections::HashSet;

    #[test]
    fn preset_sizes_match_published_tables() -> anyhow::Result<()> {
        let expected = [
            (Preset::Alpha, 52),
            (Preset::AlphaLower, 26),
            (Preset::AlphaUpper, 26),
            (Preset::Alphanum, 62),
            (Preset::AlphanumLower, 36),
            (Preset::AlphanumUpper, 36),
            (Preset::Base16, 16),
            (Preset::Base32, 32),
            (Preset::Base32Hex, 32),
            (Preset::Base32HexUpper, 32),
            (Preset::Crockford32, 32),
            (Preset::Decimal, 10),
            (Preset::Hex, 16),
            (Preset::HexUpper, 16),
            (Preset::SafeAscii, 90),
            (Preset::Safe32, 32),
            (Preset::Safe64, 64),
            (Preset::Symbol, 28),
            (Preset::WordSafe32, 32),
        ];
        ensure!(expected.len() == Preset::ALL.len());
        for (preset, count) in expected {
            let symbols = preset.symbols();
            ensure!(symbols.chars().count() == count, "{preset} has wrong size");
            let unique: HashSet<char> = symbols.chars().collect();
            ensure!(unique.len() == count, "{preset} repeats a symbol");
        }
        Ok(())
    }

    #[test]
    fn symbol_is_safe_ascii_minus_alphanumerics() -> anyhow::Result<()> {
        let punctuation: String = Preset::SafeAscii
            .symbols()
            .chars()
            .filter(|c| !c.is_ascii_alphanumeric())
            .collect();
        ensure!(punctuation == Preset::Symbol.symbols());
        Ok(())
    }

    #[test]
    fn preset_names_parse_case_insensitively() -> anyhow::Result<()> {
        for preset in Preset::ALL {
            ensure!(preset.name().parse::<Preset>()? == preset);
            ensure!(preset.name().to_uppercase().parse::<Preset>()? == preset);
        }
        ensure!("word_safe32".parse::<Preset>()? == Preset::WordSafe32);
        ensure!("base64".parse::<Preset>().is_err());
        Ok(())
    }

    #[test]
    fn char_set_json_shapes() -> anyhow::Result<()> {
        let preset: CharSet = serde_json::from_str("\"wordSafe32\"")?;
        ensure!(preset == CharSet::Preset(Preset::WordSafe32));

        let custom: CharSet = serde_json::from_str(r#"{"custom":"dingosky"}"#)?;
        ensure!(custom == CharSet::Custom("dingosky".to_string()));

        ensure!(serde_json::to_string(&CharSet::Preset(Preset::Base32Hex))? == "\"base32_hex\"");
        ensure!(
            serde_json::to_string(&CharSet::Custom("abc".to_string()))? == r#"{"custom":"abc"}"#
        );
        Ok(())
    }

    #[test]
    fn char_set_from_str() -> anyhow::Result<()> {
        ensure!("hex_upper".parse::<CharSet>()? == CharSet::Preset(Preset::HexUpper));
        ensure!("custom:αβγδ".parse::<CharSet>()? == CharSet::Custom("αβγδ".to_string()));
        ensure!(CharSet::Custom(String::new()).name() == "custom");
        Ok(())
    }
}
