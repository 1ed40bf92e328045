#![allow(clippy::print_stderr, clippy::print_stdout)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use puid::alphabet::Alphabet;
use puid::entropy;
use puid::{
    load_config, CharSet, EntropySpec, FixedBytes, Generator, Preset, PuidConfig, SeededEntropy,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const BITS_ENV: &str = "PUID_BITS";

#[derive(Parser)]
#[command(
    name = "puid",
    version,
    about = "Probably unique identifiers with explicit entropy",
    long_about = "Probably unique identifiers with explicit entropy.\n\n\
`puid` sizes identifiers from the entropy you ask for, either directly in bits or as \
\"N identifiers with a 1-in-R chance of any collision\", and slices random bytes onto \
any alphabet of up to 256 symbols.\n\n\
Use `--json` for machine-readable output.\n\
Without `--json`, identifiers print one per line and structured results print as one-line JSON.",
    after_long_help = r#"Selecting an alphabet:
  --chars alphanum            a preset (see `puid chars`)
  --chars 'custom:0123456789' literal symbols, in index order

Selecting entropy:
  --bits 96                   bits directly
  --total 1e6 --risk 1e12     one million ids, 1-in-a-trillion collision odds

Examples:
  puid generate --chars alphanum --total 1e6 --risk 1e12 --count 3
  puid info --chars decimal --bits 64
  puid encode --chars hex --hex 9f3a
  puid bits --total 1e9 --risk 1e15
"#
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value_t = false,
        help = "Emit pretty JSON (suitable for scripting)."
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        env = "PUID_LOG",
        default_value = "warn",
        value_name = "FILTER",
        help = "Diagnostics filter for stderr (tracing EnvFilter syntax, e.g. `debug`)."
    )]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate identifiers.
    #[command(after_long_help = r#"Examples:
  puid generate
  puid generate --chars hex --bits 16 --bytes-hex 9f3a
  puid generate --config puid.json --count 10
"#)]
    Generate {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        source: SourceArgs,
        #[arg(
            long,
            default_value_t = 1,
            value_name = "N",
            help = "Number of identifiers to generate."
        )]
        count: usize,
    },
    /// Describe a generator configuration without generating anything.
    #[command(after_long_help = r#"Fields:
  bits_per_symbol          slice width, ceil(log2(symbols))
  entropy_bits_per_symbol  log2(symbols)
  total_entropy_bits       length * log2(symbols)
  ere                      entropy_bits_per_symbol / bits_per_symbol
  ete                      entropy_bits_per_symbol / expected source bits per symbol
"#)]
    Info {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Slice given bytes into an identifier (power-of-two alphabets only).
    #[command(after_long_help = r#"Example:
  puid encode --chars safe32 --hex deadbeef01
"#)]
    Encode {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, value_name = "HEX", help = "Bytes to encode, as hex digits.")]
        hex: String,
    },
    /// Recover the bytes behind an identifier (power-of-two alphabets only).
    #[command(after_long_help = r#"A trailing partial byte is dropped.

Example:
  puid decode --chars hex 9f3a
"#)]
    Decode {
        #[command(flatten)]
        selection: Selection,
        #[arg(value_name = "ID", help = "Identifier to decode.")]
        id: String,
    },
    /// Entropy bits needed for `total` identifiers at 1-in-`risk` collision odds.
    Bits {
        #[arg(long, value_name = "N", help = "Expected number of identifiers.")]
        total: f64,
        #[arg(long, value_name = "R", help = "Acceptable collision odds, as 1-in-R.")]
        risk: f64,
    },
    /// Identifiers that fit within 1-in-`risk` collision odds at `bits` of entropy.
    Total {
        #[arg(long, value_name = "BITS", help = "Entropy per identifier.")]
        bits: f64,
        #[arg(long, value_name = "R", help = "Acceptable collision odds, as 1-in-R.")]
        risk: f64,
    },
    /// Collision odds (1-in-N) for `total` identifiers at `bits` of entropy.
    Risk {
        #[arg(long, value_name = "BITS", help = "Entropy per identifier.")]
        bits: f64,
        #[arg(long, value_name = "N", help = "Number of identifiers.")]
        total: f64,
    },
    /// List the preset alphabets.
    Chars {
        #[arg(
            value_enum,
            value_name = "PRESET",
            help = "Show only this preset."
        )]
        preset: Option<Preset>,
    },
}

#[derive(Args)]
struct Selection {
    #[arg(
        long,
        env = "PUID_CHARS",
        value_name = "CHARS",
        help = "Preset name or `custom:<symbols>` (default: safe64)."
    )]
    chars: Option<CharSet>,
    #[arg(
        long,
        value_name = "BITS",
        conflicts_with_all = ["total", "risk"],
        help = "Entropy per identifier in bits (default: $PUID_BITS, then 128)."
    )]
    bits: Option<f64>,
    #[arg(
        long,
        value_name = "N",
        requires = "risk",
        help = "Expected number of identifiers (with --risk)."
    )]
    total: Option<f64>,
    #[arg(
        long,
        value_name = "R",
        requires = "total",
        help = "Acceptable collision odds as 1-in-R (with --total)."
    )]
    risk: Option<f64>,
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON config file; --chars/--bits/--total/--risk override it, and it overrides $PUID_BITS."
    )]
    config: Option<PathBuf>,
}

impl Selection {
    fn resolve(&self) -> anyhow::Result<PuidConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PuidConfig::default(),
        };
        if let Some(chars) = &self.chars {
            config.chars = chars.clone();
        }
        if let Some(bits) = self.bits {
            config.entropy = Some(EntropySpec::Bits(bits));
        }
        if let (Some(total), Some(risk)) = (self.total, self.risk) {
            config.entropy = Some(EntropySpec::TotalRisk { total, risk });
        }
        if config.entropy.is_none() {
            config.entropy = env_bits()?.map(EntropySpec::Bits);
        }
        Ok(config)
    }
}

// `PUID_BITS` only fills in entropy that neither the flags nor the file set.
fn env_bits() -> anyhow::Result<Option<f64>> {
    match std::env::var(BITS_ENV) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("parse {BITS_ENV}={raw:?}")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {BITS_ENV}")),
    }
}

#[derive(Args)]
struct SourceArgs {
    #[arg(
        long,
        value_name = "SEED",
        conflicts_with = "bytes_hex",
        help = "Use a seeded pseudo-random source (reproducible; not for real identifiers)."
    )]
    seed: Option<u64>,
    #[arg(
        long,
        value_name = "HEX",
        help = "Use exactly these bytes as the entropy source."
    )]
    bytes_hex: Option<String>,
}

#[derive(Serialize)]
struct BitsOutput {
    total: f64,
    risk: f64,
    bits: f64,
}

#[derive(Serialize)]
struct TotalOutput {
    bits: f64,
    risk: f64,
    total: u128,
}

#[derive(Serialize)]
struct RiskOutput {
    bits: f64,
    total: f64,
    risk: u128,
}

#[derive(Serialize)]
struct PresetOutput {
    name: &'static str,
    characters: &'static str,
    description: &'static str,
    count: usize,
    bits_per_symbol: u32,
    ere: f64,
    ete: f64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log)?;

    match cli.command {
        Commands::Generate {
            selection,
            source,
            count,
        } => {
            let generator = build_generator(&selection, Some(&source))?;
            let ids = (0..count)
                .map(|_| generator.generate())
                .collect::<Result<Vec<_>, _>>()
                .context("generate identifier")?;
            if cli.json {
                write_json(&ids)?;
            } else {
                for id in ids {
                    println!("{id}");
                }
            }
        }
        Commands::Info { selection, source } => {
            let generator = build_generator(&selection, Some(&source))?;
            write_result(cli.json, &generator.info())?;
        }
        Commands::Encode { selection, hex } => {
            let generator = build_generator(&selection, None)?;
            let id = generator
                .encode(&parse_hex(&hex)?)
                .context("encode bytes")?;
            if cli.json {
                write_json(&serde_json::json!({ "id": id }))?;
            } else {
                println!("{id}");
            }
        }
        Commands::Decode { selection, id } => {
            let generator = build_generator(&selection, None)?;
            let bytes = generator.decode(&id).context("decode identifier")?;
            let hex = to_hex(&bytes);
            if cli.json {
                write_json(&serde_json::json!({ "hex": hex }))?;
            } else {
                println!("{hex}");
            }
        }
        Commands::Bits { total, risk } => {
            let bits = entropy::bits_for(total, risk)?;
            if cli.json {
                write_json(&BitsOutput { total, risk, bits })?;
            } else {
                println!("{bits}");
            }
        }
        Commands::Total { bits, risk } => {
            let total = entropy::total_for(bits, risk)?;
            if cli.json {
                write_json(&TotalOutput { bits, risk, total })?;
            } else {
                println!("{total}");
            }
        }
        Commands::Risk { bits, total } => {
            let risk = entropy::risk_for(bits, total)?;
            if cli.json {
                write_json(&RiskOutput { bits, total, risk })?;
            } else {
                println!("{risk}");
            }
        }
        Commands::Chars { preset } => {
            let presets: Vec<PresetOutput> = match preset {
                Some(preset) => vec![describe_preset(preset)],
                None => Preset::ALL.into_iter().map(describe_preset).collect(),
            };
            if cli.json {
                write_json(&presets)?;
            } else {
                for preset in presets {
                    println!("{:<16} {}", preset.name, preset.characters);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("parse log filter {filter:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install tracing subscriber: {err}"))
}

fn build_generator(
    selection: &Selection,
    source: Option<&SourceArgs>,
) -> anyhow::Result<Generator> {
    let config = selection.resolve()?;
    let builder = Generator::builder().config(&config);
    let builder = match source {
        Some(SourceArgs {
            seed: Some(seed), ..
        }) => builder.source(SeededEntropy::new(*seed)),
        Some(SourceArgs {
            bytes_hex: Some(hex),
            ..
        }) => builder.source(FixedBytes::new(parse_hex(hex)?)),
        _ => builder,
    };
    builder.build().context("configure generator")
}

fn describe_preset(preset: Preset) -> PresetOutput {
    let alphabet = Alphabet::from_preset(preset);
    PresetOutput {
        name: preset.name(),
        characters: preset.symbols(),
        description: preset.description(),
        count: alphabet.len(),
        bits_per_symbol: alphabet.bits_per_symbol(),
        ere: entropy::round_to(alphabet.ere(), 2),
        ete: entropy::round_to(alphabet.ete(), 2),
    }
}

fn parse_hex(raw: &str) -> anyhow::Result<Vec<u8>> {
    let digits = raw.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .map_or(digits, |rest| rest);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        anyhow::bail!("invalid hex digit {bad:?}");
    }
    anyhow::ensure!(
        digits.len() % 2 == 0,
        "hex input must have an even number of digits, got {}",
        digits.len()
    );
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).context("hex input")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex byte {pair:?}"))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let raw = serde_json::to_string_pretty(value).context("serialize JSON")?;
    stdout.write_all(raw.as_bytes()).context("write stdout")?;
    stdout.write_all(b"\n").context("write stdout newline")?;
    Ok(())
}

fn write_result<T: Serialize>(json: bool, value: &T) -> anyhow::Result<()> {
    if json {
        write_json(value)
    } else {
        // human output: best-effort JSON on one line.
        println!("{}", serde_json::to_string(value).context("serialize")?);
        Ok(())
    }
}
