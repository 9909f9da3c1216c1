//! Command-line front end for the cipher-modes library.
//!
//! Reads the input, key and IV as hex files (whitespace ignored) and writes
//! the result as space-separated hex bytes.

use anyhow::{bail, Context, Result};
use cipher_modes::{Algorithm, CipherContext, Engine, Mode, PasswordOptions};
use clap::{Parser, ValueEnum};
use std::fs;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the cipher program.
#[derive(Parser, Debug)]
#[command(name = "cipher", version, about = "Encrypt or decrypt hex files with a block cipher mode")]
struct Cli {
    /// Path to the input file.
    #[arg(short, long, help = "Path to the input file")]
    file: String,

    /// Path to the output file.
    #[arg(short, long, help = "Path to the output file")]
    output: String,

    #[arg(short, long, help = "File containing the key as hex", conflicts_with = "password")]
    key: Option<String>,

    #[arg(short, long, help = "Derive the key from this password (PBKDF2-SHA1)")]
    password: Option<String>,

    #[arg(long, help = "File containing the IV as hex")]
    iv: Option<String>,

    #[arg(short, long, default_value = "aes", help = "aes, twofish, des, 3des, 3des-inner-cbc or rc4")]
    algorithm: Algorithm,

    #[arg(short, long, default_value = "cbc", help = "ecb, cbc, ctr, cfb, cfb8, ofb or stream")]
    mode: Mode,

    /// Operation to perform.
    #[arg(short = 'x', long, value_enum, help = "Operation (encrypt/decrypt)")]
    operation: Operation,

    #[arg(long, help = "Disable PKCS#7 padding for ECB and CBC")]
    no_padding: bool,

    #[arg(long, help = "Process the input in chunks of this many bytes with a continuous buffer")]
    chunk_size: Option<usize>,

    #[arg(long, help = "Pin the engine (software or accelerated)")]
    engine: Option<Engine>,

    #[arg(long, default_value = "warn", help = "Log filter used when RUST_LOG is unset")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Operation {
    Encrypt,
    Decrypt,
}

/// Reads hex data from a file, ignoring spaces and line breaks.
fn read_hex_from_file(filename: &str) -> Result<Vec<u8>> {
    let content =
        fs::read_to_string(filename).with_context(|| format!("failed to read {filename}"))?;
    parse_hex(&content).with_context(|| format!("{filename} does not contain valid hex"))
}

fn parse_hex(content: &str) -> Result<Vec<u8>> {
    let hex_string: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(hex_string)?)
}

/// Writes bytes as space-separated hex.
fn write_hex_to_file(filename: &str, data: &[u8]) -> Result<()> {
    fs::write(filename, format_hex(data)).with_context(|| format!("failed to write {filename}"))
}

fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(" ")
}

fn build_context(cli: &Cli) -> Result<CipherContext> {
    let mut ctx = CipherContext::new(cli.algorithm, cli.mode)
        .with_context(|| format!("cannot use {} with {}", cli.mode, cli.algorithm))?;

    match (&cli.key, &cli.password) {
        (Some(path), _) => {
            let key = read_hex_from_file(path)?;
            ctx.set_key(&key).context("key rejected")?;
        }
        (None, Some(password)) => {
            ctx.set_password(password.as_bytes(), &PasswordOptions::default())
                .context("key derivation failed")?;
        }
        (None, None) => bail!("either --key or --password is required"),
    }

    if let Some(path) = &cli.iv {
        if !cli.mode.uses_iv() {
            warn!(mode = %cli.mode, "the IV is ignored in this mode");
        }
        ctx.set_iv(&read_hex_from_file(path)?);
    }
    if cli.no_padding {
        ctx.disable_padding();
    }
    if cli.chunk_size.is_some() {
        ctx.enable_continuous_buffer();
    }
    if let Some(engine) = cli.engine {
        if !ctx.is_valid_engine(engine) {
            bail!("engine {engine} is not available for {}/{}", cli.algorithm, cli.mode);
        }
        ctx.set_preferred_engine(Some(engine));
    }
    Ok(ctx)
}

fn process(ctx: &mut CipherContext, operation: Operation, data: &[u8], chunk_size: Option<usize>) -> Result<Vec<u8>> {
    let block_mode = ctx.mode().is_block_mode();
    let padded = block_mode && ctx.is_padding();
    let chunk_size = match chunk_size {
        // ECB and CBC chunks are rounded up to whole blocks
        Some(size) if block_mode => size.max(1).div_ceil(ctx.block_size()) * ctx.block_size(),
        Some(size) => size.max(1),
        None => data.len().max(1),
    };

    let mut chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
    // an empty input is still one call so padding gets applied
    if chunks.is_empty() {
        chunks.push(data);
    }
    let last = chunks.len() - 1;

    let mut output = Vec::with_capacity(data.len() + ctx.block_size());
    for (index, chunk) in chunks.into_iter().enumerate() {
        // only the final chunk carries the PKCS#7 pad
        if padded {
            if index == last {
                ctx.enable_padding();
            } else {
                ctx.disable_padding();
            }
        }
        let piece = match operation {
            Operation::Encrypt => ctx.encrypt(chunk),
            Operation::Decrypt => ctx.decrypt(chunk),
        };
        output.extend(piece.with_context(|| format!("{operation:?} failed"))?);
    }
    Ok(output)
}

fn run(cli: &Cli) -> Result<()> {
    let data = read_hex_from_file(&cli.file)?;
    let mut ctx = build_context(cli)?;
    info!(algorithm = %cli.algorithm, mode = %cli.mode, bytes = data.len(), "processing input");

    let result = process(&mut ctx, cli.operation, &data, cli.chunk_size)?;
    debug!(engine = ?ctx.engine(), "done");

    write_hex_to_file(&cli.output, &result)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}
