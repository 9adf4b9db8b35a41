//! `dump`: CBOR diagnostic notation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hcert::core::{diagnostic, SignatureEnvelope};
use hcert::text::TextCodec;
use hcert::PipelineConfig;

use crate::issue::load_config;

/// Arguments for the dump subcommand.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Treat the input as a token and dump its envelope and claim set.
    #[arg(long)]
    pub token: bool,

    /// Pipeline configuration (JSON) giving the token prefix and size limit.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hex-encoded CBOR, or a token with `--token`.
    pub input: String,
}

/// Render the input and print it.
pub fn run_dump(args: &DumpArgs) -> Result<()> {
    let codec = codec_for(&load_config(args.config.as_ref())?)?;
    print!("{}", render(args, &codec)?);
    Ok(())
}

/// The text codec a configuration describes.
pub fn codec_for(config: &PipelineConfig) -> Result<TextCodec> {
    config.validate()?;
    Ok(TextCodec::new(config.prefix()?, config.zlib()))
}

/// Render the input as diagnostic notation, one item per line.
pub fn render(args: &DumpArgs, codec: &TextCodec) -> Result<String> {
    if !args.token {
        let bytes = hex::decode(args.input.trim()).context("input is not valid hex")?;
        return Ok(format!("{}\n", diagnostic(&bytes)?));
    }

    let envelope_bytes = codec.decode(&args.input)?;
    let envelope = SignatureEnvelope::from_bytes(&envelope_bytes)?;
    Ok(format!(
        "envelope: {}\nclaims: {}\n",
        diagnostic(&envelope_bytes)?,
        diagnostic(envelope.payload())?
    ))
}
