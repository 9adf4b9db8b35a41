//! `decode`: decode a token and report every stage.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hcert::{Pipeline, TrustStore};

use crate::issue::load_config;

/// Arguments for the decode subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Trust list: JSON array of `{kid, algorithm, key}` entries.
    #[arg(long)]
    pub trust: PathBuf,

    /// Pipeline configuration (JSON); defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Evaluate validity at this time (seconds since the epoch) instead of now.
    #[arg(long)]
    pub at: Option<i64>,

    /// The token; `-` reads it from stdin.
    pub token: String,
}

/// Decode and print the result as JSON. Returns whether the token is usable.
pub fn run_decode(args: &DecodeArgs) -> Result<bool> {
    let pipeline = Pipeline::new(load_config(args.config.as_ref())?)?;

    let trust_json = std::fs::read_to_string(&args.trust)
        .with_context(|| format!("reading {}", args.trust.display()))?;
    let trust = TrustStore::from_json(&trust_json)
        .with_context(|| format!("loading trust list {}", args.trust.display()))?;
    tracing::debug!(entries = trust.len(), "trust list loaded");

    let token = if args.token == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading token from stdin")?;
        buf
    } else {
        args.token.clone()
    };

    let result = match args.at {
        Some(now) => pipeline.decode_at(&token, &trust, now),
        None => pipeline.decode(&token, &trust),
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_usable())
}
