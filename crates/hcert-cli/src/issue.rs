//! `issue`: sign a JSON payload into a token.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hcert::{Pipeline, PipelineConfig};

use crate::keys::KeyArgs;

/// Arguments for the issue subcommand.
#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Issuer country code written into the claim set.
    #[arg(long)]
    pub issuer: Option<String>,

    /// JSON file holding the certificate payload.
    #[arg(long)]
    pub payload: PathBuf,

    /// Pipeline configuration (JSON); defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Validity in days, overriding the configuration.
    #[arg(long)]
    pub validity_days: Option<i64>,
}

/// Load a pipeline configuration file, or the defaults.
pub fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Issue a certificate and print it as JSON.
pub fn run_issue(args: &IssueArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(issuer) = &args.issuer {
        config.issuer = issuer.clone();
    }
    if let Some(days) = args.validity_days {
        config.validity_days = days;
    }
    let pipeline = Pipeline::new(config)?;
    let signer = args.key.signer()?;

    let text = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("reading {}", args.payload.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.payload.display()))?;

    let issued = pipeline.issue_payload(&payload, &signer)?;
    tracing::debug!(kid = %issued.kid, "certificate issued");
    println!("{}", serde_json::to_string_pretty(&issued)?);
    Ok(())
}
