//! Key arguments shared by the signing subcommands.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use hcert::{Algorithm, Kid, Pipeline, Signer};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlgArg {
    Es256,
    Eddsa,
}

impl From<AlgArg> for Algorithm {
    fn from(alg: AlgArg) -> Self {
        match alg {
            AlgArg::Es256 => Algorithm::Es256,
            AlgArg::Eddsa => Algorithm::EdDsa,
        }
    }
}

/// The signing key, given as a 32-byte secret.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Signature algorithm.
    #[arg(long, value_enum, default_value = "es256")]
    pub alg: AlgArg,

    /// 32-byte secret as hex (Ed25519 seed or P-256 scalar).
    #[arg(long)]
    pub seed: String,

    /// Key identifier as hex; derived from the public key when omitted.
    #[arg(long)]
    pub kid: Option<String>,
}

impl KeyArgs {
    pub fn signer(&self) -> Result<Signer> {
        let bytes = hex::decode(self.seed.trim()).context("seed is not valid hex")?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("seed must be 32 bytes, got {}", bytes.len()))?;

        let signer = Signer::from_seed(self.alg.into(), &seed)?;
        match &self.kid {
            Some(kid) => {
                let kid = Kid::from_hex(kid.trim()).context("kid is not valid hex")?;
                Ok(signer.with_kid(kid))
            }
            None => Ok(signer),
        }
    }
}

/// Arguments for the public-key subcommand.
#[derive(Args, Debug)]
pub struct PublicKeyArgs {
    #[command(flatten)]
    pub key: KeyArgs,
}

/// Print the key's KID, algorithm and public key as JSON.
pub fn run_public_key(args: &PublicKeyArgs) -> Result<()> {
    let signer = args.key.signer()?;
    let info = Pipeline::default().public_key_info(&signer);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
