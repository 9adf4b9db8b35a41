//! # hcert CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;

/// Issue, decode and inspect signed health certificate tokens.
#[derive(Parser, Debug)]
#[command(name = "hcert", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Sign a JSON payload into a token.
    Issue(hcert_cli::issue::IssueArgs),
    /// Decode a token and print every stage outcome.
    Decode(hcert_cli::decode::DecodeArgs),
    /// Print CBOR diagnostic notation.
    Dump(hcert_cli::dump::DumpArgs),
    /// Print a signing key's trust list entry.
    PublicKey(hcert_cli::keys::PublicKeyArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Issue(args) => hcert_cli::issue::run_issue(&args)?,
        Commands::Decode(args) => {
            if !hcert_cli::decode::run_decode(&args)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Dump(args) => hcert_cli::dump::run_dump(&args)?,
        Commands::PublicKey(args) => hcert_cli::keys::run_public_key(&args)?,
    }

    Ok(ExitCode::SUCCESS)
}
