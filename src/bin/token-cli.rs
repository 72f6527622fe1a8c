use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use app_bootstrap::auth::{RawObject, SigningKeyPair, TokenService};
use app_bootstrap::config::{AppConfig, JwtConfig};
use app_bootstrap::lifecycle::startup::default_loader;
use app_bootstrap::observability::error_chain;

#[derive(Parser)]
#[command(name = "token-cli")]
#[command(about = "Key generation and RS256 credential tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair and print both halves as PEM
    Keygen {
        #[arg(short, long, default_value_t = 2048)]
        bits: usize,
    },
    /// Sign a JSON object payload with JWT_PRIVATE_KEY
    Issue {
        #[arg(short, long)]
        payload: String,

        /// Lifetime in seconds
        #[arg(short, long, default_value_t = 3600)]
        ttl: u64,
    },
    /// Verify a token and print its payload
    Verify { token: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", error_chain(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Keygen { bits } => {
            let keys = SigningKeyPair::generate(bits, JwtConfig::default().issuer)?;
            print!("{}", keys.private_key_pem()?);
            print!("{}", keys.public_key_pem()?);
        }
        Commands::Issue { payload, ttl } => {
            let payload: Value = serde_json::from_str(&payload)?;
            let token = token_service()?.create_token(&payload, Duration::from_secs(ttl))?;
            println!("{token}");
        }
        Commands::Verify { token } => {
            let payload = token_service()?.decode_token(token.trim(), &RawObject)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

fn token_service() -> Result<TokenService, Box<dyn std::error::Error>> {
    let env = default_loader().load()?;
    let config = AppConfig::from_env(&env)?;
    Ok(TokenService::from_config(&config.jwt)?)
}
