//! FlowTTS CLI - a command line interface for the FlowTTS streaming API.

use clap::{Parser, Subcommand};

mod commands;

use commands::{SignUrlCommand, StreamCommand};

/// FlowTTS CLI - a command line interface for FlowTTS bidirectional
/// streaming speech synthesis.
///
/// Credentials are read from the environment:
///   - FLOWTTS_SECRET_ID / FLOWTTS_SECRET_KEY (required)
///   - FLOWTTS_APP_ID / FLOWTTS_SDK_APP_ID
///   - FLOWTTS_ENDPOINT (optional ws:// or wss:// override)
#[derive(Parser)]
#[command(name = "flowtts")]
#[command(about = "FlowTTS bidirectional streaming TTS CLI")]
#[command(version)]
pub struct Cli {
    /// Output file for raw PCM audio
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream text through a bidirectional synthesis session
    Stream(StreamCommand),
    /// Print a signed connection URL without connecting
    SignUrl(SignUrlCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Stream(cmd) => cmd.run(&cli).await,
        Commands::SignUrl(cmd) => cmd.run(&cli).await,
    }
}
