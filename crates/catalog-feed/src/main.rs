// crates/catalog-feed/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::channels::{handle_channels, ChannelsArgs};
use commands::export::{handle_export, ExportArgs};
use commands::ids::{handle_decode, handle_encode, EncodeArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Catalog feed exporter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the XML feed for every enabled channel
    Export(ExportArgs),
    /// List the configured channels
    Channels(ChannelsArgs),
    /// Print the channel-scoped external id of an entity
    EncodeId(EncodeArgs),
    /// Split an external id into its channel and entity ids
    DecodeId {
        external: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout may carry the feed itself, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Export(args) => handle_export(args),
        Command::Channels(args) => handle_channels(args),
        Command::EncodeId(args) => handle_encode(args),
        Command::DecodeId { external } => handle_decode(&external),
    }
}
