use anyhow::{Context, Result};
use catalog_feed_core::{encode, ExternalId};
use clap::Args;
use serde_json::json;

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Channel id (1-9999, or 0 for unscoped)
    #[arg(long)]
    channel: u32,
    /// Entity id
    #[arg(long)]
    entity: u64,
}

pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    println!("{}", encode(args.channel, args.entity)?);
    Ok(())
}

pub fn handle_decode(external: &str) -> Result<()> {
    let id: ExternalId = external
        .parse()
        .with_context(|| format!("cannot decode '{external}'"))?;
    println!(
        "{}",
        json!({ "channel_id": id.channel_id(), "entity_id": id.entity_id() })
    );
    Ok(())
}
