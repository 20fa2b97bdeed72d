use std::path::PathBuf;

use anyhow::Result;
use catalog_feed_core::ChannelRegistry;
use clap::Args;
use comfy_table::Table;

use super::load_config;

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// Feed configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

pub fn handle_channels(args: ChannelsArgs) -> Result<()> {
    let config = load_config(args.config)?;

    let mut table = Table::new();
    table.set_header(vec![
        "Id",
        "Name",
        "Website",
        "Enabled",
        "Grouped export",
        "Out of stock",
    ]);
    for channel in config.channels() {
        table.add_row(vec![
            channel.id.to_string(),
            channel.name.clone(),
            channel.website_id.to_string(),
            yes_no(channel.enabled),
            yes_no(channel.grouped_export),
            yes_no(channel.show_out_of_stock),
        ]);
    }

    println!("{table}");
    println!(
        "Single channel mode: {}, date fields: {}",
        yes_no(config.is_single_channel_mode()),
        config.date_field.label()
    );
    Ok(())
}

fn yes_no(flag: bool) -> String {
    let answer = if flag { "yes" } else { "no" };
    answer.to_string()
}
