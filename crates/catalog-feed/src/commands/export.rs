use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_feed_core::{AttributeSetNames, FeedExporter, FeedSummary, RowSource, XmlSink};
use catalog_feed_source::{CsvAttributeSetRepository, CsvRowSource};
use clap::Args;
use tracing::info;

use super::load_config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Feed configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Product rows (CSV, one or more rows per entity, grouped by entity_id)
    #[arg(long)]
    products: PathBuf,
    /// Category rows (CSV, parents before children)
    #[arg(long)]
    categories: PathBuf,
    /// Attribute set names (CSV with attribute_set_id,name)
    #[arg(long)]
    attribute_sets: Option<PathBuf>,
    /// Write the feed to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Indent the XML output
    #[arg(long)]
    pretty: bool,
}

pub fn handle_export(args: ExportArgs) -> Result<()> {
    let config = load_config(args.config)?;

    let attribute_sets = match &args.attribute_sets {
        Some(path) => AttributeSetNames::load(&CsvAttributeSetRepository::new(path.clone()))
            .with_context(|| format!("failed to load attribute sets from {}", path.display()))?,
        None => AttributeSetNames::default(),
    };
    info!(attribute_sets = attribute_sets.len(), "attribute set names loaded");

    let exporter = FeedExporter::new(&config, &attribute_sets);
    let mut products = CsvRowSource::new(args.products);
    let mut categories = CsvRowSource::new(args.categories);

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let summary = write_feed(
                &exporter,
                BufWriter::new(file),
                args.pretty,
                &mut products,
                &mut categories,
            )?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            summary
        }
        None => write_feed(
            &exporter,
            BufWriter::new(io::stdout().lock()),
            args.pretty,
            &mut products,
            &mut categories,
        )?,
    };

    info!(
        products = summary.exported_products(),
        categories = summary.accepted_categories(),
        disabled_channels = summary.disabled_channels.len(),
        "feed export complete"
    );
    Ok(())
}

fn write_feed<W: Write>(
    exporter: &FeedExporter<'_>,
    writer: W,
    pretty: bool,
    products: &mut dyn RowSource,
    categories: &mut dyn RowSource,
) -> Result<FeedSummary> {
    let summary = if pretty {
        let mut sink = XmlSink::pretty(writer);
        exporter.export(&mut sink, products, categories)?
    } else {
        let mut sink = XmlSink::new(writer);
        exporter.export(&mut sink, products, categories)?
    };
    Ok(summary)
}
