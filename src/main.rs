use clap::Parser;
use log::{info, warn};
use pipeline::convert;
use schema::{Schema, Variant};
use std::path::PathBuf;

mod compute;
mod data;
mod pipeline;
mod read;
mod schema;
mod write;

/// Convert a vendor booking export into Odoo invoice import files
#[derive(Parser)]
#[command(name = "bookings2odoo", version)]
struct Cli {
    /// CSV export to convert
    #[arg(short, long)]
    input_file: PathBuf,

    /// Output directory (one file per listing), or output file for single-file schemas
    #[arg(short, long)]
    output: PathBuf,

    /// Built-in target schema
    #[arg(long, value_enum, default_value_t = Variant::Listing)]
    variant: Variant,

    /// JSON schema file, overrides --variant
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let schema = match &cli.schema {
        Some(path) => Schema::from_json(std::fs::File::open(path)?)?,
        None => cli.variant.schema(),
    };
    let summary = convert(&cli.input_file, &cli.output, &schema)?;
    info!(
        "{} rows read, {} invoices in {} files",
        summary.read.rows,
        summary.invoices,
        summary.written.len()
    );
    let skipped = summary.read.malformed + summary.read.rejected;
    if skipped > 0 {
        warn!("{skipped} rows skipped");
    }
    if summary.failed > 0 {
        warn!("{} listings could not be written", summary.failed);
    }
    Ok(())
}
