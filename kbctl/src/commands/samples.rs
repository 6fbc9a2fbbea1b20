use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kustomize_builder::config::DEFAULT_SAMPLES_DIR;
use kustomize_builder::SampleCatalog;
use tabled::{settings::style::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory holding example kustomizations
    #[arg(long, env = "KB_SAMPLES_DIR", default_value = DEFAULT_SAMPLES_DIR)]
    pub dir: PathBuf,

    /// Output machine-readable JSON
    #[arg(long, action)]
    pub json: bool,
}

#[derive(Debug, Tabled)]
struct SampleRow {
    #[tabled(rename = "FILE")]
    filename: String,
    #[tabled(rename = "NAME")]
    display_name: String,
}

pub fn list(args: ListArgs) -> Result<()> {
    let catalog = SampleCatalog::new(&args.dir);
    let samples = catalog
        .list()
        .with_context(|| format!("listing samples in {}", args.dir.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "samples": samples }))?
        );
        return Ok(());
    }

    if samples.is_empty() {
        println!("No samples found in {}.", args.dir.display());
        return Ok(());
    }

    let rows: Vec<SampleRow> = samples
        .into_iter()
        .map(|sample| SampleRow {
            filename: sample.filename,
            display_name: sample.display_name,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    Ok(())
}
