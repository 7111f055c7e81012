//! Code generation CLI
//!
//! Reads a saved `$metadata` document and emits one typed record/repository
//! pair per entity set (plus one enum type per schema enum) under the given
//! output directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bc_client::codegen::Generator;
use bc_client::metadata;

#[derive(Parser)]
#[command(
    name = "bc-generate",
    about = "Generate typed records and repositories from a Business Central $metadata document"
)]
struct Args {
    /// Path to the saved $metadata XML document
    #[arg(long)]
    metadata: PathBuf,

    /// Output directory for the generated sources
    #[arg(long)]
    out: PathBuf,

    /// Generate a single entity set instead of all of them
    #[arg(long)]
    entity_set: Option<String>,

    /// Prefix for every generated type name
    #[arg(long, default_value = "")]
    prefix: String,

    /// Regenerate files that already exist
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.metadata.exists() {
        anyhow::bail!("metadata document does not exist: {}", args.metadata.display());
    }

    let xml = fs::read_to_string(&args.metadata).with_context(|| {
        format!("Failed to read metadata document: {}", args.metadata.display())
    })?;

    let parsed = metadata::parse(&xml).context("Failed to parse metadata document")?;
    println!(
        "Parsed schema '{}': {} entity sets, {} enum types",
        parsed.namespace,
        parsed.entity_sets.len(),
        parsed.enum_types.len()
    );

    let generator = Generator::new(&parsed, args.out.clone())
        .prefix(args.prefix)
        .overwrite(args.overwrite);

    let summary = match &args.entity_set {
        Some(set) => generator
            .generate_set(set)
            .with_context(|| format!("Failed to generate entity set '{set}'"))?,
        None => generator.generate_all().context("Failed to generate sources")?,
    };

    for path in &summary.written {
        println!("  wrote     {}", path.display());
    }
    for path in &summary.skipped {
        println!("  preserved {}", path.display());
    }
    println!(
        "Done: {} written, {} preserved",
        summary.written.len(),
        summary.skipped.len()
    );
    Ok(())
}
