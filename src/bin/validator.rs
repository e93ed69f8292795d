//! Content Validator CLI
//!
//! Checks recipe and item integrity, the crafting economy, and regenerates
//! the item metadata lookup.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use content_forge::economy;
use content_forge::metadata;
use content_forge::report;
use content_forge::{load_content, ContentConfig, ContentGraph, Validator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-validator")]
#[command(about = "Validate recipes and items, check economy balance")]
struct Cli {
    /// Config file (defaults to content.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Project root, overrides the configured one
    #[arg(short, long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the integrity checks and write the Markdown report
    Recipes {
        /// Report file (defaults to the configured report path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with status 2 when critical issues are found
        #[arg(long)]
        strict: bool,
    },

    /// Print the recipe level and price distribution
    Economy,

    /// Regenerate the item metadata JSON
    Metadata {
        /// Output file (defaults to the configured metadata path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load(config: &ContentConfig) -> Result<ContentGraph, Box<dyn std::error::Error>> {
    println!("📂 Loading items from {}", config.paths.items_dir().display());
    println!("📂 Loading recipes from {}", config.paths.recipes_dir().display());
    let (graph, summary) = load_content(&config.paths)?;
    println!(
        "  ✅ {} items, {} recipes ({} graph nodes)",
        graph.items().len(),
        graph.recipes().len(),
        graph.node_count()
    );
    if !summary.skipped.is_empty() {
        println!("  ⚠️  {} files skipped (see log)", summary.skipped.len());
    }
    for slug in &summary.shadowed_items {
        println!("  ⚠️  Item slug defined twice: {}", slug);
    }
    println!();
    Ok(graph)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ContentConfig::load_from(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }

    match cli.command {
        Commands::Recipes { output, strict } => {
            let graph = load(&config)?;

            println!("🔍 Running validation checks...");
            let validator = Validator::from_config(&config.validation);
            let result = validator.validate(&graph);
            for (kind, count) in result.counts() {
                println!("  - {}: {}", kind.title(), count);
            }

            let path = output.unwrap_or_else(|| config.paths.report_path());
            let markdown = report::render_markdown(&result, &Local::now());
            report::write_report(&path, &markdown)?;
            println!("\n✅ Report written to {}\n", path.display());
            print!("{}", report::render_summary(&result));

            if strict && result.has_critical() {
                println!("❌ Critical issues found");
                std::process::exit(2);
            }
            Ok(())
        }

        Commands::Economy => {
            let graph = load(&config)?;
            let balance = economy::check_balance(&graph, &config.economy);
            print!("{}", report::render_economy(&balance));
            Ok(())
        }

        Commands::Metadata { output } => {
            let graph = load(&config)?;
            let loot_dir = config.paths.loot_tables_dir();
            println!("🔍 Scanning loot tables in {}", loot_dir.display());

            let table = metadata::build_metadata(&graph, &loot_dir)?;
            let path = output.unwrap_or_else(|| config.paths.metadata_path());
            metadata::write_metadata(&path, &table)?;

            let stats = metadata::stats(&table);
            println!("✅ Generated metadata for {} items", table.len());
            println!("   Written to {}", path.display());
            println!("\n📊 Statistics:");
            println!("  - Harvestable only: {}", stats.harvestable_only);
            println!("  - Craftable only: {}", stats.craftable_only);
            println!("  - Both: {}", stats.both);
            Ok(())
        }
    }
}
