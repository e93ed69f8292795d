//! Content Registry CLI
//!
//! Writes to the content tree: item creation, registry rebuilds, slug renames
//! and `_new` migrations, recipe folder removal, and restores from backups.
//! Every writing command takes `--dry-run` to print the planned changes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use content_forge::backup;
use content_forge::create;
use content_forge::index::{self, IndexSummary};
use content_forge::migrate;
use content_forge::seed;
use content_forge::ContentConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-registry")]
#[command(about = "Maintain item and recipe registries")]
struct Cli {
    /// Config file (defaults to content.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Project root, overrides the configured one
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Show what would change without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing items from a seed file and register them
    CreateItems {
        /// TOML file with [[item]] tables
        #[arg(default_value = "data/missing_items.toml")]
        seeds: PathBuf,
    },

    /// Rebuild the recipes registry from a seed file
    RebuildIndex {
        /// TOML file with keep_through and [[recipe]] tables
        #[arg(default_value = "data/recipe_index.toml")]
        seeds: PathBuf,
    },

    /// Replace every `<slug>_new` item with its clean-named version
    Migrate,

    /// Rename one item slug in the registry and all recipes
    Rename {
        old: String,
        new: String,
    },

    /// Delete a duplicate recipe folder and its registry entries
    Dedupe {
        /// Folder under the recipes tree
        #[arg(default_value = "tier1")]
        folder: String,
    },

    /// Copy files from a backup directory back into the project
    Restore {
        /// Backup directory (one operation's snapshot)
        backup: PathBuf,

        /// Target directory (defaults to the project root)
        #[arg(short, long)]
        into: Option<PathBuf>,
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

fn print_diff(diff: Option<&str>) {
    match diff {
        Some(d) if !d.is_empty() => print!("{}", d),
        _ => println!("  (registry unchanged)"),
    }
}

fn print_index_summary(summary: &IndexSummary, dry_run: bool) {
    if dry_run {
        println!("🔍 Dry run, nothing written\n");
        print_diff(summary.registry_diff.as_deref());
        println!();
    }
    println!("  Kept: {}", summary.kept);
    if summary.added > 0 {
        println!("  Added: {}", summary.added);
    }
    for entry in &summary.removed {
        println!("  ❌ Unregistered: {} (ID: {})", entry.slug, entry.id);
    }
    for file in &summary.deleted_files {
        println!("  🗑️  {}", file.display());
    }
    println!("  Next ID: {}", summary.next_id);
    if let Some(dir) = &summary.backup_dir {
        println!("\n💾 Backup: {}", dir.display());
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ContentConfig::load_from(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::CreateItems { seeds } => {
            let seeds = seed::load_item_seeds(&seeds)?;
            println!("📦 Creating up to {} items...\n", seeds.len());

            let summary = create::create_items(&config, &seeds, dry_run)?;
            for slug in &summary.skipped {
                println!("  ⏭️  SKIP: {} already exists", slug);
            }
            for (slug, file) in &summary.created {
                println!("  ✅ {}: {}", slug, file.display());
            }
            if dry_run {
                println!("\n🔍 Dry run, nothing written\n");
                print_diff(summary.registry_diff.as_deref());
            }

            println!("\n{}", "=".repeat(60));
            println!("✅ Created: {}", summary.created.len());
            println!("⏭️  Skipped: {}", summary.skipped.len());
            println!("📋 Registered: {}", summary.registered.len());
            if let Some(dir) = &summary.backup_dir {
                println!("💾 Backup: {}", dir.display());
            }
            Ok(())
        }

        Commands::RebuildIndex { seeds } => {
            let seed = seed::load_index_seed(&seeds)?;
            match seed.keep_through {
                Some(cutoff) => println!("🔧 Rebuilding recipes index (keeping IDs 1-{})...\n", cutoff),
                None => println!("🔧 Rebuilding recipes index from scratch...\n"),
            }
            let summary = index::rebuild_recipe_index(&config, &seed, dry_run)?;
            print_index_summary(&summary, dry_run);
            Ok(())
        }

        Commands::Migrate => {
            println!("🔍 Scanning for _new items in {}\n", config.paths.items_dir().display());
            let summary = migrate::migrate_items(&config, dry_run)?;
            if summary.migrations.is_empty() {
                println!("✅ No _new items found");
                return Ok(());
            }

            for m in &summary.migrations {
                match &m.old_file {
                    Some(_) => println!("  🔄 {} -> {} (replaces existing)", m.new_stem, m.clean_name),
                    None => println!("  🔄 {} -> {}", m.new_stem, m.clean_name),
                }
            }
            println!();

            if let Some(preview) = &summary.preview {
                println!("🔍 Dry run, nothing written\n");
                print!("{}", preview);
            }
            if let Some(outcome) = &summary.outcome {
                println!("✅ Migrated {} items", summary.migrations.len());
                println!("  Registry entries updated: {}", outcome.registry_entries);
                println!("  Recipes updated: {}", outcome.recipes.len());
                println!("💾 Backup: {}", outcome.backup_dir.display());
            }
            Ok(())
        }

        Commands::Rename { old, new } => {
            println!("🔄 Renaming {} -> {}\n", old, new);
            let summary = migrate::rename_slug(&config, &old, &new, dry_run)?;
            println!("  Registry entries: {}", summary.registry_entries);
            println!("  Recipes: {}", summary.recipes.len());
            for path in &summary.recipes {
                println!("    - {}", path.display());
            }

            if let Some(preview) = &summary.preview {
                println!("\n🔍 Dry run, nothing written\n");
                print!("{}", preview);
            }
            if let Some(outcome) = &summary.outcome {
                println!("\n✅ Rename complete");
                println!("💾 Backup: {}", outcome.backup_dir.display());
            }
            Ok(())
        }

        Commands::Dedupe { folder } => {
            println!("🗑️  Removing recipes in folder {}\n", folder);
            let summary = index::remove_recipe_folder(&config, &folder, dry_run)?;
            print_index_summary(&summary, dry_run);
            Ok(())
        }

        Commands::Restore { backup: from, into } => {
            let target = into.unwrap_or_else(|| config.paths.root.clone());
            println!("♻️  Restoring {} into {}\n", from.display(), target.display());
            if dry_run {
                println!("🔍 Dry run, nothing written");
                return Ok(());
            }
            let restored = backup::restore_tree(&from, &target)?;
            println!("✅ Restored {} files", restored.len());
            Ok(())
        }
    }
}
