//! Report rendering
//!
//! Turns a [`ValidationReport`] into the Markdown document written next to
//! the project, and produces the short console summaries the binaries print.
//! Sections run Critical, then Warning, then Info.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone};

use crate::economy::EconomyReport;
use crate::error::{ContentError, Result};
use crate::validate::{Issue, IssueDetail, IssueKind, Severity, ValidationReport};

/// Breakdown table order
const BREAKDOWN: [IssueKind; 5] = [
    IssueKind::NoInputRecipe,
    IssueKind::ItemWithoutRecipe,
    IssueKind::BrokenReference,
    IssueKind::DuplicateProducer,
    IssueKind::UnusedCraftedItem,
];

/// Section order
const SECTIONS: [IssueKind; 5] = [
    IssueKind::BrokenReference,
    IssueKind::NoInputRecipe,
    IssueKind::DuplicateProducer,
    IssueKind::ItemWithoutRecipe,
    IssueKind::UnusedCraftedItem,
];

fn severity_banner(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴 CRITICAL",
        Severity::Warning => "⚠️ WARNING",
        Severity::Info => "ℹ️ INFO",
    }
}

fn section_blurb(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::BrokenReference => "Recipes referencing non-existent items. These will cause runtime errors!",
        IssueKind::NoInputRecipe => "Recipes that require only gold/energy but no material inputs.",
        IssueKind::DuplicateProducer => {
            "Multiple recipes producing the same item. May cause confusion or balance issues."
        }
        IssueKind::ItemWithoutRecipe => "Craftable items that have no recipe. Excluding raw materials.",
        IssueKind::UnusedCraftedItem => {
            "Items that are crafted but never used as inputs in other recipes. Potential dead ends."
        }
    }
}

/// Render the full Markdown report
pub fn render_markdown<Tz>(report: &ValidationReport, generated: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    out.push_str("# Recipe & Item Validation Report\n\n");
    let _ = writeln!(out, "Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S"));

    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- Total Recipes: {}", report.total_recipes);
    let _ = writeln!(out, "- Total Items: {}", report.total_items);
    let _ = writeln!(out, "- **Total Issues Found: {}**\n", report.total_issues());

    out.push_str("### Issue Breakdown\n\n");
    out.push_str("| Issue Type | Count | Severity |\n");
    out.push_str("|------------|-------|----------|\n");
    for kind in BREAKDOWN {
        let _ = writeln!(out, "| {} | {} | {} |", kind.title(), report.count(kind), kind.severity());
    }
    out.push('\n');

    for kind in SECTIONS {
        let mut issues = report.of_kind(kind).peekable();
        if issues.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "\n## {}: {}\n", severity_banner(kind.severity()), kind.title());
        let _ = writeln!(out, "{}\n", section_blurb(kind));
        for issue in issues {
            render_issue(&mut out, issue);
            out.push('\n');
        }
    }
    out
}

fn render_issue(out: &mut String, issue: &Issue) {
    match &issue.detail {
        IssueDetail::BrokenReferences { missing } => {
            let _ = writeln!(out, "### {}\n", heading(issue));
            let _ = writeln!(out, "- **Path:** `{}`", issue.path.display());
            let _ = writeln!(out, "- **Slug:** `{}`", issue.slug);
            out.push_str("- **Broken References:**\n");
            for m in missing {
                match &m.suggestion {
                    Some(s) => {
                        let _ = writeln!(out, "  - {}: {} (did you mean `{s}`?)", m.role, m.slug);
                    }
                    None => {
                        let _ = writeln!(out, "  - {}: {}", m.role, m.slug);
                    }
                }
            }
        }
        IssueDetail::NoInputs { gold_cost, energy_cost } => {
            let _ = writeln!(out, "### {}\n", heading(issue));
            let _ = writeln!(out, "- **Path:** `{}`", issue.path.display());
            let _ = writeln!(out, "- **Slug:** `{}`", issue.slug);
            let _ = writeln!(out, "- **Cost:** {gold_cost} gold, {energy_cost} energy");
        }
        IssueDetail::DuplicateProducers { recipes } => {
            let _ = writeln!(out, "### Item: {} ({} recipes)\n", issue.slug, recipes.len());
            for r in recipes {
                let _ = writeln!(out, "- **{}** (ID: {})", or_slug(&r.name, &r.slug), r.id);
                let _ = writeln!(out, "  - Path: `{}`", r.path.display());
                let _ = writeln!(out, "  - Class: {}, Level: {}", r.class, r.level);
            }
        }
        IssueDetail::WithoutRecipe { tags } => {
            let _ = writeln!(out, "### {}\n", heading(issue));
            let _ = writeln!(out, "- **Slug:** `{}`", issue.slug);
            let _ = writeln!(out, "- **Path:** `{}`", issue.path.display());
            let tags = if tags.is_empty() { "(none)".to_string() } else { tags.join(", ") };
            let _ = writeln!(out, "- **Tags:** {tags}");
        }
        IssueDetail::UnusedCrafted { recipe_count, recipes } => {
            let _ = writeln!(out, "### Item: {}\n", issue.slug);
            let _ = writeln!(out, "- **Produced by {recipe_count} recipe(s):**");
            for r in recipes {
                let _ = writeln!(
                    out,
                    "  - {} (ID: {}) - `{}`",
                    or_slug(&r.name, &r.slug),
                    r.id,
                    r.path.display()
                );
            }
        }
    }
}

fn heading(issue: &Issue) -> &str {
    or_slug(&issue.name, &issue.slug)
}

fn or_slug<'a>(name: &'a str, slug: &'a str) -> &'a str {
    if name.is_empty() {
        slug
    } else {
        name
    }
}

/// Write a rendered report, creating parent directories
pub fn write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text).map_err(|source| ContentError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Count-based console summary
pub fn render_summary(report: &ValidationReport) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    out.push_str("QUICK SUMMARY:\n");
    let _ = writeln!(out, "- Total Recipes: {}", report.total_recipes);
    let _ = writeln!(out, "- Total Items: {}", report.total_items);
    let _ = writeln!(out, "- Total Issues: {}\n", report.total_issues());
    for kind in BREAKDOWN {
        let _ = writeln!(out, "  - {}: {}", kind.title(), report.count(kind));
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// Console rendering of an economy balance check
pub fn render_economy(report: &EconomyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Recipe Distribution:");
    let _ = writeln!(out, "{:<8} {:<8} {:<12} {:<12} {:<12}", "Level", "Count", "Min Inputs", "Max Inputs", "Avg Inputs");
    let _ = writeln!(out, "{}", "-".repeat(60));
    for row in &report.levels {
        let level = format!("L{}", row.level);
        match (row.min_inputs, row.max_inputs, row.avg_inputs) {
            (Some(min), Some(max), Some(avg)) => {
                let _ = writeln!(out, "{level:<8} {:<8} {min:<12} {max:<12} {avg:<12.1}", row.count);
            }
            _ => {
                let _ = writeln!(out, "{level:<8} {:<8} {:<12} {:<12} {:<12}", 0, "-", "-", "-");
            }
        }
    }

    let _ = writeln!(out, "\n👥 Class Distribution:");
    for (class, count) in &report.classes {
        let _ = writeln!(out, "  {class:<15}: {count:>3} recipes");
    }

    let _ = writeln!(out, "\n🔗 Interdependent recipes: {}", report.interdependent);
    if let Some((level, name)) = &report.first_interdependent {
        let _ = writeln!(out, "  First interdependent at level {level}: {name}");
    }

    let _ = writeln!(out, "\n💵 Price Distribution ({} sellable items):", report.sellable_items);
    for band in report.prices.iter().filter(|b| b.count > 0) {
        let _ = writeln!(out, "  {:<15} ({:>3}-{:>4}g): {:>3} items", band.label, band.min, band.max, band.count);
    }

    let rule = "=".repeat(70);
    let _ = writeln!(out, "\n{rule}");
    if report.issues.is_empty() {
        let _ = writeln!(out, "✅ NO MAJOR ISSUES FOUND");
    } else {
        let _ = writeln!(out, "⚠️  ISSUES FOUND:");
        for issue in &report.issues {
            let _ = writeln!(out, "  - {issue}");
        }
    }
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\n📈 Summary:");
    let _ = writeln!(out, "  Total Recipes: {}", report.total_recipes);
    if let Some((lo, hi)) = report.level_range {
        let _ = writeln!(out, "  Level Range: {lo} - {hi}");
    }
    let _ = writeln!(out, "  Sellable Items: {}", report.sellable_items);
    if let Some((lo, hi)) = report.price_range {
        let _ = writeln!(out, "  Price Range: {lo}g - {hi}g");
    }
    out
}
