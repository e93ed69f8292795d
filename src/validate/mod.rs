//! Recipe & Item Integrity Validation
//!
//! Runs a fixed battery of checks over one [`ContentGraph`] snapshot:
//!
//! 1. **Broken references** (critical): a recipe input or output names an item
//!    that does not exist.
//! 2. **No-input recipes** (warning): nothing is consumed once zero-quantity
//!    slots are dropped.
//! 3. **Duplicate producers** (warning): more than one recipe shares a primary
//!    output.
//! 4. **Items without recipes** (info): nothing produces the item and it is
//!    not a raw material.
//! 5. **Unused crafted items** (info): produced but never consumed.
//!
//! Findings are data, not errors. Every check always runs to completion and
//! the result is deterministic for an unchanged content tree.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::content::{Item, Recipe};
use crate::graph::ContentGraph;

/// Issue severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// The five issue classes, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    BrokenReference,
    NoInputRecipe,
    DuplicateProducer,
    ItemWithoutRecipe,
    UnusedCraftedItem,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::BrokenReference,
        IssueKind::NoInputRecipe,
        IssueKind::DuplicateProducer,
        IssueKind::ItemWithoutRecipe,
        IssueKind::UnusedCraftedItem,
    ];

    pub fn severity(&self) -> Severity {
        match self {
            Self::BrokenReference => Severity::Critical,
            Self::NoInputRecipe | Self::DuplicateProducer => Severity::Warning,
            Self::ItemWithoutRecipe | Self::UnusedCraftedItem => Severity::Info,
        }
    }

    /// Heading used in reports
    pub fn title(&self) -> &'static str {
        match self {
            Self::BrokenReference => "Broken Recipe References",
            Self::NoInputRecipe => "Recipes with No Inputs",
            Self::DuplicateProducer => "Duplicate Recipes",
            Self::ItemWithoutRecipe => "Items Without Recipes",
            Self::UnusedCraftedItem => "Unused Crafted Items",
        }
    }
}

/// Which side of a recipe a reference sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefRole {
    Input,
    Output,
}

impl fmt::Display for RefRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// An unresolved recipe reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReference {
    pub role: RefRole,
    pub slug: String,
    /// Closest existing item slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Identifying fields of a recipe, for issues that list several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    /// Sequential id in discovery order, starting at 1
    pub id: usize,
    pub name: String,
    pub slug: String,
    pub class: String,
    pub level: u32,
    pub path: PathBuf,
}

impl RecipeSummary {
    fn new(index: usize, recipe: &Recipe) -> Self {
        Self {
            id: ContentGraph::recipe_id(index),
            name: recipe.name.clone(),
            slug: recipe.slug.clone(),
            class: recipe.required_class.clone(),
            level: recipe.required_level,
            path: recipe.path.clone(),
        }
    }
}

/// Kind-specific payload of an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueDetail {
    BrokenReferences { missing: Vec<MissingReference> },
    NoInputs { gold_cost: u64, energy_cost: f64 },
    DuplicateProducers { recipes: Vec<RecipeSummary> },
    WithoutRecipe { tags: Vec<String> },
    UnusedCrafted { recipe_count: usize, recipes: Vec<RecipeSummary> },
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Human name of the recipe or item
    pub name: String,
    pub slug: String,
    pub path: PathBuf,
    pub detail: IssueDetail,
}

impl Issue {
    fn new(kind: IssueKind, name: String, slug: String, path: PathBuf, detail: IssueDetail) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            name,
            slug,
            path,
            detail,
        }
    }
}

/// Everything one validation run found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_recipes: usize,
    pub total_items: usize,
    /// Grouped by kind in [`IssueKind::ALL`] order
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn total_issues(&self) -> usize {
        self.issues.len()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// Issue count per kind, in report order
    pub fn counts(&self) -> Vec<(IssueKind, usize)> {
        IssueKind::ALL.iter().map(|&k| (k, self.count(k))).collect()
    }
}

/// Raw-material exemption for the items-without-recipes check.
///
/// An item is raw if it carries any listed tag OR its slug ends with any
/// listed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMaterialPolicy {
    pub tags: Vec<String>,
    pub suffixes: Vec<String>,
}

impl RawMaterialPolicy {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            tags: config.raw_material_tags.clone(),
            suffixes: config.raw_material_suffixes.clone(),
        }
    }

    pub fn is_raw(&self, item: &Item) -> bool {
        item.tags.iter().any(|t| self.tags.contains(t))
            || self.suffixes.iter().any(|s| item.slug.ends_with(s.as_str()))
    }
}

impl Default for RawMaterialPolicy {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

/// The integrity validator
pub struct Validator {
    raw: RawMaterialPolicy,
    matcher: SkimMatcherV2,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(RawMaterialPolicy::default())
    }
}

impl Validator {
    pub fn new(raw: RawMaterialPolicy) -> Self {
        Self {
            raw,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(RawMaterialPolicy::from_config(config))
    }

    /// Run every check against `graph`
    pub fn validate(&self, graph: &ContentGraph) -> ValidationReport {
        let mut issues = Vec::new();
        issues.extend(self.broken_references(graph));
        issues.extend(self.no_input_recipes(graph));
        issues.extend(self.duplicate_producers(graph));
        issues.extend(self.items_without_recipes(graph));
        issues.extend(self.unused_crafted_items(graph));

        ValidationReport {
            total_recipes: graph.recipes().len(),
            total_items: graph.items().len(),
            issues,
        }
    }

    pub fn no_input_recipes(&self, graph: &ContentGraph) -> Vec<Issue> {
        graph
            .recipes()
            .iter()
            .filter(|r| r.effective_inputs().next().is_none())
            .map(|r| {
                Issue::new(
                    IssueKind::NoInputRecipe,
                    r.name.clone(),
                    r.slug.clone(),
                    r.path.clone(),
                    IssueDetail::NoInputs {
                        gold_cost: r.gold_cost,
                        energy_cost: r.energy_cost,
                    },
                )
            })
            .collect()
    }

    pub fn broken_references(&self, graph: &ContentGraph) -> Vec<Issue> {
        let mut issues = Vec::new();
        for recipe in graph.recipes() {
            // Every input slot with a slug counts, zero quantity or not
            let refs = recipe
                .inputs
                .iter()
                .map(|i| (RefRole::Input, i))
                .chain(recipe.effective_outputs().map(|o| (RefRole::Output, o)));

            let mut missing: Vec<MissingReference> = Vec::new();
            for (role, ingredient) in refs {
                if graph.contains_item(&ingredient.slug)
                    || missing.iter().any(|m| m.slug == ingredient.slug)
                {
                    continue;
                }
                missing.push(MissingReference {
                    role,
                    slug: ingredient.slug.clone(),
                    suggestion: self.suggest(graph, &ingredient.slug),
                });
            }

            if !missing.is_empty() {
                issues.push(Issue::new(
                    IssueKind::BrokenReference,
                    recipe.name.clone(),
                    recipe.slug.clone(),
                    recipe.path.clone(),
                    IssueDetail::BrokenReferences { missing },
                ));
            }
        }
        issues
    }

    pub fn duplicate_producers(&self, graph: &ContentGraph) -> Vec<Issue> {
        let mut by_output: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, recipe) in graph.recipes().iter().enumerate() {
            if let Some(output) = recipe.primary_output() {
                by_output.entry(output).or_default().push(index);
            }
        }

        by_output
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(slug, indices)| {
                let recipes: Vec<RecipeSummary> = indices
                    .iter()
                    .map(|&i| RecipeSummary::new(i, &graph.recipes()[i]))
                    .collect();
                let path = recipes[0].path.clone();
                Issue::new(
                    IssueKind::DuplicateProducer,
                    display_name(graph, slug),
                    slug.to_string(),
                    path,
                    IssueDetail::DuplicateProducers { recipes },
                )
            })
            .collect()
    }

    pub fn unused_crafted_items(&self, graph: &ContentGraph) -> Vec<Issue> {
        let consumed = graph.consumed_slugs();
        graph
            .produced_slugs()
            .into_iter()
            .filter(|slug| !consumed.contains(slug))
            .map(|slug| {
                let recipes: Vec<RecipeSummary> = graph
                    .producers(slug)
                    .into_iter()
                    .map(|i| RecipeSummary::new(i, &graph.recipes()[i]))
                    .collect();
                let path = graph
                    .item(slug)
                    .map(|item| item.path.clone())
                    .unwrap_or_default();
                Issue::new(
                    IssueKind::UnusedCraftedItem,
                    display_name(graph, slug),
                    slug.to_string(),
                    path,
                    IssueDetail::UnusedCrafted {
                        recipe_count: recipes.len(),
                        recipes,
                    },
                )
            })
            .collect()
    }

    pub fn items_without_recipes(&self, graph: &ContentGraph) -> Vec<Issue> {
        graph
            .items()
            .values()
            .filter(|item| graph.producers(&item.slug).is_empty())
            .filter(|item| !self.raw.is_raw(item))
            .map(|item| {
                Issue::new(
                    IssueKind::ItemWithoutRecipe,
                    item.name.clone(),
                    item.slug.clone(),
                    item.path.clone(),
                    IssueDetail::WithoutRecipe {
                        tags: item.tags.clone(),
                    },
                )
            })
            .collect()
    }

    /// Best fuzzy match among known item slugs, in either direction
    fn suggest(&self, graph: &ContentGraph, missing: &str) -> Option<String> {
        let mut best: Option<(i64, &str)> = None;
        for slug in graph.items().keys() {
            let score = self
                .matcher
                .fuzzy_match(slug, missing)
                .max(self.matcher.fuzzy_match(missing, slug));
            if let Some(score) = score {
                if best.map(|(b, _)| score > b).unwrap_or(true) {
                    best = Some((score, slug));
                }
            }
        }
        best.map(|(_, slug)| slug.to_string())
    }
}

fn display_name(graph: &ContentGraph, slug: &str) -> String {
    graph
        .item(slug)
        .map(|item| item.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn item(slug: &str, tags: &[&str]) -> (String, Item) {
        let tags = tags.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(", ");
        let text = format!("item_name = &\"{slug}\"\ntags = [{tags}]\n");
        (slug.to_string(), Item::from_text(&text, Path::new(&format!("items/materials/{slug}.tres"))))
    }

    fn recipe(slug: &str, class: &str, level: u32, inputs: &[(&str, u32)], output: &str) -> Recipe {
        let mut text = format!(
            "slug = &\"{slug}\"\nrecipe_name = &\"{slug}\"\nrequired_class = \"{class}\"\nrequired_level = {level}\noutput_1_slug = &\"{output}\"\noutput_1_quantity = 1\n"
        );
        for (i, (input, qty)) in inputs.iter().enumerate() {
            text.push_str(&format!("input_{n}_slug = &\"{input}\"\ninput_{n}_quantity = {qty}\n", n = i + 1));
        }
        Recipe::from_text(&text, Path::new(&format!("recipes/{class}/{slug}.tres")))
    }

    #[test]
    fn test_all_zero_inputs_flagged_once() {
        let items = BTreeMap::from([item("flour", &[]), item("bread", &[])]);
        let graph = ContentGraph::new(items, vec![recipe("bread_recipe", "forager", 1, &[("flour", 0)], "bread")]);
        let issues = Validator::default().no_input_recipes(&graph);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_broken_reference_once_per_slug() {
        let items = BTreeMap::from([item("bread", &[])]);
        let graph = ContentGraph::new(
            items,
            vec![recipe("r", "forager", 1, &[("flour", 1), ("flour", 2), ("salt", 1)], "bread")],
        );
        let issues = Validator::default().broken_references(&graph);
        assert_eq!(issues.len(), 1);
        let IssueDetail::BrokenReferences { missing } = &issues[0].detail else {
            panic!("wrong detail");
        };
        let slugs: Vec<_> = missing.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, ["flour", "salt"]);
        assert_eq!(issues[0].path, PathBuf::from("recipes/forager/r.tres"));
    }

    #[test]
    fn test_zero_quantity_input_still_checked() {
        let items = BTreeMap::from([item("bread", &[])]);
        let graph = ContentGraph::new(items, vec![recipe("bread_recipe", "forager", 1, &[("ghost_flour", 0)], "bread")]);
        let validator = Validator::default();

        let broken = validator.broken_references(&graph);
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].severity, Severity::Critical);
        let IssueDetail::BrokenReferences { missing } = &broken[0].detail else {
            panic!("wrong detail");
        };
        assert_eq!(missing[0].slug, "ghost_flour");
        assert_eq!(missing[0].role, RefRole::Input);
        assert_eq!(validator.no_input_recipes(&graph).len(), 1);
    }

    #[test]
    fn test_unused_crafted_counts_producers() {
        let items = BTreeMap::from([item("ore", &["ore"]), item("ingot", &[]), item("nails", &[])]);
        let graph = ContentGraph::new(
            items,
            vec![
                recipe("ingot_recipe", "miner", 1, &[("ore", 1)], "ingot"),
                recipe("nails_a", "miner", 2, &[("ingot", 1)], "nails"),
                recipe("nails_b", "miner", 3, &[("ingot", 2)], "nails"),
            ],
        );
        let issues = Validator::default().unused_crafted_items(&graph);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].slug, "nails");
        let IssueDetail::UnusedCrafted { recipe_count, recipes } = &issues[0].detail else {
            panic!("wrong detail");
        };
        assert_eq!(*recipe_count, 2);
        let ids: Vec<usize> = recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_duplicate_producers_group() {
        let items = BTreeMap::from([item("ore", &["ore"]), item("ingot", &[])]);
        let graph = ContentGraph::new(
            items,
            vec![
                recipe("ingot_a", "miner", 2, &[("ore", 1)], "ingot"),
                recipe("ingot_b", "trapper", 5, &[("ore", 2)], "ingot"),
            ],
        );
        let issues = Validator::default().duplicate_producers(&graph);
        assert_eq!(issues.len(), 1);
        let IssueDetail::DuplicateProducers { recipes } = &issues[0].detail else {
            panic!("wrong detail");
        };
        assert_eq!(recipes[0].id, 1);
        assert_eq!(recipes[0].class, "miner");
        assert_eq!(recipes[0].level, 2);
        assert_eq!(recipes[1].id, 2);
        assert_eq!(recipes[1].class, "trapper");
        assert_eq!(recipes[1].level, 5);
    }

    #[test]
    fn test_raw_material_exemption() {
        let policy = RawMaterialPolicy::default();
        assert!(policy.is_raw(&item("stone", &["ore"]).1));
        assert!(policy.is_raw(&item("iron_ore", &[]).1));
        assert!(!policy.is_raw(&item("ore_crusher", &[]).1));
        assert!(!policy.is_raw(&item("lantern", &["light"]).1));
    }

    #[test]
    fn test_suggestion_for_renamed_slug() {
        let items = BTreeMap::from([item("grapes", &[]), item("wine", &[])]);
        let graph = ContentGraph::new(items, vec![recipe("wine_recipe", "forager", 3, &[("grapes_new", 2)], "wine")]);
        let issues = Validator::default().broken_references(&graph);
        let IssueDetail::BrokenReferences { missing } = &issues[0].detail else {
            panic!("wrong detail");
        };
        assert_eq!(missing[0].suggestion.as_deref(), Some("grapes"));
    }
}
