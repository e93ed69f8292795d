//! Economy balance check
//!
//! Looks at how recipes spread over levels and classes, when cross-class
//! (interdependent) recipes start, and how sellable items spread over the
//! configured price bands. Findings are advisory.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::EconomyConfig;
use crate::content::Recipe;
use crate::graph::ContentGraph;

const UNKNOWN_CLASS: &str = "unknown";

/// Recipes at one level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelRow {
    pub level: u32,
    pub count: usize,
    pub min_inputs: Option<u32>,
    pub max_inputs: Option<u32>,
    pub avg_inputs: Option<f64>,
}

/// Sellable items inside one price band
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub label: String,
    pub min: u64,
    pub max: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BalanceIssue {
    /// An early level has no recipe
    EmptyLevel { level: u32 },
    /// An early level has more than one recipe
    CrowdedLevel { level: u32, count: usize },
    /// The first interdependent recipe comes too late
    LateInterdependency { level: u32, name: String },
}

impl fmt::Display for BalanceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLevel { level } => write!(f, "Level {level}: No recipes assigned (should have 1)"),
            Self::CrowdedLevel { level, count } => {
                write!(f, "Level {level}: {count} recipes (should have only 1)")
            }
            Self::LateInterdependency { level, name } => {
                write!(f, "Interdependency starts too late (level {level}, {name})")
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EconomyReport {
    pub total_recipes: usize,
    pub levels: Vec<LevelRow>,
    /// Recipe count per required class
    pub classes: BTreeMap<String, usize>,
    pub interdependent: usize,
    /// Lowest-level interdependent recipe (level, name)
    pub first_interdependent: Option<(u32, String)>,
    pub sellable_items: usize,
    pub prices: Vec<PriceRow>,
    pub level_range: Option<(u32, u32)>,
    pub price_range: Option<(u64, u64)>,
    pub issues: Vec<BalanceIssue>,
}

impl EconomyReport {
    pub fn is_balanced(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Effective level of a recipe; an unset level counts as 1
fn level_of(recipe: &Recipe) -> u32 {
    recipe.required_level.max(1)
}

fn input_total(recipe: &Recipe) -> u32 {
    recipe.inputs.iter().map(|i| i.quantity).sum()
}

fn display_name(recipe: &Recipe) -> String {
    if recipe.name.is_empty() {
        recipe.slug.clone()
    } else {
        recipe.name.clone()
    }
}

pub fn check_balance(graph: &ContentGraph, config: &EconomyConfig) -> EconomyReport {
    let recipes = graph.recipes();
    let mut report = EconomyReport {
        total_recipes: recipes.len(),
        ..Default::default()
    };

    let mut by_level: BTreeMap<u32, Vec<&Recipe>> = BTreeMap::new();
    for recipe in recipes {
        by_level.entry(level_of(recipe)).or_default().push(recipe);
        let class = match recipe.required_class.as_str() {
            "" => UNKNOWN_CLASS,
            c => c,
        };
        *report.classes.entry(class.to_string()).or_default() += 1;
    }

    for level in 1..=config.max_level {
        let at_level = by_level.get(&level).map(Vec::as_slice).unwrap_or(&[]);
        let totals: Vec<u32> = at_level.iter().map(|r| input_total(r)).collect();
        report.levels.push(LevelRow {
            level,
            count: at_level.len(),
            min_inputs: totals.iter().copied().min(),
            max_inputs: totals.iter().copied().max(),
            avg_inputs: (!totals.is_empty())
                .then(|| totals.iter().map(|&t| f64::from(t)).sum::<f64>() / totals.len() as f64),
        });

        if level <= config.single_recipe_levels {
            match at_level.len() {
                0 => report.issues.push(BalanceIssue::EmptyLevel { level }),
                1 => {}
                count => report.issues.push(BalanceIssue::CrowdedLevel { level, count }),
            }
        }
    }

    let mut interdependent: Vec<(u32, String)> = recipes
        .iter()
        .filter(|r| r.folder == config.interdependent_folder)
        .map(|r| (level_of(r), display_name(r)))
        .collect();
    interdependent.sort();
    report.interdependent = interdependent.len();
    report.first_interdependent = interdependent.into_iter().next();
    if let Some((level, name)) = &report.first_interdependent {
        if *level > config.interdependency_start {
            report.issues.push(BalanceIssue::LateInterdependency {
                level: *level,
                name: name.clone(),
            });
        }
    }

    let prices: Vec<u64> = graph
        .items()
        .values()
        .filter(|i| i.can_sell && i.price > 0)
        .map(|i| i.price)
        .collect();
    report.sellable_items = prices.len();
    report.prices = config
        .price_bands
        .iter()
        .map(|band| PriceRow {
            label: band.label.clone(),
            min: band.min,
            max: band.max,
            count: prices.iter().filter(|&&p| band.min <= p && p <= band.max).count(),
        })
        .collect();

    report.level_range = by_level.keys().next().zip(by_level.keys().next_back()).map(|(a, b)| (*a, *b));
    report.price_range = prices.iter().min().zip(prices.iter().max()).map(|(a, b)| (*a, *b));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Item;
    use std::path::Path;

    fn recipe(folder: &str, slug: &str, level: u32, qty: u32) -> Recipe {
        let text = format!(
            "slug = &\"{slug}\"\nrequired_class = \"{folder}\"\nrequired_level = {level}\ninput_1_slug = &\"x\"\ninput_1_quantity = {qty}\noutput_1_slug = &\"y\"\n"
        );
        Recipe::from_text(&text, Path::new(&format!("recipes/{folder}/{slug}.tres")))
    }

    fn item(slug: &str, price: u64, can_sell: bool) -> (String, Item) {
        let text = format!("minimum_price = {price}\ncan_sell = {can_sell}\n");
        (slug.to_string(), Item::from_text(&text, Path::new(&format!("items/materials/{slug}.tres"))))
    }

    fn small_config() -> EconomyConfig {
        EconomyConfig {
            max_level: 4,
            single_recipe_levels: 3,
            ..EconomyConfig::default()
        }
    }

    #[test]
    fn test_level_issues() {
        let recipes = vec![
            recipe("miner", "a", 1, 2),
            recipe("forager", "b", 2, 4),
            recipe("trapper", "c", 2, 6),
        ];
        let graph = ContentGraph::new(BTreeMap::new(), recipes);
        let report = check_balance(&graph, &small_config());

        assert_eq!(report.levels.len(), 4);
        assert_eq!(report.levels[1].count, 2);
        assert_eq!(report.levels[1].min_inputs, Some(4));
        assert_eq!(report.levels[1].avg_inputs, Some(5.0));
        assert_eq!(
            report.issues,
            vec![
                BalanceIssue::CrowdedLevel { level: 2, count: 2 },
                BalanceIssue::EmptyLevel { level: 3 },
            ]
        );
        assert_eq!(report.classes["miner"], 1);
        assert_eq!(report.level_range, Some((1, 2)));
    }

    #[test]
    fn test_late_interdependency() {
        let recipes = vec![
            recipe("interdependent", "late", 7, 1),
            recipe("interdependent", "later", 9, 1),
        ];
        let graph = ContentGraph::new(BTreeMap::new(), recipes);
        let report = check_balance(&graph, &small_config());
        assert_eq!(report.interdependent, 2);
        assert!(report.issues.contains(&BalanceIssue::LateInterdependency {
            level: 7,
            name: "late".to_string()
        }));
    }

    #[test]
    fn test_price_bands_count_sellable_only() {
        let items = BTreeMap::from([
            item("pebble", 3, true),
            item("plank", 12, true),
            item("crown", 1000, true),
            item("quest_key", 40, false),
            item("dust", 0, true),
        ]);
        let graph = ContentGraph::new(items, Vec::new());
        let report = check_balance(&graph, &EconomyConfig::default());

        assert_eq!(report.sellable_items, 3);
        let counts: Vec<usize> = report.prices.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1]);
        assert_eq!(report.price_range, Some((3, 1000)));
    }
}
