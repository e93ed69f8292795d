//! Production graph
//!
//! Items and recipes form a bipartite directed graph: an edge runs from each
//! consumed item into the recipe and from the recipe to each produced item.
//! Slugs referenced by recipes but missing from the item set still get a node,
//! so dangling references stay visible to the validator.
//!
//! The graph is built once from a loaded item map and recipe list and never
//! mutated afterwards; every validation run rebuilds it.

pub mod loader;

pub use loader::{load_content, load_items, load_recipes, LoadSummary};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::content::{Item, Recipe};

/// Node weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Item(String),
    /// Index into [`ContentGraph::recipes`]
    Recipe(usize),
}

/// Edge weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// item -> recipe
    Consumes { quantity: u32 },
    /// recipe -> item
    Produces { quantity: u32 },
}

/// Loaded content plus the derived production graph
#[derive(Debug, Clone)]
pub struct ContentGraph {
    items: BTreeMap<String, Item>,
    recipes: Vec<Recipe>,
    graph: DiGraph<Node, Edge>,
    item_nodes: HashMap<String, NodeIndex>,
}

impl ContentGraph {
    /// Build the graph. `recipes` must be in discovery order; recipe ids are
    /// derived from it.
    pub fn new(items: BTreeMap<String, Item>, recipes: Vec<Recipe>) -> Self {
        let mut graph = DiGraph::with_capacity(items.len() + recipes.len(), recipes.len() * 4);
        let mut item_nodes = HashMap::with_capacity(items.len());

        for slug in items.keys() {
            let idx = graph.add_node(Node::Item(slug.clone()));
            item_nodes.insert(slug.clone(), idx);
        }

        for (index, recipe) in recipes.iter().enumerate() {
            let recipe_idx = graph.add_node(Node::Recipe(index));

            for input in recipe.effective_inputs() {
                let item_idx = *item_nodes
                    .entry(input.slug.clone())
                    .or_insert_with(|| graph.add_node(Node::Item(input.slug.clone())));
                graph.add_edge(item_idx, recipe_idx, Edge::Consumes { quantity: input.quantity });
            }

            for output in recipe.effective_outputs() {
                let item_idx = *item_nodes
                    .entry(output.slug.clone())
                    .or_insert_with(|| graph.add_node(Node::Item(output.slug.clone())));
                graph.add_edge(recipe_idx, item_idx, Edge::Produces { quantity: output.quantity });
            }
        }

        Self {
            items,
            recipes,
            graph,
            item_nodes,
        }
    }

    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn item(&self, slug: &str) -> Option<&Item> {
        self.items.get(slug)
    }

    pub fn contains_item(&self, slug: &str) -> bool {
        self.items.contains_key(slug)
    }

    /// Sequential 1-based id of the recipe at `index`
    pub fn recipe_id(index: usize) -> usize {
        index + 1
    }

    /// Indices of recipes producing `slug`, ascending
    pub fn producers(&self, slug: &str) -> Vec<usize> {
        self.recipe_neighbors(slug, Direction::Incoming)
    }

    /// Indices of recipes consuming `slug`, ascending
    pub fn consumers(&self, slug: &str) -> Vec<usize> {
        self.recipe_neighbors(slug, Direction::Outgoing)
    }

    /// Every slug some recipe produces, including unknown ones
    pub fn produced_slugs(&self) -> BTreeSet<&str> {
        self.slugs_with_edges(Direction::Incoming)
    }

    /// Every slug some recipe consumes, including unknown ones
    pub fn consumed_slugs(&self) -> BTreeSet<&str> {
        self.slugs_with_edges(Direction::Outgoing)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn recipe_neighbors(&self, slug: &str, dir: Direction) -> Vec<usize> {
        let Some(&idx) = self.item_nodes.get(slug) else {
            return Vec::new();
        };
        let mut recipes: Vec<usize> = self
            .graph
            .neighbors_directed(idx, dir)
            .filter_map(|n| match self.graph[n] {
                Node::Recipe(i) => Some(i),
                Node::Item(_) => None,
            })
            .collect();
        recipes.sort_unstable();
        recipes.dedup();
        recipes
    }

    fn slugs_with_edges(&self, dir: Direction) -> BTreeSet<&str> {
        self.item_nodes
            .iter()
            .filter(|(_, &idx)| self.graph.neighbors_directed(idx, dir).next().is_some())
            .map(|(slug, _)| slug.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn item(slug: &str) -> Item {
        Item::from_text("", Path::new(&format!("materials/{slug}.tres")))
    }

    fn recipe(slug: &str, inputs: &[&str], output: &str) -> Recipe {
        let mut text = format!("slug = &\"{slug}\"\noutput_1_slug = &\"{output}\"\noutput_1_quantity = 1\n");
        for (i, input) in inputs.iter().enumerate() {
            text.push_str(&format!("input_{n}_slug = &\"{input}\"\ninput_{n}_quantity = 1\n", n = i + 1));
        }
        Recipe::from_text(&text, Path::new(&format!("miner/{slug}.tres")))
    }

    #[test]
    fn test_producers_and_consumers() {
        let items = ["ore", "ingot", "sword"]
            .into_iter()
            .map(|s| (s.to_string(), item(s)))
            .collect();
        let recipes = vec![
            recipe("ingot_recipe", &["ore"], "ingot"),
            recipe("sword_recipe", &["ingot", "ingot"], "sword"),
        ];
        let graph = ContentGraph::new(items, recipes);

        assert_eq!(graph.producers("ingot"), vec![0]);
        assert_eq!(graph.consumers("ingot"), vec![1]);
        assert!(graph.producers("ore").is_empty());
        assert_eq!(graph.produced_slugs(), BTreeSet::from(["ingot", "sword"]));
        assert_eq!(graph.consumed_slugs(), BTreeSet::from(["ingot", "ore"]));
    }

    #[test]
    fn test_unknown_slugs_get_nodes() {
        let graph = ContentGraph::new(BTreeMap::new(), vec![recipe("r", &["ghost"], "phantom")]);
        assert!(!graph.contains_item("ghost"));
        assert_eq!(graph.consumers("ghost"), vec![0]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }
}
