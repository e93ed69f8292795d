//! Resource record reader
//!
//! Content records are hand-edited `.tres` resource files: a bracketed header
//! followed by `key = value` lines, with the occasional array or dictionary
//! literal. This module is a tolerant field scanner over that format, not a
//! parser. Each field in a [`FieldSpec`] table is looked up independently and
//! in any order; a missing or malformed field resolves to its documented
//! default instead of failing:
//!
//! | kind          | default |
//! |---------------|---------|
//! | `Text`        | `""`    |
//! | `StringName`  | `""`    |
//! | `Int`/`Float` | `0`     |
//! | `List`        | `[]`    |
//! | `Bool`        | `false` |

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ContentError, Result};

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"&?"((?:[^"\\]|\\.)*)""#).expect("static regex"));

static SCRIPT_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"script_class="([^"]*)""#).expect("static regex"));

/// How a field's raw text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain quoted string: `description = "..."`
    Text,
    /// Interned name token: `item_name = &"Iron Ore"`
    StringName,
    Int,
    Float,
    /// `tags = ["a", "b"]` or `Array[StringName]([&"a", &"b"])`
    List,
    Bool,
}

/// A field to extract from a record
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Fields read from item records
pub const ITEM_FIELDS: &[FieldSpec] = &[
    field("item_name", FieldKind::StringName),
    field("description", FieldKind::Text),
    field("minimum_price", FieldKind::Int),
    field("can_trade", FieldKind::Bool),
    field("can_sell", FieldKind::Bool),
    field("stack_limit", FieldKind::Int),
    field("tags", FieldKind::List),
];

/// Fields read from recipe records
pub const RECIPE_FIELDS: &[FieldSpec] = &[
    field("slug", FieldKind::StringName),
    field("recipe_name", FieldKind::StringName),
    field("description", FieldKind::Text),
    field("required_class", FieldKind::Text),
    field("required_level", FieldKind::Int),
    field("gold_cost", FieldKind::Int),
    field("energy_cost", FieldKind::Float),
    field("input_1_slug", FieldKind::StringName),
    field("input_1_quantity", FieldKind::Int),
    field("input_2_slug", FieldKind::StringName),
    field("input_2_quantity", FieldKind::Int),
    field("input_3_slug", FieldKind::StringName),
    field("input_3_quantity", FieldKind::Int),
    field("output_1_slug", FieldKind::StringName),
    field("output_1_quantity", FieldKind::Int),
    field("output_2_slug", FieldKind::StringName),
    field("output_2_quantity", FieldKind::Int),
];

/// Number of input slots a recipe record may carry
pub const INPUT_SLOTS: usize = 3;
/// Number of output slots a recipe record may carry
pub const OUTPUT_SLOTS: usize = 2;

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    Bool(bool),
}

impl FieldValue {
    fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text | FieldKind::StringName => Self::Text(String::new()),
            FieldKind::Int => Self::Int(0),
            FieldKind::Float => Self::Float(0.0),
            FieldKind::List => Self::List(Vec::new()),
            FieldKind::Bool => Self::Bool(false),
        }
    }
}

/// Flat, typed key/value view of one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<&'static str, FieldValue>,
}

impl Record {
    /// Scan `text` for every field in `specs`
    pub fn scan(text: &str, specs: &[FieldSpec]) -> Self {
        let mut fields = BTreeMap::new();
        for spec in specs {
            let value = match find_raw(text, spec.name) {
                Some(raw) => convert(raw, spec).unwrap_or_else(|| {
                    debug!(field = spec.name, raw, "malformed field, using default");
                    FieldValue::default_for(spec.kind)
                }),
                None => FieldValue::default_for(spec.kind),
            };
            fields.insert(spec.name, value);
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> &str {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.fields.get(name) {
            Some(FieldValue::Int(n)) => *n,
            _ => 0,
        }
    }

    pub fn float(&self, name: &str) -> f64 {
        match self.fields.get(name) {
            Some(FieldValue::Float(n)) => *n,
            Some(FieldValue::Int(n)) => *n as f64,
            _ => 0.0,
        }
    }

    pub fn list(&self, name: &str) -> &[String] {
        match self.fields.get(name) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(FieldValue::Bool(true)))
    }
}

/// Parse a single resource value literal.
///
/// `&"x"` and `"x"` become text, numbers become `Int`/`Float`, `true`/`false`
/// become `Bool`; anything else is returned as raw text.
pub fn parse_value(raw: &str) -> FieldValue {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix("&\"").and_then(|s| s.strip_suffix('"')) {
        return FieldValue::Text(unescape(inner));
    }
    if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return FieldValue::Text(unescape(inner));
    }
    match raw {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }
    if raw.contains('.') {
        if let Ok(f) = raw.parse::<f64>() {
            return FieldValue::Float(f);
        }
    } else if let Ok(n) = raw.parse::<i64>() {
        return FieldValue::Int(n);
    }
    FieldValue::Text(raw.to_string())
}

/// The `script_class` declared in a resource header, if any
pub fn script_class(text: &str) -> Option<&str> {
    SCRIPT_CLASS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Read a record file, logging and swallowing I/O failures
pub fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable record");
            None
        }
    }
}

/// Every `.tres` file below `dir`, in file-name order.
///
/// Unreadable directory entries are logged and pushed to `skipped`; only a
/// missing `dir` is an error.
pub fn record_files(dir: &Path, skipped: &mut Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ContentError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                if let Some(path) = e.path() {
                    skipped.push(path.to_path_buf());
                }
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map(|e| e != "tres").unwrap_or(true) {
            continue;
        }
        debug!(path = %path.display(), "found record");
        files.push(path.to_path_buf());
    }
    Ok(files)
}

/// First `key = value` line whose key is exactly `name`
fn find_raw<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

fn convert(raw: &str, spec: &FieldSpec) -> Option<FieldValue> {
    match spec.kind {
        FieldKind::Text | FieldKind::StringName => match parse_value(raw) {
            FieldValue::Text(s) => Some(FieldValue::Text(s)),
            FieldValue::Int(n) => Some(FieldValue::Text(n.to_string())),
            FieldValue::Float(f) => Some(FieldValue::Text(f.to_string())),
            FieldValue::Bool(b) => Some(FieldValue::Text(b.to_string())),
            FieldValue::List(_) => None,
        },
        FieldKind::Int => match parse_value(raw) {
            FieldValue::Int(n) => Some(FieldValue::Int(n)),
            _ => None,
        },
        FieldKind::Float => match parse_value(raw) {
            FieldValue::Float(f) => Some(FieldValue::Float(f)),
            FieldValue::Int(n) => Some(FieldValue::Float(n as f64)),
            _ => None,
        },
        FieldKind::Bool => match parse_value(raw) {
            FieldValue::Bool(b) => Some(FieldValue::Bool(b)),
            _ => None,
        },
        FieldKind::List => parse_list(raw).map(FieldValue::List),
    }
}

fn parse_list(raw: &str) -> Option<Vec<String>> {
    // Typed arrays carry their element type in the first bracket pair.
    let body = match raw.find("([") {
        Some(start) => &raw[start + 2..],
        None => raw.strip_prefix('[')?,
    };
    let end = body.rfind(']')?;
    let body = &body[..end];

    if body.contains('"') {
        return Some(
            QUOTED
                .captures_iter(body)
                .filter_map(|c| c.get(1))
                .map(|m| unescape(m.as_str()))
                .collect(),
        );
    }
    Some(
        body.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    )
}

fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"[gd_resource type="Resource" script_class="CraftingRecipe" format=3]

[resource]
required_level = 4
slug = &"copper_ingot_recipe"
recipe_name = &"Copper Ingot"
description = "Smelt copper ore into an ingot."
required_class = "miner"
gold_cost = 12
energy_cost = 2.5
input_1_slug = &"copper_ore"
input_1_quantity = 3
output_1_slug = &"copper_ingot"
output_1_quantity = 1
"#;

    #[test]
    fn test_order_insensitive_lookup() {
        let record = Record::scan(RECIPE, RECIPE_FIELDS);
        assert_eq!(record.text("slug"), "copper_ingot_recipe");
        assert_eq!(record.int("required_level"), 4);
        assert_eq!(record.float("energy_cost"), 2.5);
        assert_eq!(record.text("required_class"), "miner");
        assert_eq!(record.text("input_1_slug"), "copper_ore");
    }

    #[test]
    fn test_missing_fields_default() {
        let record = Record::scan(RECIPE, RECIPE_FIELDS);
        assert_eq!(record.text("input_2_slug"), "");
        assert_eq!(record.int("input_2_quantity"), 0);
        assert_eq!(record.int("output_2_quantity"), 0);
    }

    #[test]
    fn test_slug_key_is_exact() {
        let text = "input_1_slug = &\"oak_log\"\nslug = &\"plank_recipe\"\n";
        let record = Record::scan(text, RECIPE_FIELDS);
        assert_eq!(record.text("slug"), "plank_recipe");
    }

    #[test]
    fn test_malformed_int_defaults_to_zero() {
        let record = Record::scan("required_level = lots\n", RECIPE_FIELDS);
        assert_eq!(record.int("required_level"), 0);
    }

    #[test]
    fn test_tag_lists() {
        let plain = Record::scan("tags = [\"ore\", \"t1\"]\n", ITEM_FIELDS);
        assert_eq!(plain.list("tags"), ["ore", "t1"]);

        let typed = Record::scan("tags = Array[StringName]([&\"wood\", &\"t2\"])\n", ITEM_FIELDS);
        assert_eq!(typed.list("tags"), ["wood", "t2"]);

        let empty = Record::scan("tags = []\n", ITEM_FIELDS);
        assert!(empty.list("tags").is_empty());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("&\"\""), FieldValue::Text(String::new()));
        assert_eq!(parse_value("42"), FieldValue::Int(42));
        assert_eq!(parse_value("1.5"), FieldValue::Float(1.5));
        assert_eq!(parse_value("true"), FieldValue::Bool(true));
        assert_eq!(parse_value("\"say \\\"hi\\\"\""), FieldValue::Text("say \"hi\"".into()));
        assert_eq!(parse_value("null"), FieldValue::Text("null".into()));
    }

    #[test]
    fn test_script_class() {
        assert_eq!(script_class(RECIPE), Some("CraftingRecipe"));
        assert_eq!(script_class("[resource]\n"), None);
    }
}
