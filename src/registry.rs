//! Content Registry
//!
//! One registry file per content kind (items, recipes) holds an ordered list
//! of `{hash, id, path, slug}` entries plus the `content_name`, `version` and
//! `next_id` headers. Everything outside the entries array is kept verbatim
//! so a rewrite only touches the header values it owns and the array itself.
//!
//! Ids are handed out from `next_id` and never recycled: removing entries
//! leaves `next_id` alone, and only a full rebuild renumbers.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use tracing::{debug, info, warn};

use crate::checksum::ContentHash;
use crate::error::{ContentError, Result};
use crate::version::VersionStamp;

static ENTRY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("static regex"));

static ENTRY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"&"(hash|id|path|slug)":\s*(?:&?"((?:[^"\\]|\\.)*)"|(-?\d+))"#).expect("static regex")
});

const ENTRIES_KEY: &str = "entries";

/// One registry row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: u64,
    pub slug: String,
    /// Root-relative virtual path (`res://...`)
    pub path: String,
    pub hash: ContentHash,
}

impl RegistryEntry {
    /// File name portion of `path`
    pub fn file_name(&self) -> &str {
        self.path.rsplit_once('/').map(|(_, f)| f).unwrap_or(&self.path)
    }

    /// Whether `path` has `segment` as a whole directory component
    pub fn in_segment(&self, segment: &str) -> bool {
        let dirs = self.path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        dirs.split('/').any(|part| part == segment)
    }

    fn render(&self) -> String {
        format!(
            "{{\n&\"hash\": \"{}\",\n&\"id\": {},\n&\"path\": \"{}\",\n&\"slug\": &\"{}\"\n}}",
            self.hash, self.id, self.path, self.slug
        )
    }
}

/// A loaded registry file
#[derive(Debug, Clone)]
pub struct ContentRegistry {
    /// Lines before the entries array
    head: Vec<String>,
    /// Lines after the entries array
    tail: Vec<String>,
    trailing_newline: bool,
    content_name: String,
    version: VersionStamp,
    next_id: u64,
    entries: Vec<RegistryEntry>,
}

impl ContentRegistry {
    /// Read and parse a registry file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Parse registry text. `path` is only used for error messages.
    ///
    /// Fails with [`ContentError::MissingStructure`] when the entries array or
    /// the `next_id` header is absent.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let missing = |what| ContentError::MissingStructure {
            path: path.to_path_buf(),
            what,
        };

        let start = lines
            .iter()
            .position(|l| header_key(l) == Some(ENTRIES_KEY))
            .ok_or_else(|| missing("entries array"))?;
        let end = (start..lines.len())
            .find(|&i| lines[i].trim_end().ends_with("])"))
            .ok_or_else(|| missing("entries array"))?;

        let head: Vec<String> = lines[..start].iter().map(|l| l.to_string()).collect();
        let tail: Vec<String> = lines[end + 1..].iter().map(|l| l.to_string()).collect();

        let next_id = header_value(&head, "next_id")
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| missing("next_id"))?;
        let version = header_value(&head, "version")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or_default();
        let content_name = header_value(&head, "content_name")
            .map(|v| v.trim_start_matches('&').trim_matches('"').to_string())
            .unwrap_or_default();

        let block = lines[start..=end].join("\n");
        let entries = parse_entries(&block, path);
        debug!(path = %path.display(), entries = entries.len(), next_id, "parsed registry");

        Ok(Self {
            head,
            tail,
            trailing_newline: text.ends_with('\n'),
            content_name,
            version: VersionStamp::new(version),
            next_id,
            entries,
        })
    }

    /// Serialize back to registry text
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .head
            .iter()
            .map(|line| match header_key(line) {
                Some("version") => format!("version = {}", self.version),
                Some("next_id") => format!("next_id = {}", self.next_id),
                _ => line.clone(),
            })
            .collect();

        let body: Vec<String> = self.entries.iter().map(RegistryEntry::render).collect();
        lines.push(format!("{ENTRIES_KEY} = Array[Dictionary]([{}])", body.join(", ")));
        lines.extend(self.tail.iter().cloned());

        let mut text = lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    /// Write the rendered registry to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| ContentError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entries = self.entries.len(), next_id = self.next_id, "saved registry");
        Ok(())
    }

    pub fn content_name(&self) -> &str {
        &self.content_name
    }

    pub fn version(&self) -> VersionStamp {
        self.version
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    pub fn contains_slug(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    /// Append one entry with the empty placeholder hash; returns its id
    pub fn append(&mut self, slug: &str, path: &str) -> Result<u64> {
        let ids = self.append_all([(slug.to_string(), path.to_string())])?;
        Ok(ids[0])
    }

    /// Append entries in the given order with consecutive ids starting at
    /// `next_id`. Nothing is appended if any slug is already present.
    pub fn append_all<I>(&mut self, additions: I) -> Result<Vec<u64>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let additions: Vec<(String, String)> = additions.into_iter().collect();
        self.check_new_slugs(additions.iter().map(|(slug, _)| slug.as_str()))?;
        if additions.is_empty() {
            return Ok(Vec::new());
        }

        let mut id = self.first_free_id();
        let mut ids = Vec::with_capacity(additions.len());
        for (slug, path) in additions {
            debug!(id, slug = %slug, "appending registry entry");
            self.entries.push(RegistryEntry {
                id,
                slug,
                path,
                hash: ContentHash::empty(),
            });
            ids.push(id);
            id += 1;
        }
        self.next_id = id;
        self.touch();
        Ok(ids)
    }

    /// Regenerate the table from slug + path seeds.
    ///
    /// Entries with `id <= keep_through` survive in their current order; the
    /// seeds follow with ids continuing after `keep_through` (or from
    /// `id_base` when nothing is kept). Every hash is recomputed from the slug.
    pub fn rebuild(
        &mut self,
        keep_through: Option<u64>,
        seeds: &[(String, String)],
        id_base: u64,
    ) -> Result<()> {
        let kept: Vec<RegistryEntry> = match keep_through {
            Some(cutoff) => self.entries.iter().filter(|e| e.id <= cutoff).cloned().collect(),
            None => Vec::new(),
        };
        let kept_slugs: HashSet<&str> = kept.iter().map(|e| e.slug.as_str()).collect();
        check_unique(seeds.iter().map(|(slug, _)| slug.as_str()), &kept_slugs)?;

        let mut id = keep_through.map(|c| c + 1).unwrap_or(id_base).max(id_base);
        let mut entries: Vec<RegistryEntry> = kept
            .into_iter()
            .map(|mut e| {
                e.hash = ContentHash::of_slug(&e.slug);
                e
            })
            .collect();
        let kept_count = entries.len();

        for (slug, path) in seeds {
            entries.push(RegistryEntry {
                id,
                slug: slug.clone(),
                path: path.clone(),
                hash: ContentHash::of_slug(slug),
            });
            id += 1;
        }

        info!(kept = kept_count, added = seeds.len(), next_id = id, "rebuilt registry");
        self.entries = entries;
        self.next_id = id;
        self.touch();
        Ok(())
    }

    /// True if an entry carries `slug` or points at `<slug>.tres`
    pub fn references(&self, slug: &str) -> bool {
        let file = format!("{slug}.tres");
        self.entries
            .iter()
            .any(|e| e.slug == slug || e.file_name() == file)
    }

    /// Rename `old` to `new` in every `slug` field and every path whose file
    /// name is exactly `<old>.tres`. Returns the number of entries touched.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<usize> {
        if old == new {
            return Ok(0);
        }
        if self.contains_slug(new) {
            return Err(ContentError::DuplicateSlug(new.to_string()));
        }

        let old_file = format!("{old}.tres");
        let mut touched = 0;
        for entry in &mut self.entries {
            let mut changed = false;
            if entry.slug == old {
                entry.slug = new.to_string();
                changed = true;
            }
            if entry.file_name() == old_file {
                let dir_len = entry.path.len() - old_file.len();
                entry.path = format!("{}{new}.tres", &entry.path[..dir_len]);
                changed = true;
            }
            if changed {
                touched += 1;
            }
        }

        if touched == 0 {
            return Err(ContentError::EntryNotFound(old.to_string()));
        }
        self.touch();
        Ok(touched)
    }

    /// Drop the entry with `slug`
    pub fn remove_slug(&mut self, slug: &str) -> Option<RegistryEntry> {
        let pos = self.entries.iter().position(|e| e.slug == slug)?;
        let removed = self.entries.remove(pos);
        self.touch();
        Some(removed)
    }

    /// Drop every entry whose path has `segment` as a directory component
    pub fn remove_by_path_segment(&mut self, segment: &str) -> Vec<RegistryEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.in_segment(segment));
        self.entries = kept;
        if !removed.is_empty() {
            info!(segment, removed = removed.len(), "removed registry entries");
            self.touch();
        }
        removed
    }

    fn first_free_id(&self) -> u64 {
        let past_max = self.entries.iter().map(|e| e.id + 1).max().unwrap_or(0);
        if past_max > self.next_id {
            warn!(next_id = self.next_id, past_max, "next_id behind issued ids, skipping ahead");
        }
        self.next_id.max(past_max)
    }

    fn check_new_slugs<'a>(&self, slugs: impl Iterator<Item = &'a str>) -> Result<()> {
        let taken: HashSet<&str> = self.entries.iter().map(|e| e.slug.as_str()).collect();
        check_unique(slugs, &taken)
    }

    fn touch(&mut self) {
        self.version = self.version.bump();
    }
}

fn check_unique<'a>(slugs: impl Iterator<Item = &'a str>, taken: &HashSet<&str>) -> Result<()> {
    let mut seen = HashSet::new();
    for slug in slugs {
        if taken.contains(slug) || !seen.insert(slug) {
            return Err(ContentError::DuplicateSlug(slug.to_string()));
        }
    }
    Ok(())
}

fn parse_entries(block: &str, path: &Path) -> Vec<RegistryEntry> {
    ENTRY_BLOCK
        .captures_iter(block)
        .filter_map(|dict| {
            let mut entry = RegistryEntry {
                id: 0,
                slug: String::new(),
                path: String::new(),
                hash: ContentHash::empty(),
            };
            let mut has_id = false;
            for field in ENTRY_FIELD.captures_iter(&dict[1]) {
                let text = field.get(2).map(|m| m.as_str().to_string());
                let number = field.get(3).and_then(|m| m.as_str().parse::<u64>().ok());
                match &field[1] {
                    "id" => {
                        if let Some(id) = number {
                            entry.id = id;
                            has_id = true;
                        }
                    }
                    "slug" => entry.slug = text.unwrap_or_default(),
                    "path" => entry.path = text.unwrap_or_default(),
                    "hash" => entry.hash = text.unwrap_or_default().into(),
                    _ => {}
                }
            }
            if !has_id {
                warn!(path = %path.display(), entry = %dict[1].trim(), "registry entry without id, dropped");
                return None;
            }
            Some(entry)
        })
        .collect()
}

fn header_key(line: &str) -> Option<&str> {
    line.split_once('=').map(|(key, _)| key.trim())
}

fn header_value<'a>(head: &'a [String], key: &str) -> Option<&'a str> {
    head.iter()
        .filter_map(|l| l.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}

/// Unified diff between two renderings of a file, for dry runs
pub fn diff_text(before: &str, after: &str, file: &Path) -> String {
    let name = file.display().to_string();
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}

/// Count of (inserted, deleted) lines between two texts
pub fn diff_stats(before: &str, after: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(before, after);
    diff.iter_all_changes()
        .fold((0, 0), |(ins, del), change| match change.tag() {
            ChangeTag::Insert => (ins + 1, del),
            ChangeTag::Delete => (ins, del + 1),
            ChangeTag::Equal => (ins, del),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[gd_resource type="Resource" script_class="ContentIndex" load_steps=2 format=3 uid="uid://b7c8eae0f1g2"]

[ext_resource type="Script" uid="uid://0wmtcxri41vp" path="res://source/common/registry/content_index.gd" id="1_gemjq"]

[resource]
script = ExtResource("1_gemjq")
content_name = &"items"
version = 1760000003
next_id = 84
entries = Array[Dictionary]([{
&"hash": "",
&"id": 1,
&"path": "res://items/materials/grapes_new.tres",
&"slug": &"grapes_new"
}, {
&"hash": "",
&"id": 2,
&"path": "res://items/tier1/old_bread.tres",
&"slug": &"old_bread"
}, {
&"hash": "",
&"id": 83,
&"path": "res://items/materials/grapes_new_wine.tres",
&"slug": &"grapes_new_wine"
}])
metadata/slug = &"items_index"
metadata/id = 2
"#;

    fn sample() -> ContentRegistry {
        ContentRegistry::parse(SAMPLE, Path::new("items_index.tres")).unwrap()
    }

    #[test]
    fn test_parse_headers_and_entries() {
        let registry = sample();
        assert_eq!(registry.content_name(), "items");
        assert_eq!(registry.version().value(), 1_760_000_003);
        assert_eq!(registry.next_id(), 84);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.entries()[2].slug, "grapes_new_wine");
    }

    #[test]
    fn test_render_unchanged_is_identical() {
        assert_eq!(sample().render(), SAMPLE);
    }

    #[test]
    fn test_append_continues_from_next_id() {
        let mut registry = sample();
        let before = registry.version();
        let ids = registry
            .append_all(vec![
                ("a".to_string(), "res://items/a.tres".to_string()),
                ("b".to_string(), "res://items/b.tres".to_string()),
                ("c".to_string(), "res://items/c.tres".to_string()),
            ])
            .unwrap();
        assert_eq!(ids, vec![84, 85, 86]);
        assert_eq!(registry.next_id(), 87);
        assert!(registry.version() > before);
        assert!(registry.entries()[3..].iter().all(|e| e.hash.is_empty()));

        let reparsed = ContentRegistry::parse(&registry.render(), Path::new("x")).unwrap();
        assert_eq!(reparsed.next_id(), 87);
        assert_eq!(reparsed.entries(), registry.entries());
    }

    #[test]
    fn test_append_rejects_duplicate_without_partial_write() {
        let mut registry = sample();
        let result = registry.append_all(vec![
            ("fresh".to_string(), "res://items/fresh.tres".to_string()),
            ("old_bread".to_string(), "res://items/old_bread.tres".to_string()),
        ]);
        assert!(matches!(result, Err(ContentError::DuplicateSlug(s)) if s == "old_bread"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.next_id(), 84);
    }

    #[test]
    fn test_rename_is_exact_token() {
        let mut registry = sample();
        assert_eq!(registry.rename("grapes_new", "grapes").unwrap(), 1);
        let entries = registry.entries();
        assert_eq!(entries[0].slug, "grapes");
        assert_eq!(entries[0].path, "res://items/materials/grapes.tres");
        assert_eq!(entries[2].slug, "grapes_new_wine");
        assert_eq!(entries[2].path, "res://items/materials/grapes_new_wine.tres");
    }

    #[test]
    fn test_rename_missing_slug_fails() {
        let mut registry = sample();
        assert!(matches!(registry.rename("nope", "x"), Err(ContentError::EntryNotFound(_))));
        assert!(matches!(
            registry.rename("grapes_new", "old_bread"),
            Err(ContentError::DuplicateSlug(_))
        ));
    }

    #[test]
    fn test_references_by_slug_or_file() {
        let mut registry = sample();
        assert!(registry.references("grapes_new"));
        assert!(!registry.references("grapes"));
        registry.entries[1].slug = "bread".to_string();
        assert!(registry.references("old_bread"));
    }

    #[test]
    fn test_remove_by_segment_leaves_valid_syntax() {
        let mut registry = sample();
        let removed = registry.remove_by_path_segment("tier1");
        assert_eq!(removed.len(), 1);
        assert_eq!(registry.next_id(), 84);

        let text = registry.render();
        assert!(!text.contains(", ])"));
        assert!(!text.contains("}, }"));
        assert!(!text.contains("([, "));
        let reparsed = ContentRegistry::parse(&text, Path::new("x")).unwrap();
        let ids: Vec<u64> = reparsed.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 83]);
    }

    #[test]
    fn test_remove_everything_renders_empty_array() {
        let mut registry = sample();
        registry.remove_by_path_segment("items");
        assert!(registry.is_empty());
        assert!(registry.render().contains("entries = Array[Dictionary]([])\n"));
    }

    #[test]
    fn test_rebuild_keeps_cutoff_and_hashes_slugs() {
        let mut registry = sample();
        let seeds = vec![("rope_recipe".to_string(), "res://recipes/trapper/rope_recipe.tres".to_string())];
        registry.rebuild(Some(2), &seeds, 1).unwrap();

        let ids: Vec<u64> = registry.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(registry.next_id(), 4);
        assert!(registry.entries().iter().all(|e| e.hash.verify(&e.slug)));
    }

    #[test]
    fn test_missing_structure() {
        let no_entries = "[resource]\nnext_id = 3\n";
        assert!(matches!(
            ContentRegistry::parse(no_entries, Path::new("x")),
            Err(ContentError::MissingStructure { what: "entries array", .. })
        ));
        let no_next_id = "[resource]\nentries = Array[Dictionary]([])\n";
        assert!(matches!(
            ContentRegistry::parse(no_next_id, Path::new("x")),
            Err(ContentError::MissingStructure { what: "next_id", .. })
        ));
    }

    #[test]
    fn test_diff_text_shows_changes() {
        let diff = diff_text("a\nb\n", "a\nc\n", Path::new("idx.tres"));
        assert!(diff.contains("-b"));
        assert!(diff.contains("+c"));
        assert_eq!(diff_stats("a\nb\n", "a\nc\n"), (1, 1));
    }
}
