//! Entry selection: wildcard masks, explicit item lists and single-entry
//! lookup.
//!
//! # Masks
//!
//! A mask list is separated by `;` (write `;;` for a literal semicolon).
//! Masks match the leaf name case-insensitively; `?` matches one character
//! and `*` any run. A name without an extension also matches a mask ending
//! in `.` or `.*`, so `*.*` selects every entry.
//!
//! ```rust
//! use zunpack::read::MaskSet;
//!
//! let masks = MaskSet::parse("*.txt; readme.*");
//! assert!(masks.matches("NOTES.TXT"));
//! assert!(masks.matches("README"));
//! assert!(!masks.matches("notes"));
//! ```

use glob::{MatchOptions, Pattern};

use crate::read::DirectoryEntry;
use crate::{Error, Result};

/// Which entries an extraction processes.
#[derive(Debug, Clone, Default)]
pub enum Selection {
    /// Every entry under the root prefix.
    #[default]
    All,
    /// Entries under the root prefix whose leaf name matches a mask list.
    Masks(String),
    /// Entries matching the items picked by the host.
    Items(Vec<SelectedItem>),
}

/// A file or directory picked by the host, relative to the root prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedItem {
    /// Name relative to the root prefix, without separators for directories.
    pub name: String,
    /// The item is a directory; everything below it is selected.
    pub is_dir: bool,
    /// Central directory position the item must have, when known.
    pub item_index: Option<usize>,
    /// Directory names compare case-sensitively.
    pub case_sensitive: bool,
}

impl SelectedItem {
    /// Selects a single file.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            item_index: None,
            case_sensitive: false,
        }
    }

    /// Selects a directory and its contents.
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            item_index: None,
            case_sensitive: false,
        }
    }

    /// Requires the entry to sit at `index` in the central directory.
    pub fn with_index(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }

    /// Sets case-sensitive comparison of directory names.
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mask {
    pattern: Pattern,
    /// The mask without a trailing `.` or `.*`, tried on names without an
    /// extension.
    stem: Option<Pattern>,
}

impl Mask {
    fn compile(text: &str) -> Self {
        // glob folds ASCII case only
        let mut text = text.to_lowercase();
        while text.contains("**") {
            text = text.replace("**", "*");
        }
        let stem = text
            .strip_suffix(".*")
            .or_else(|| text.strip_suffix('.'))
            .map(to_pattern);
        Self {
            pattern: to_pattern(&text),
            stem,
        }
    }

    fn matches(&self, name: &str) -> bool {
        if self.pattern.matches_with(name, MATCH_OPTIONS) {
            return true;
        }
        match &self.stem {
            Some(stem) if !name.contains('.') => stem.matches_with(name, MATCH_OPTIONS),
            _ => false,
        }
    }
}

/// Builds a glob pattern in which only `*` and `?` are special.
fn to_pattern(mask: &str) -> Pattern {
    let mut glob = String::with_capacity(mask.len());
    for c in mask.chars() {
        match c {
            '[' | ']' => {
                glob.push('[');
                glob.push(c);
                glob.push(']');
            }
            _ => glob.push(c),
        }
    }
    Pattern::new(&glob).unwrap_or_else(|_| literal(mask))
}

fn literal(mask: &str) -> Pattern {
    match Pattern::new(&Pattern::escape(mask)) {
        Ok(pattern) => pattern,
        Err(_) => Pattern::default(),
    }
}

/// A compiled list of masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSet {
    masks: Vec<Mask>,
}

impl MaskSet {
    /// Parses a `;`-separated mask list. Empty masks are dropped; an empty
    /// list selects everything.
    pub fn parse(text: &str) -> Self {
        let mut masks = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == ';' {
                if chars.peek() == Some(&';') {
                    chars.next();
                    current.push(';');
                    continue;
                }
                push_mask(&mut masks, &current);
                current.clear();
            } else {
                current.push(c);
            }
        }
        push_mask(&mut masks, &current);
        if masks.is_empty() {
            masks.push(Mask::compile("*.*"));
        }
        Self { masks }
    }

    /// Returns true if any mask matches the leaf `name`.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.masks.iter().any(|m| m.matches(&name))
    }
}

fn push_mask(masks: &mut Vec<Mask>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        masks.push(Mask::compile(text));
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Strips `root` and its separator from `name`.
///
/// Returns `None` when the entry is outside the root.
pub(crate) fn relative_to<'n>(name: &'n str, root: &str, case_sensitive: bool) -> Option<&'n str> {
    if root.is_empty() {
        return Some(name);
    }
    let head = name.get(..root.len())?;
    let same = if case_sensitive {
        head == root
    } else {
        head.to_lowercase() == root.to_lowercase()
    };
    if !same {
        return None;
    }
    name[root.len()..].strip_prefix('/').filter(|rest| !rest.is_empty())
}

fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

fn item_selects(items: &[SelectedItem], entry: &DirectoryEntry, relative: &str) -> bool {
    match relative.split_once('/') {
        Some((first, _)) => items
            .iter()
            .any(|item| item.is_dir && names_equal(&item.name, first, item.case_sensitive)),
        None if entry.is_directory => items
            .iter()
            .any(|item| item.is_dir && names_equal(&item.name, relative, item.case_sensitive)),
        None => items.iter().any(|item| {
            !item.is_dir
                && item.name == relative
                && item.item_index.is_none_or(|index| index == entry.index)
        }),
    }
}

/// Resolves a selection against the archive entries.
///
/// Entries keep central directory order; ordering by volume happens later.
pub fn match_entries<'a>(
    entries: &'a [DirectoryEntry],
    root: &str,
    selection: &Selection,
) -> Vec<&'a DirectoryEntry> {
    let root = normalize(root);
    match selection {
        Selection::All | Selection::Masks(_) => {
            let masks = match selection {
                Selection::Masks(text) => MaskSet::parse(text),
                _ => MaskSet::parse("*.*"),
            };
            entries
                .iter()
                .filter(|e| {
                    relative_to(&e.name, &root, false)
                        .is_some_and(|rel| masks.matches(rel.rsplit('/').next().unwrap_or(rel)))
                })
                .collect()
        }
        Selection::Items(items) => {
            let items: Vec<SelectedItem> = items
                .iter()
                .map(|item| SelectedItem {
                    name: normalize(&item.name),
                    ..item.clone()
                })
                .collect();
            let root_case_sensitive = items.iter().any(|item| item.case_sensitive);
            entries
                .iter()
                .filter(|e| {
                    relative_to(&e.name, &root, root_case_sensitive)
                        .is_some_and(|rel| item_selects(&items, e, rel))
                })
                .collect()
        }
    }
}

/// Finds the file named `name`, or at position `item_index`, for a
/// single-file extraction.
///
/// The leaf name compares exactly; the directory part compares
/// case-insensitively unless the entry came from a case-sensitive host.
/// Directories never match.
pub fn find_single<'a>(
    entries: &'a [DirectoryEntry],
    name: &str,
    item_index: Option<usize>,
) -> Result<&'a DirectoryEntry> {
    let wanted = normalize(name);
    let (dir, leaf) = wanted.rsplit_once('/').unwrap_or(("", wanted.as_str()));
    entries
        .iter()
        .filter(|e| e.is_file())
        .filter(|e| item_index.is_none_or(|index| index == e.index))
        .find(|e| {
            if wanted.is_empty() {
                return item_index.is_some();
            }
            e.file_name() == leaf && names_equal(e.parent(), dir, e.is_case_sensitive())
        })
        .ok_or_else(|| Error::EntryNotFound {
            name: name.to_string(),
        })
}

/// Sum of the uncompressed sizes of `entries`.
pub fn total_bytes(entries: &[&DirectoryEntry]) -> u64 {
    entries.iter().map(|e| e.size).sum()
}
