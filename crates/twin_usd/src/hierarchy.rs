//! Prim hierarchy view.
//!
//! Flattens a [`Stage`] into display rows for tree views and terminals,
//! with the same search semantics as an interactive scene browser: a row
//! is kept when it matches, or when one of its descendants matches.

use std::collections::HashSet;

use serde::Serialize;

use crate::usd::{Prim, Stage};

/// One prim as shown in a hierarchy view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimRow {
    /// Full prim path
    pub path: String,

    /// Just the prim name (last segment of path)
    pub name: String,

    /// Type name (e.g., "Mesh", "Xform")
    pub type_name: String,

    /// 0 for root prims
    pub depth: usize,

    pub active: bool,
    pub child_count: usize,
}

impl PrimRow {
    fn from_prim(prim: &Prim, depth: usize) -> Self {
        Self {
            path: prim.path.clone(),
            name: prim.name().to_string(),
            type_name: prim.type_name().to_string(),
            depth,
            active: prim.active,
            child_count: prim.child_count(),
        }
    }

    /// Whether this prim has children.
    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }
}

/// Every prim in the stage, in pre-order.
pub fn rows(stage: &Stage) -> Vec<PrimRow> {
    stage
        .walk()
        .map(|(depth, prim)| PrimRow::from_prim(prim, depth))
        .collect()
}

/// Search and visibility settings for a hierarchy view.
#[derive(Clone, Debug)]
pub struct HierarchyFilter {
    /// Search text, matched against path and type name (case-insensitive)
    pub search: String,

    /// Whether to show inactive prims
    pub show_inactive: bool,
}

impl Default for HierarchyFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            show_inactive: true,
        }
    }
}

impl HierarchyFilter {
    /// Filter on `search`, showing inactive prims.
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Check if a row matches the search text and visibility setting.
    pub fn matches(&self, row: &PrimRow) -> bool {
        if !self.show_inactive && !row.active {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();
        row.path.to_lowercase().contains(&needle) || row.type_name.to_lowercase().contains(&needle)
    }

    /// Keep matching rows and the ancestors needed to reach them.
    ///
    /// `rows` must be in pre-order as produced by [`rows`]. Descendants of a
    /// hidden inactive prim are hidden with it.
    pub fn filter(&self, rows: &[PrimRow]) -> Vec<PrimRow> {
        let hidden: Vec<&str> = if self.show_inactive {
            Vec::new()
        } else {
            rows.iter()
                .filter(|r| !r.active)
                .map(|r| r.path.as_str())
                .collect()
        };
        let is_hidden = |path: &str| hidden.iter().any(|h| is_ancestor_or_self(h, path));

        let mut keep: HashSet<&str> = HashSet::new();
        for row in rows {
            if is_hidden(&row.path) || !self.matches(row) {
                continue;
            }
            keep.insert(&row.path);
            // e.g., "/World/Geo/Mesh" also keeps "/World" and "/World/Geo"
            let mut end = row.path.len();
            while let Some(slash) = row.path[..end].rfind('/') {
                if slash == 0 {
                    break;
                }
                keep.insert(&row.path[..slash]);
                end = slash;
            }
        }

        rows.iter()
            .filter(|r| keep.contains(r.path.as_str()))
            .cloned()
            .collect()
    }
}

fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Source of prim hierarchy data for a hierarchy view.
pub trait PrimDataProvider {
    /// Get root prim paths.
    fn root_paths(&self) -> Vec<String>;

    /// Get a display row by path. Depth counts from the roots.
    fn prim_row(&self, path: &str) -> Option<PrimRow>;

    /// Get child paths for a parent prim.
    fn child_paths(&self, parent_path: &str) -> Vec<String>;
}

impl PrimDataProvider for Stage {
    fn root_paths(&self) -> Vec<String> {
        self.prims.iter().map(|p| p.path.clone()).collect()
    }

    fn prim_row(&self, path: &str) -> Option<PrimRow> {
        self.walk()
            .find(|(_, prim)| prim.path == path)
            .map(|(depth, prim)| PrimRow::from_prim(prim, depth))
    }

    fn child_paths(&self, parent_path: &str) -> Vec<String> {
        self.find_prim(parent_path)
            .map(|prim| prim.children.iter().map(|c| c.path.clone()).collect())
            .unwrap_or_default()
    }
}

/// Render rows as an indented text tree.
///
/// ```text
/// World (Xform)
///   Mesh (Mesh)
///   Material (Material) [inactive]
/// ```
pub fn render_tree(rows: &[PrimRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!("{}{} ({})", "  ".repeat(row.depth), row.name, row.type_name));
        if !row.active {
            out.push_str(" [inactive]");
        }
        out.push('\n');
    }
    out
}
