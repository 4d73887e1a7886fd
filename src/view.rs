//! Linear projection of the note tree for the knowledge-graph view.
//!
//! The tree itself never carries display state. Which folders are open is an
//! [`ExpandedSet`] of full folder paths held by whoever renders the view (the
//! server keeps it in the page URL), and [`flatten_tree`] turns tree + set into
//! rows that can be drawn top to bottom.

use std::collections::BTreeSet;

use crate::domain::TreeNode;

/// Full paths (`a/b/c`) of the folders currently shown open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSet {
    paths: BTreeSet<String>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Flip one folder between collapsed and expanded. Other folders, including
    /// the folder's own descendants, keep their state.
    pub fn toggle(&mut self, path: &str) {
        if !self.paths.remove(path) {
            self.paths.insert(path.to_string());
        }
    }

    /// The set as it would be after toggling `path`, as a sorted list.
    pub fn toggled(&self, path: &str) -> Vec<String> {
        let mut next = self.clone();
        next.toggle(path);
        next.paths.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExpandedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry<'a> {
    pub node: &'a TreeNode,
    /// Number of ancestor folders.
    pub depth: usize,
    /// Ancestor names and the node's own name joined by `/`.
    pub full_path: String,
}

/// Flatten `tree` in display order, descending only into expanded folders.
pub fn flatten_tree<'a>(tree: &'a [TreeNode], expanded: &ExpandedSet) -> Vec<FlatEntry<'a>> {
    let mut rows = Vec::new();
    flatten_into(tree, "", 0, expanded, &mut rows);
    rows
}

fn flatten_into<'a>(
    nodes: &'a [TreeNode],
    parent_path: &str,
    depth: usize,
    expanded: &ExpandedSet,
    rows: &mut Vec<FlatEntry<'a>>,
) {
    for node in nodes {
        let full_path = if parent_path.is_empty() {
            node.name().to_string()
        } else {
            format!("{parent_path}/{}", node.name())
        };
        let open = node.is_folder() && expanded.contains(&full_path);
        rows.push(FlatEntry {
            node,
            depth,
            full_path: full_path.clone(),
        });
        if open {
            flatten_into(node.children(), &full_path, depth + 1, expanded, rows);
        }
    }
}

/// Full paths of every folder in the tree; expanding all of them shows every row.
pub fn all_folder_paths(tree: &[TreeNode]) -> ExpandedSet {
    folder_paths(tree, "").into_iter().collect()
}

fn folder_paths(nodes: &[TreeNode], parent_path: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for node in nodes.iter().filter(|n| n.is_folder()) {
        let full_path = if parent_path.is_empty() {
            node.name().to_string()
        } else {
            format!("{parent_path}/{}", node.name())
        };
        paths.extend(folder_paths(node.children(), &full_path));
        paths.push(full_path);
    }
    paths
}
