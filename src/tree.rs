use feruca::Collator;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{Slugged, Stats, TreeNode};

/// Build the folder/file hierarchy from a flat list of notes.
///
/// Every slug is split on `/`. Leading segments become folders (created once,
/// shared by all notes below them), the final segment becomes a file carrying
/// the note's slug and title. Sibling order is fixed in a single pass once the
/// whole tree exists: folders first, then by name.
pub fn build_note_tree<N: Slugged>(notes: &[N]) -> Vec<TreeNode> {
    let mut root: Vec<TreeNode> = Vec::new();
    // Folder full path -> child indices leading from the root to that folder.
    let mut folders: HashMap<String, Vec<usize>> = HashMap::new();

    for note in notes {
        let parts: Vec<&str> = note.slug().split('/').collect();
        let mut parent: Vec<usize> = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            if i == parts.len() - 1 {
                children_at(&mut root, &parent).push(TreeNode::File {
                    name: part.to_string(),
                    path: note.slug().to_string(),
                    title: note.title().to_string(),
                });
                continue;
            }

            let full_path = parts[..=i].join("/");
            parent = match folders.get(&full_path) {
                Some(index) => index.clone(),
                None => {
                    let siblings = children_at(&mut root, &parent);
                    siblings.push(TreeNode::Folder {
                        name: part.to_string(),
                        children: Vec::new(),
                    });
                    let mut index = parent.clone();
                    index.push(siblings.len() - 1);
                    folders.insert(full_path, index.clone());
                    index
                }
            };
        }
    }

    sort_nodes(&mut root, &mut Collator::default());
    root
}

fn children_at<'a>(root: &'a mut Vec<TreeNode>, index: &[usize]) -> &'a mut Vec<TreeNode> {
    let mut children = root;
    for &i in index {
        children = match &mut children[i] {
            TreeNode::Folder { children, .. } => children,
            // Indices are only ever recorded for folders.
            TreeNode::File { .. } => unreachable!("folder index points at a file"),
        };
    }
    children
}

fn sort_nodes(nodes: &mut [TreeNode], collator: &mut Collator) {
    nodes.sort_by(|a, b| match (a.is_folder(), b.is_folder()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => collator.collate(a.name(), b.name()),
    });
    for node in nodes.iter_mut() {
        if let TreeNode::Folder { children, .. } = node {
            sort_nodes(children, collator);
        }
    }
}

/// Name order under the Unicode collation algorithm with the CLDR root
/// locale: accents and case only break ties, and lowercase comes first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    Collator::default().collate(a, b)
}

/// Count folders and files at every depth, adding onto `stats`.
pub fn folder_stats(tree: &[TreeNode], mut stats: Stats) -> Stats {
    for node in tree {
        match node {
            TreeNode::Folder { children, .. } => {
                stats.folders += 1;
                stats = folder_stats(children, stats);
            }
            TreeNode::File { .. } => stats.files += 1,
        }
    }
    stats
}
