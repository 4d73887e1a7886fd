use serde::Serialize;
use std::path::PathBuf;

/// A published note, as collected from the source directory.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Note {
    /// `/`-delimited path of the note relative to the source root, without `.md`.
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Raw date value from front matter (`date`, falling back to `created`).
    pub date: Option<String>,
    #[serde(skip)]
    pub body: String,
    #[serde(skip)]
    pub source: PathBuf,
}

/// Anything the tree builder can place in the hierarchy.
pub trait Slugged {
    fn slug(&self) -> &str;
    fn title(&self) -> &str;
}

impl Slugged for Note {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// One entry of the folder/file hierarchy.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Folder { name: String, children: Vec<TreeNode> },
    File { name: String, path: String, title: String },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Folder { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub folders: usize,
    pub files: usize,
}

impl Stats {
    pub fn total(&self) -> usize {
        self.folders + self.files
    }
}
