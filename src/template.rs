use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::{GardenConfig, SiteConfig};
use crate::content::display_date;
use crate::domain::{Note, TreeNode};
use crate::markdown::{LinkResolver, make_comrak_options, relative_root, render_markdown};
use crate::site::Garden;
use crate::view::{ExpandedSet, all_folder_paths, flatten_tree};

pub const STYLE_CSS: &str = include_str!("../templates/style.css");

const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("note.html", include_str!("../templates/note.html")),
    ("404.html", include_str!("../templates/404.html")),
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template rendering failed for {template}: {source:?}")]
    Template {
        template: &'static str,
        #[source]
        source: tera::Error,
    },
    #[error("failed to load templates: {0}")]
    Load(#[source] tera::Error),
}

pub fn init_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES).map_err(RenderError::Load)?;
    Ok(tera)
}

/// How the knowledge graph on the home page is drawn.
#[derive(Debug, Clone, Copy)]
pub enum TreeView<'a> {
    /// Nested `<details>` elements, root folders open. Needs no server.
    Nested,
    /// Flattened rows with open folders taken from the request.
    Graph(&'a ExpandedSet),
}

#[derive(Debug, Serialize)]
struct Card<'a> {
    slug: &'a str,
    title: &'a str,
    excerpt: &'a str,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphRow<'a> {
    kind: &'static str,
    name: &'a str,
    title: &'a str,
    path: &'a str,
    depth: usize,
    full_path: String,
    expanded: bool,
    child_count: usize,
    /// Open folders after clicking this row.
    toggle: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Graph<'a> {
    rows: Vec<GraphRow<'a>>,
    all_folders: Vec<String>,
}

fn graph<'a>(tree: &'a [TreeNode], expanded: &ExpandedSet) -> Graph<'a> {
    let rows = flatten_tree(tree, expanded)
        .into_iter()
        .map(|entry| match entry.node {
            TreeNode::Folder { name, children } => GraphRow {
                kind: "folder",
                name,
                title: name,
                path: "",
                depth: entry.depth,
                expanded: expanded.contains(&entry.full_path),
                child_count: children.len(),
                toggle: expanded.toggled(&entry.full_path),
                full_path: entry.full_path,
            },
            TreeNode::File { name, path, title } => GraphRow {
                kind: "file",
                name,
                title,
                path,
                depth: entry.depth,
                expanded: false,
                child_count: 0,
                toggle: Vec::new(),
                full_path: entry.full_path,
            },
        })
        .collect();
    Graph {
        rows,
        all_folders: all_folder_paths(tree).iter().map(String::from).collect(),
    }
}

/// Renders garden pages from the embedded templates.
pub struct Renderer {
    tera: Tera,
    site: SiteConfig,
    latest_count: usize,
    source_label: String,
}

impl Renderer {
    pub fn new(config: &GardenConfig) -> Result<Self, RenderError> {
        Ok(Self {
            tera: init_tera()?,
            site: config.site.clone(),
            latest_count: config.latest_count,
            source_label: config.source.display().to_string(),
        })
    }

    fn base_context(&self, root: &str) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("root", root);
        context
    }

    fn render(&self, template: &'static str, context: &Context) -> Result<String, RenderError> {
        self.tera
            .render(template, context)
            .map_err(|source| RenderError::Template { template, source })
    }

    pub fn render_index(&self, garden: &Garden, view: TreeView<'_>) -> Result<String, RenderError> {
        let mut context = self.base_context(&relative_root(0));

        let latest: Vec<Card<'_>> = garden
            .notes
            .iter()
            .take(self.latest_count)
            .map(|note| Card {
                slug: &note.slug,
                title: &note.title,
                excerpt: &note.excerpt,
                date: note.date.as_deref().and_then(display_date),
            })
            .collect();

        context.insert("note_count", &garden.notes.len());
        context.insert("stats", &garden.stats);
        context.insert("item_count", &garden.stats.total());
        context.insert("latest", &latest);
        context.insert("tree", &garden.tree);
        context.insert("source", &self.source_label);
        match view {
            TreeView::Nested => context.insert("graph", &Option::<Graph<'_>>::None),
            TreeView::Graph(expanded) => context.insert("graph", &graph(&garden.tree, expanded)),
        }

        self.render("index.html", &context)
    }

    pub fn render_note(&self, note: &Note, resolver: &LinkResolver) -> Result<String, RenderError> {
        let segments: Vec<&str> = note.slug.split('/').filter(|s| !s.is_empty()).collect();
        // notes/<slug>.html sits one directory per slug segment below the root.
        let root = relative_root(note.slug.split('/').count());
        let note_dir = note.slug.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let breadcrumbs: &[&str] = if segments.len() > 1 {
            &segments[..segments.len() - 1]
        } else {
            &[]
        };

        let mut context = self.base_context(&root);
        context.insert("title", &note.title);
        context.insert("date", &note.date.as_deref().and_then(display_date));
        context.insert("breadcrumbs", breadcrumbs);
        context.insert(
            "content",
            &render_markdown(&note.body, resolver, &root, note_dir, &make_comrak_options()),
        );

        self.render("note.html", &context)
    }

    /// `root` is the relative path back to the site root from where the page is served.
    pub fn render_not_found(&self, root: &str) -> Result<String, RenderError> {
        self.render("404.html", &self.base_context(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn note(slug: &str, title: &str, date: Option<&str>, body: &str) -> Note {
        Note {
            slug: slug.into(),
            title: title.into(),
            excerpt: body.chars().take(20).collect(),
            date: date.map(String::from),
            body: body.into(),
            source: PathBuf::new(),
        }
    }

    fn garden() -> Garden {
        Garden::from_notes(vec![
            note("a/b/c", "Compost", Some("2024-05-01"), "Turn it weekly."),
            note("a/b/d", "Dirt", None, ""),
            note("x", "Xylem", None, "Water goes up."),
        ])
    }

    fn renderer() -> Renderer {
        Renderer::new(&GardenConfig::default()).unwrap()
    }

    #[test]
    fn templates_load() {
        init_tera().unwrap();
    }

    #[test]
    fn index_shows_stats_cards_and_tree() {
        let html = renderer().render_index(&garden(), TreeView::Nested).unwrap();
        assert!(html.contains("<div class=\"stat-number\">3</div>"));
        assert!(html.contains("<div class=\"stat-number\">2</div>"));
        assert!(html.contains("Compost"));
        assert!(html.contains("📅 May 1, 2024"));
        assert!(html.contains("No description available"));
        assert!(html.contains("href=\"./notes/a/b/c.html\""));
        assert!(html.contains("<details open>"));
        assert!(!html.contains("graph-node-item"));
    }

    #[test]
    fn latest_cards_are_capped() {
        let config = GardenConfig {
            latest_count: 1,
            ..GardenConfig::default()
        };
        let html = Renderer::new(&config)
            .unwrap()
            .render_index(&garden(), TreeView::Nested)
            .unwrap();
        assert_eq!(html.matches("class=\"note-card\"").count(), 1);
    }

    #[test]
    fn empty_garden_says_so() {
        let html = renderer()
            .render_index(&Garden::from_notes(Vec::new()), TreeView::Nested)
            .unwrap();
        assert!(html.contains("No notes found yet"));
        assert!(!html.contains("Latest Notes"));
    }

    #[test]
    fn graph_view_renders_only_visible_rows() {
        let g = garden();
        let collapsed = renderer()
            .render_index(&g, TreeView::Graph(&ExpandedSet::new()))
            .unwrap();
        assert_eq!(collapsed.matches("graph-node-item").count(), 2);
        assert!(collapsed.contains("href=\"?open=a\""));

        let open: ExpandedSet = ["a"].into_iter().collect();
        let expanded = renderer().render_index(&g, TreeView::Graph(&open)).unwrap();
        assert_eq!(expanded.matches("graph-node-item").count(), 3);
        assert!(expanded.contains("open=a%2Fb"));
    }

    #[test]
    fn note_page_has_breadcrumbs_and_relative_root() {
        let g = garden();
        let resolver = LinkResolver::new(&g.notes);
        let html = renderer().render_note(&g.notes[0], &resolver).unwrap();
        assert!(html.contains("<title>Compost | Digital Garden</title>"));
        assert!(html.contains("href=\"../../../style.css\""));
        assert!(html.contains("<span class=\"crumb\">a</span>"));
        assert!(html.contains("<span class=\"crumb\">b</span>"));
        assert!(html.contains("Published on May 1, 2024"));
        assert!(html.contains("<p>Turn it weekly.</p>"));
    }

    #[test]
    fn root_note_has_no_breadcrumbs() {
        let g = garden();
        let resolver = LinkResolver::new(&g.notes);
        let html = renderer().render_note(&g.notes[2], &resolver).unwrap();
        assert!(!html.contains("class=\"breadcrumbs\""));
        assert!(html.contains("href=\"../style.css\""));
    }

    #[test]
    fn not_found_page_renders() {
        let html = renderer().render_not_found(".").unwrap();
        assert!(html.contains("Nothing grows here"));
    }
}
