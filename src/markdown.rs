use comrak::{ComrakOptions, ComrakRenderOptions, ListStyleType};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use tera::escape_html;

use crate::domain::Note;

static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\[\]|]+)(?:\|([^\[\]]+))?\]\]").expect("valid wiki link regex")
});

pub fn make_comrak_options() -> ComrakOptions {
    let mut comrak_options = ComrakOptions::default();
    comrak_options.extension.table = true;
    comrak_options.extension.autolink = true;
    comrak_options.extension.tagfilter = true;
    comrak_options.extension.strikethrough = true;
    comrak_options.extension.tasklist = true;
    comrak_options.parse.smart = true;
    let mut render_options = ComrakRenderOptions::default();
    // Rewritten wiki links are emitted as inline HTML.
    render_options.unsafe_ = true;
    render_options.list_style = ListStyleType::Plus;
    comrak_options.render = render_options;
    comrak_options
}

/// Resolves `[[wiki link]]` targets to published note slugs.
#[derive(Debug, Default)]
pub struct LinkResolver {
    by_slug: HashMap<String, String>,
    by_name: HashMap<String, Vec<String>>,
}

impl LinkResolver {
    pub fn new(notes: &[Note]) -> Self {
        let mut resolver = Self::default();
        for note in notes {
            resolver
                .by_slug
                .insert(note.slug.to_lowercase(), note.slug.clone());
            let name = note.slug.rsplit('/').next().unwrap_or(&note.slug);
            resolver
                .by_name
                .entry(name.to_lowercase())
                .or_default()
                .push(note.slug.clone());
        }
        resolver
    }

    /// Exact slug first, then a file name that only one note has. Case-insensitive.
    pub fn resolve(&self, target: &str) -> Option<&str> {
        let target = target.split('#').next().unwrap_or(target).trim();
        let target = target.strip_suffix(".md").unwrap_or(target).to_lowercase();
        if let Some(slug) = self.by_slug.get(&target) {
            return Some(slug.as_str());
        }
        match self.by_name.get(&target).map(Vec::as_slice) {
            Some([only]) => Some(only.as_str()),
            _ => None,
        }
    }
}

/// Render a note body to HTML.
///
/// `root` is the relative path from the page being rendered to the site root,
/// `note_dir` the note's own folder (`a/b` for slug `a/b/c`), used for embeds.
pub fn render_markdown(
    body: &str,
    resolver: &LinkResolver,
    root: &str,
    note_dir: &str,
    options: &ComrakOptions,
) -> String {
    let rewritten = rewrite_links(body, resolver, root, note_dir);
    comrak::markdown_to_html(&rewritten, options)
}

fn rewrite_links(content: &str, resolver: &LinkResolver, root: &str, note_dir: &str) -> String {
    WIKI_LINK
        .replace_all(content, |caps: &Captures<'_>| {
            let embed = !caps[1].is_empty();
            let target = caps[2].trim();
            let label = caps
                .get(3)
                .map(|m| m.as_str().trim())
                .unwrap_or(target);

            // Percent-encoded paths need no further HTML escaping.
            if embed && is_asset(target) {
                let src = if note_dir.is_empty() {
                    format!("{root}/notes/{}", encode_path(target))
                } else {
                    format!("{root}/notes/{}/{}", encode_path(note_dir), encode_path(target))
                };
                return format!("<img src=\"{src}\" alt=\"{}\">", escape_html(label));
            }

            match resolver.resolve(target) {
                Some(slug) => format!(
                    "<a class=\"wikilink\" href=\"{root}/notes/{}.html\">{}</a>",
                    encode_path(slug),
                    escape_html(label)
                ),
                None => format!(
                    "<span class=\"wikilink missing\">{}</span>",
                    escape_html(label)
                ),
            }
        })
        .into_owned()
}

fn is_asset(target: &str) -> bool {
    match target.rsplit_once('.') {
        Some((_, ext)) => !ext.eq_ignore_ascii_case("md") && !ext.contains(['/', ' ']),
        None => false,
    }
}

/// Percent-encode each `/`-separated segment of a site path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative path from a page `depth` directories below the site root back to it.
///
/// `.` for the root itself, otherwise `..` segments joined by `/`, without a
/// trailing slash (templates add `/style.css`).
pub fn relative_root(depth: usize) -> String {
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn note(slug: &str) -> Note {
        Note {
            slug: slug.into(),
            title: slug.into(),
            excerpt: String::new(),
            date: None,
            body: String::new(),
            source: PathBuf::new(),
        }
    }

    fn resolver() -> LinkResolver {
        LinkResolver::new(&[
            note("ideas/Gardening"),
            note("a/dup"),
            note("b/dup"),
            note("top"),
            note("ideas/Seed & Sow?"),
        ])
    }

    #[test]
    fn resolves_exact_slug_and_unique_name() {
        let r = resolver();
        assert_eq!(r.resolve("ideas/gardening"), Some("ideas/Gardening"));
        assert_eq!(r.resolve("Gardening"), Some("ideas/Gardening"));
        assert_eq!(r.resolve("Gardening#Soil"), Some("ideas/Gardening"));
        assert_eq!(r.resolve("top.md"), Some("top"));
        assert_eq!(r.resolve("dup"), None);
        assert_eq!(r.resolve("a/dup"), Some("a/dup"));
        assert_eq!(r.resolve("nowhere"), None);
    }

    #[test]
    fn wiki_links_become_anchors() {
        let html = rewrite_links("See [[Gardening|the garden]] and [[nowhere]].", &resolver(), "..", "ideas");
        assert_eq!(
            html,
            "See <a class=\"wikilink\" href=\"../notes/ideas/Gardening.html\">the garden</a> and <span class=\"wikilink missing\">nowhere</span>."
        );
    }

    #[test]
    fn embeds_point_at_copied_assets() {
        let html = rewrite_links("![[diagram.png]]", &resolver(), "../..", "ideas");
        assert_eq!(html, "<img src=\"../../notes/ideas/diagram.png\" alt=\"diagram.png\">");
    }

    #[test]
    fn link_paths_are_percent_encoded() {
        let html = rewrite_links("[[Seed & Sow?|seeds & <bulbs>]]", &resolver(), "..", "ideas");
        assert_eq!(
            html,
            "<a class=\"wikilink\" href=\"../notes/ideas/Seed%20%26%20Sow%3F.html\">seeds &amp; &lt;bulbs&gt;</a>"
        );

        let html = rewrite_links("![[plots/bed one.png]]", &resolver(), "../..", "my notes");
        assert_eq!(
            html,
            "<img src=\"../../notes/my%20notes/plots/bed%20one.png\" alt=\"plots&#x2F;bed one.png\">"
        );
    }

    #[test]
    fn embedded_note_is_linked() {
        let html = rewrite_links("![[top]]", &resolver(), ".", "");
        assert!(html.contains("href=\"./notes/top.html\""));
    }

    #[test]
    fn markdown_renders_with_extensions() {
        let html = render_markdown(
            "| a |\n|---|\n| 1 |\n\n~~gone~~ [[top]]",
            &resolver(),
            "..",
            "",
            &make_comrak_options(),
        );
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<a class=\"wikilink\" href=\"../notes/top.html\">top</a>"));
    }

    #[test]
    fn relative_root_matches_depth() {
        assert_eq!(relative_root(0), ".");
        assert_eq!(relative_root(1), "..");
        assert_eq!(relative_root(3), "../../..");
    }
}
