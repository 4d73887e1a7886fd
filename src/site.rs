//! One full pass over the notes directory: collect, index, render, write.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::GardenConfig;
use crate::content::{CollectOptions, ContentError, collect_notes};
use crate::domain::{Note, Stats, TreeNode};
use crate::error::GardenError;
use crate::fs::{copy_asset, prepare_output_dir, write_page};
use crate::markdown::LinkResolver;
use crate::template::{Renderer, STYLE_CSS, TreeView};
use crate::tree::{build_note_tree, folder_stats};

/// Everything the pages are rendered from: the flat note list, its hierarchy,
/// and the hierarchy's counts.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Garden {
    pub notes: Vec<Note>,
    pub tree: Vec<TreeNode>,
    pub stats: Stats,
}

impl Garden {
    /// Index an already collected and ordered note list.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let tree = build_note_tree(&notes);
        let stats = folder_stats(&tree, Stats::default());
        Self { notes, tree, stats }
    }

    pub fn collect(config: &GardenConfig) -> Result<Self, ContentError> {
        let notes = collect_notes(&config.source, &CollectOptions::from(config))?;
        let garden = Self::from_notes(notes);
        debug!(
            "indexed {} folders and {} files",
            garden.stats.folders, garden.stats.files
        );
        Ok(garden)
    }

    pub fn find(&self, slug: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.slug == slug)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub notes: usize,
    pub stats: Stats,
    pub assets: usize,
}

/// Output path of a note page: `notes/<slug>.html`.
pub fn note_page_path(output_dir: &Path, slug: &str) -> PathBuf {
    let mut path = output_dir.join("notes");
    for segment in slug.split('/') {
        path.push(segment);
    }
    path.set_file_name(format!("{}.html", slug.rsplit('/').next().unwrap_or(slug)));
    path
}

/// Build the whole site from `config.source` into `config.output`.
///
/// Notes are collected before the output directory is touched, so a failed
/// collection leaves the previous build in place.
pub fn build_site(config: &GardenConfig) -> Result<BuildReport, GardenError> {
    info!("building site from {}", config.source.display());
    check_output_location(&config.source, &config.output)?;

    let renderer = Renderer::new(config)?;
    let garden = Garden::collect(config)?;
    let resolver = LinkResolver::new(&garden.notes);

    prepare_output_dir(&config.output)?;

    write_page(
        &config.output.join("index.html"),
        &renderer.render_index(&garden, TreeView::Nested)?,
    )?;
    for note in &garden.notes {
        let html = renderer.render_note(note, &resolver)?;
        write_page(&note_page_path(&config.output, &note.slug), &html)?;
    }
    // Hosts serve 404.html at whatever URL missed, so its links are absolute.
    write_page(&config.output.join("404.html"), &renderer.render_not_found("")?)?;
    write_page(&config.output.join("style.css"), STYLE_CSS)?;
    write_page(
        &config.output.join("garden.json"),
        &serde_json::to_string_pretty(&garden)?,
    )?;

    let assets = copy_assets(&config.source, &config.output)?;

    let report = BuildReport {
        notes: garden.notes.len(),
        stats: garden.stats,
        assets,
    };
    info!(
        "site built: {} notes, {} folders, {} assets -> {}",
        report.notes,
        report.stats.folders,
        report.assets,
        config.output.display()
    );
    Ok(report)
}

fn check_output_location(source: &Path, output: &Path) -> Result<(), GardenError> {
    let source_abs = std::path::absolute(source).map_err(GardenError::io(source))?;
    let output_abs = std::path::absolute(output).map_err(GardenError::io(output))?;
    if source_abs.starts_with(&output_abs) {
        return Err(GardenError::OutputOverlapsSource {
            output: output.to_path_buf(),
            source_dir: source.to_path_buf(),
        });
    }
    Ok(())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Copy every non-markdown file under `source` to `output/notes/`, keeping its
/// relative location so links written next to a note keep working.
fn copy_assets(source: &Path, output: &Path) -> Result<usize, GardenError> {
    if !source.exists() {
        return Ok(0);
    }
    let output_abs = std::path::absolute(output).map_err(GardenError::io(output))?;
    let mut copied = 0;
    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(ContentError::from)?;
        let path = entry.path();
        if entry.file_type().is_dir() || entry.file_name().to_string_lossy().ends_with(".md") {
            continue;
        }
        // The output directory may live inside the notes directory.
        if std::path::absolute(path).is_ok_and(|p| p.starts_with(&output_abs)) {
            continue;
        }
        let relative = path.strip_prefix(source).unwrap_or(path);
        copy_asset(path, &output.join("notes").join(relative))?;
        copied += 1;
    }
    Ok(copied)
}
