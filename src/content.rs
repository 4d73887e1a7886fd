//! Note collection: walk the notes directory, read front matter, and produce
//! the flat list of published notes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::GardenConfig;
use crate::domain::Note;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk notes directory: {0}")]
    Walk(#[from] walkdir::Error),
}

static EXCERPT_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*`_\[\]]").expect("valid excerpt regex"));

/// The parts of the configuration the collector needs.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub publish_key: String,
    pub excerpt_length: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self::from(&GardenConfig::default())
    }
}

impl From<&GardenConfig> for CollectOptions {
    fn from(config: &GardenConfig) -> Self {
        Self {
            publish_key: config.publish_key.clone(),
            excerpt_length: config.excerpt_length,
        }
    }
}

/// Collect every published note under `root`, newest first.
///
/// A missing `root` yields no notes. Any unreadable file or directory aborts
/// the whole collection.
pub fn collect_notes(root: &Path, options: &CollectOptions) -> Result<Vec<Note>, ContentError> {
    if !root.exists() {
        warn!("notes directory {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let mut notes = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() || !entry.file_name().to_string_lossy().ends_with(".md") {
            continue;
        }
        let path = entry.path();
        let bytes = fs::read(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Invalid UTF-8 is replaced, not fatal.
        let text = String::from_utf8_lossy(&bytes);
        let slug = slug_for(root, path);
        match parse_note(&slug, path, &text, options) {
            Some(note) => notes.push(note),
            None => debug!("skipping unpublished note {slug}"),
        }
    }

    sort_by_date(&mut notes);
    info!("collected {} notes from {}", notes.len(), root.display());
    Ok(notes)
}

/// Slug of a markdown file: its path relative to `root`, `/`-separated, without `.md`.
pub fn slug_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match joined.strip_suffix(".md") {
        Some(stem) => stem.to_string(),
        None => joined,
    }
}

/// Build a note from one markdown file, or `None` when its publish flag is `false`.
pub fn parse_note(slug: &str, path: &Path, text: &str, options: &CollectOptions) -> Option<Note> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(text);
    // `parsed.data` swallows YAML errors; the raw block is parsed again so they get reported.
    let front_matter = parse_front_matter(&parsed.matter, path);

    if let Some(Value::Bool(false)) = front_matter.get(options.publish_key.as_str()) {
        return None;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| slug.to_string());
    let title = front_matter
        .get("title")
        .and_then(scalar_text)
        .unwrap_or_else(|| file_name.replacen(".md", "", 1));
    let date = front_matter
        .get("date")
        .and_then(scalar_text)
        .or_else(|| front_matter.get("created").and_then(scalar_text));

    Some(Note {
        slug: slug.to_string(),
        title,
        excerpt: excerpt(&parsed.content, options.excerpt_length),
        date,
        body: parsed.content,
        source: path.to_path_buf(),
    })
}

fn parse_front_matter(raw: &str, path: &Path) -> Mapping {
    if raw.trim().is_empty() {
        return Mapping::new();
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Mapping(map)) => map,
        Ok(_) => Mapping::new(),
        Err(e) => {
            warn!("ignoring malformed front matter in {}: {e}", path.display());
            Mapping::new()
        }
    }
}

/// Front matter scalar as text. Empty strings, zero, `false` and null count as absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}

/// First `length` characters of the body with markdown punctuation stripped.
pub fn excerpt(body: &str, length: usize) -> String {
    let head: String = body.chars().take(length).collect();
    EXCERPT_NOISE.replace_all(&head, "").trim().to_string()
}

/// Parse a front matter date. Accepts RFC 3339, `YYYY-MM-DD[ HH:MM[:SS]]`,
/// `YYYY/MM/DD`, and integer milliseconds since the epoch.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

/// Display form used on cards and note pages, e.g. `Oct 16, 2026`.
pub fn display_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|dt| dt.format("%b %-d, %Y").to_string())
}

/// Order notes newest first.
///
/// Only notes with a parseable date take part: they are stably sorted among
/// themselves and written back into the positions dated notes held. Undated
/// notes and notes with an unreadable date keep their place.
pub fn sort_by_date(notes: &mut Vec<Note>) {
    let mut dated: Vec<(usize, DateTime<Utc>)> = notes
        .iter()
        .enumerate()
        .filter_map(|(i, note)| note.date.as_deref().and_then(parse_date).map(|d| (i, d)))
        .collect();
    let slots: Vec<usize> = dated.iter().map(|(i, _)| *i).collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1));

    let mut order: Vec<usize> = (0..notes.len()).collect();
    for (slot, (from, _)) in slots.into_iter().zip(dated) {
        order[slot] = from;
    }
    let mut taken: Vec<Option<Note>> = std::mem::take(notes).into_iter().map(Some).collect();
    *notes = order.into_iter().filter_map(|i| taken[i].take()).collect();
}
