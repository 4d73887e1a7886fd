use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::GardenConfig;
use crate::error::GardenError;
use crate::site::build_site;

/// Quiet period after the last event before a batch of changes is reported.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Paths in `event` worth reacting to: created, modified or removed, outside
/// `ignore`, and not inside a hidden file or directory below `source`.
fn relevant_paths(event: &Event, source: &Path, ignore: Option<&Path>) -> Vec<PathBuf> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|path| !ignore.is_some_and(|dir| path.starts_with(dir)))
        .filter(|path| {
            let relative = path.strip_prefix(source).unwrap_or(path.as_path());
            !relative.components().any(|c| match c {
                Component::Normal(name) => name.to_string_lossy().starts_with('.'),
                _ => false,
            })
        })
        .cloned()
        .collect()
}

/// Block watching `source`, calling `on_change` once per debounced batch of
/// changed paths. Returns when the watcher shuts down.
pub fn watch_changes<F>(source: &Path, ignore: Option<&Path>, mut on_change: F) -> Result<(), GardenError>
where
    F: FnMut(&[PathBuf]),
{
    let source = std::path::absolute(source).map_err(GardenError::io(source))?;
    let ignore = ignore
        .map(|dir| std::path::absolute(dir).map_err(GardenError::io(dir)))
        .transpose()?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver only goes away when watching stops.
            let _ = tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&source, RecursiveMode::Recursive)?;
    info!("watching {} for changes", source.display());

    let collect = |res: notify::Result<Event>, changed: &mut Vec<PathBuf>| match res {
        Ok(event) => changed.extend(relevant_paths(&event, &source, ignore.as_deref())),
        Err(e) => warn!("watch error: {e}"),
    };

    while let Ok(first) = rx.recv() {
        let mut changed = Vec::new();
        collect(first, &mut changed);
        while let Ok(next) = rx.recv_timeout(DEBOUNCE) {
            collect(next, &mut changed);
        }
        if changed.is_empty() {
            continue;
        }
        changed.sort();
        changed.dedup();
        on_change(&changed);
    }
    Ok(())
}

/// Build once, then rebuild the site whenever the notes change. A failed
/// rebuild is logged and the previous output stays in place.
pub fn watch(config: &GardenConfig) -> Result<(), GardenError> {
    build_site(config)?;
    watch_changes(&config.source, Some(&config.output), |changed| {
        info!("{} paths changed, rebuilding", changed.len());
        if let Err(e) = build_site(config) {
            error!("rebuild failed: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn note_edits_are_relevant() {
        let e = event(EventKind::Modify(ModifyKind::Any), "/garden/notes/a/b.md");
        assert_eq!(
            relevant_paths(&e, Path::new("/garden/notes"), None),
            vec![PathBuf::from("/garden/notes/a/b.md")]
        );
        let e = event(EventKind::Create(CreateKind::File), "/garden/notes/pic.png");
        assert_eq!(relevant_paths(&e, Path::new("/garden/notes"), None).len(), 1);
    }

    #[test]
    fn reads_are_ignored() {
        let e = event(EventKind::Access(AccessKind::Any), "/garden/notes/a.md");
        assert!(relevant_paths(&e, Path::new("/garden/notes"), None).is_empty());
    }

    #[test]
    fn hidden_and_output_paths_are_ignored() {
        let source = Path::new("/garden/notes");
        let e = event(EventKind::Modify(ModifyKind::Any), "/garden/notes/.obsidian/workspace.json");
        assert!(relevant_paths(&e, source, None).is_empty());

        let e = event(EventKind::Modify(ModifyKind::Any), "/garden/notes/_site/index.html");
        assert!(relevant_paths(&e, source, Some(Path::new("/garden/notes/_site"))).is_empty());
    }
}
