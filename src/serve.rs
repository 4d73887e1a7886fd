//! Development server.
//!
//! Pages are rendered per request from an in-memory [`Garden`] snapshot. The
//! snapshot is rebuilt from the notes directory when it is missing, older than
//! `revalidate_secs`, or marked dirty by the file watcher; between rebuilds the
//! same snapshot is served. A failed rebuild answers 500 and keeps nothing.
//!
//! The home page draws the flattened knowledge graph. Open folders travel in
//! the query string (`/?open=a&open=a/b`), so every folder row links to the
//! same page with that one folder toggled.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::path::{Peek, Tail};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::config::GardenConfig;
use crate::error::GardenError;
use crate::markdown::{LinkResolver, relative_root};
use crate::site::Garden;
use crate::template::{Renderer, STYLE_CSS, TreeView};
use crate::view::ExpandedSet;
use crate::watch::watch_changes;

struct Snapshot {
    garden: Arc<Garden>,
    resolver: Arc<LinkResolver>,
    built_at: Instant,
}

pub struct Server {
    config: GardenConfig,
    renderer: Renderer,
    snapshot: RwLock<Option<Snapshot>>,
    dirty: AtomicBool,
}

impl Server {
    pub fn new(config: GardenConfig) -> Result<Self, GardenError> {
        let renderer = Renderer::new(&config)?;
        Ok(Self {
            config,
            renderer,
            snapshot: RwLock::new(None),
            dirty: AtomicBool::new(false),
        })
    }

    /// Force the next request to rebuild the snapshot.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        !self.dirty.load(Ordering::SeqCst)
            && snapshot.built_at.elapsed() < self.config.revalidate_after()
    }

    /// Current snapshot, rebuilding it first when stale or absent.
    pub async fn garden(&self) -> Result<(Arc<Garden>, Arc<LinkResolver>), GardenError> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref().filter(|s| self.is_fresh(s)) {
                return Ok((snapshot.garden.clone(), snapshot.resolver.clone()));
            }
        }

        let mut guard = self.snapshot.write().await;
        // Another request may have rebuilt while we waited for the lock.
        if let Some(snapshot) = guard.as_ref().filter(|s| self.is_fresh(s)) {
            return Ok((snapshot.garden.clone(), snapshot.resolver.clone()));
        }

        self.dirty.store(false, Ordering::SeqCst);
        let config = self.config.clone();
        let garden = match tokio::task::spawn_blocking(move || Garden::collect(&config)).await {
            Ok(Ok(garden)) => garden,
            Ok(Err(e)) => {
                *guard = None;
                return Err(e.into());
            }
            Err(e) => {
                *guard = None;
                return Err(e.into());
            }
        };
        info!(
            "regenerated garden: {} notes, {} folders",
            garden.notes.len(),
            garden.stats.folders
        );
        let resolver = Arc::new(LinkResolver::new(&garden.notes));
        let garden = Arc::new(garden);
        *guard = Some(Snapshot {
            garden: garden.clone(),
            resolver: resolver.clone(),
            built_at: Instant::now(),
        });
        Ok((garden, resolver))
    }

    async fn index(&self, query: Vec<(String, String)>) -> Response {
        let expanded: ExpandedSet = query
            .into_iter()
            .filter(|(key, _)| key == "open")
            .map(|(_, path)| path)
            .collect();
        let (garden, _) = match self.garden().await {
            Ok(found) => found,
            Err(e) => return error_response(&e),
        };
        html_or_error(
            self.renderer
                .render_index(&garden, TreeView::Graph(&expanded))
                .map_err(GardenError::from),
        )
    }

    async fn note(&self, slug: &str) -> Response {
        let (garden, resolver) = match self.garden().await {
            Ok(found) => found,
            Err(e) => return error_response(&e),
        };
        let Some(note) = garden.find(slug) else {
            return self.not_found(&relative_root(slug.split('/').count()));
        };
        html_or_error(
            self.renderer
                .render_note(note, &resolver)
                .map_err(GardenError::from),
        )
    }

    fn not_found(&self, root: &str) -> Response {
        match self.renderer.render_not_found(root) {
            Ok(html) => warp::reply::with_status(warp::reply::html(html), StatusCode::NOT_FOUND)
                .into_response(),
            Err(e) => error_response(&e.into()),
        }
    }
}

fn html_or_error(rendered: Result<String, GardenError>) -> Response {
    match rendered {
        Ok(html) => warp::reply::html(html).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &GardenError) -> Response {
    error!("request failed: {e}");
    warp::reply::with_status(
        format!("garden regeneration failed: {e}"),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

/// Markdown sources and dotfiles are never served as assets.
fn is_servable_asset(path: &str) -> bool {
    !path.ends_with(".md") && !path.split('/').any(|segment| segment.starts_with('.'))
}

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let with_server = {
        let server = server.clone();
        warp::any().map(move || server.clone())
    };

    let index = warp::get()
        .and(warp::path::end().or(warp::path("index.html").and(warp::path::end())).unify())
        .and(
            warp::query::<Vec<(String, String)>>()
                .or(warp::any().map(Vec::new))
                .unify(),
        )
        .and(with_server.clone())
        .then(|query, server: Arc<Server>| async move { server.index(query).await });

    let style = warp::get()
        .and(warp::path("style.css"))
        .and(warp::path::end())
        .map(|| warp::reply::with_header(STYLE_CSS, "content-type", "text/css; charset=utf-8"));

    let note = warp::get()
        .and(warp::path("notes"))
        .and(warp::path::tail())
        .and_then(|tail: Tail| async move {
            let decoded = urlencoding::decode(tail.as_str())
                .map(|s| s.into_owned())
                .map_err(|_| warp::reject::not_found())?;
            match decoded.strip_suffix(".html") {
                Some(slug) => Ok::<String, Rejection>(slug.to_string()),
                None => Err(warp::reject::not_found()),
            }
        })
        .and(with_server.clone())
        .then(|slug: String, server: Arc<Server>| async move { server.note(&slug).await });

    let assets = warp::get()
        .and(warp::path("notes"))
        .and(warp::path::peek())
        .and_then(|peek: Peek| async move {
            if is_servable_asset(peek.as_str()) {
                Ok::<(), Rejection>(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
        .and(warp::fs::dir(server.config.source.clone()));

    index
        .or(style)
        .or(note)
        .or(assets)
        .recover(move |_rejection: Rejection| {
            let server = server.clone();
            // Unknown paths: an empty root makes the page's links absolute.
            async move { Ok::<_, Rejection>(server.not_found("")) }
        })
}

/// Serve the garden on `addr` until Ctrl-C. With `watch`, edits under the notes
/// directory mark the snapshot dirty immediately instead of waiting for it to expire.
pub async fn serve(config: GardenConfig, addr: SocketAddr, watch: bool) -> Result<(), GardenError> {
    let server = Arc::new(Server::new(config)?);
    // Fail fast on an unreadable notes directory instead of on the first request.
    server.garden().await?;

    if watch {
        spawn_watcher(server.clone(), &server.config.source);
    }

    let (bound, running) = warp::serve(routes(server))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
            }
        })?;
    info!("serving garden on http://{bound}");
    running.await;
    info!("server stopped");
    Ok(())
}

fn spawn_watcher(server: Arc<Server>, source: &Path) {
    let source = source.to_path_buf();
    std::thread::spawn(move || {
        let result = watch_changes(&source, None, |changed| {
            info!("{} changed paths, regenerating on next request", changed.len());
            server.invalidate();
        });
        if let Err(e) = result {
            error!("file watcher stopped: {e}");
        }
    });
}
