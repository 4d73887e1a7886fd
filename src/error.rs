use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::content::ContentError;
use crate::template::RenderError;

#[derive(Error, Debug)]
pub enum GardenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize garden manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("output directory {output} would overwrite notes directory {source_dir}")]
    OutputOverlapsSource { output: PathBuf, source_dir: PathBuf },
    #[error("file watcher failed: {0}")]
    Watch(#[from] notify::Error),
    #[error("server failed: {0}")]
    Serve(#[from] warp::Error),
    #[error("note regeneration did not finish: {0}")]
    Regenerate(#[from] tokio::task::JoinError),
}

impl GardenError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| GardenError::Io { path, source }
    }
}
