//! Graph sources. Fetching is the only asynchronous step of a session.

use flowmap_core::RawGraph;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse graph from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait GraphSource {
    /// Human readable origin, used in logs and errors.
    fn describe(&self) -> String;

    fn fetch(&self) -> impl Future<Output = Result<RawGraph, LoadError>> + Send;
}

pub fn parse_graph(json: &str, origin: &str) -> Result<RawGraph, LoadError> {
    serde_json::from_str(json).map_err(|source| LoadError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// JSON file read with `tokio::fs`.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GraphSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<RawGraph, LoadError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_graph(&content, &self.describe())
    }
}

/// Graph JSON already in memory.
#[derive(Debug, Clone)]
pub struct StaticSource {
    pub json: String,
}

impl StaticSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl GraphSource for StaticSource {
    fn describe(&self) -> String {
        "<inline>".to_string()
    }

    async fn fetch(&self) -> Result<RawGraph, LoadError> {
        parse_graph(&self.json, &self.describe())
    }
}
