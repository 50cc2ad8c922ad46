//! Package sinks
//!
//! A sink receives `(path, payload)` writes and assembles the container.
//! The exporter only depends on [`PackageSink`]; the zip, directory, and
//! in-memory implementations here are conveniences for hosts and tests.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use zip::write::FileOptions;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid package path: {0}")]
    InvalidPath(String),
    #[error("Sink already finished")]
    Finished,
}

/// One artifact's contents
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Json(&'a Value),
    Bytes(&'a [u8]),
    Text(&'a str),
}

impl Payload<'_> {
    /// Encoded bytes; JSON is pretty-printed
    pub fn to_bytes(&self) -> Result<Vec<u8>, SinkError> {
        Ok(match self {
            Payload::Json(value) => serde_json::to_vec_pretty(value)?,
            Payload::Bytes(bytes) => bytes.to_vec(),
            Payload::Text(text) => text.as_bytes().to_vec(),
        })
    }
}

/// Destination for package artifacts
pub trait PackageSink {
    fn write(&mut self, path: &str, payload: Payload<'_>) -> Result<(), SinkError>;

    /// Flush and close the container
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Reject absolute paths and `..` so artifacts stay inside the package
pub fn validate_package_path(path: &str) -> Result<&str, SinkError> {
    let trimmed = path.trim_start_matches('/');
    let ok = !trimmed.is_empty()
        && Path::new(trimmed)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(trimmed)
    } else {
        Err(SinkError::InvalidPath(path.to_string()))
    }
}

/// Writes artifacts into a zip archive
pub struct ZipSink {
    zip: Option<zip::ZipWriter<File>>,
    options: FileOptions,
}

impl ZipSink {
    pub fn create(out_path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let zip_file = File::create(out_path)?;
        Ok(Self {
            zip: Some(zip::ZipWriter::new(zip_file)),
            options: FileOptions::default().compression_method(zip::CompressionMethod::Deflated),
        })
    }
}

impl PackageSink for ZipSink {
    fn write(&mut self, path: &str, payload: Payload<'_>) -> Result<(), SinkError> {
        let path = validate_package_path(path)?;
        let zip = self.zip.as_mut().ok_or(SinkError::Finished)?;
        let bytes = payload.to_bytes()?;
        zip.start_file(path, self.options)?;
        zip.write_all(&bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut zip = self.zip.take().ok_or(SinkError::Finished)?;
        let mut zip_file = zip.finish()?;
        zip_file.flush()?;
        Ok(())
    }
}

/// Writes artifacts as plain files under a directory
#[derive(Debug, Clone)]
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackageSink for DirSink {
    fn write(&mut self, path: &str, payload: Payload<'_>) -> Result<(), SinkError> {
        let out = self.root.join(validate_package_path(path)?);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out, payload.to_bytes()?)?;
        Ok(())
    }
}

/// Keeps artifacts in memory; mostly for tests and previews
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: BTreeMap<String, Vec<u8>>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn get_json(&self, path: &str) -> Option<Value> {
        self.get(path).and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Paths under a prefix such as `new/img/`
    pub fn paths_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.paths().filter(move |p| p.starts_with(prefix))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl PackageSink for MemorySink {
    fn write(&mut self, path: &str, payload: Payload<'_>) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        let path = validate_package_path(path)?.to_string();
        self.entries.insert(path, payload.to_bytes()?);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
