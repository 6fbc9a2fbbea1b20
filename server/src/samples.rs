use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const SAMPLE_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("Invalid sample name")]
    InvalidName,
    #[error("Sample not found")]
    NotFound,
    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub filename: String,
    pub display_name: String,
}

/// Example kustomizations kept in a directory on disk.
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    dir: PathBuf,
}

impl SampleCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All `.yaml`/`.yml` files, sorted by file name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<SampleEntry>, SampleError> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "samples directory does not exist");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|source| SampleError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut samples = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SampleError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !has_sample_extension(&filename) || !entry.path().is_file() {
                continue;
            }
            samples.push(SampleEntry {
                display_name: display_name(&filename),
                filename,
            });
        }
        samples.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(samples)
    }

    pub fn read(&self, filename: &str) -> Result<String, SampleError> {
        if !has_sample_extension(filename) {
            return Err(SampleError::InvalidFileType);
        }

        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(SampleError::InvalidName),
        }

        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(SampleError::NotFound);
        }
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SampleError::NotFound,
            _ => SampleError::Io { path, source },
        })
    }
}

fn has_sample_extension(filename: &str) -> bool {
    SAMPLE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

/// `qoin-helm.yaml` → `Qoin Helm`.
pub fn display_name(filename: &str) -> String {
    let stem = SAMPLE_EXTENSIONS
        .iter()
        .find_map(|ext| filename.strip_suffix(ext))
        .unwrap_or(filename);
    title_case(&stem.replace(|c: char| c == '-' || c == '_', " "))
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
