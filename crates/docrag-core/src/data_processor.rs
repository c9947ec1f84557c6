//! Source directory loading.
//!
//! Walks a directory, decodes every file with an accepted extension and
//! reports unreadable files individually instead of failing the batch.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Document;

/// A file that could not be loaded; ingestion carries on without it.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}

#[derive(Debug, Clone)]
pub struct DataProcessor {
    extensions: Vec<String>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new(&crate::config::DataSettings::default().extensions)
    }
}

impl DataProcessor {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { extensions }
    }

    pub fn load_dir(&self, data_dir: &Path) -> Result<LoadOutcome> {
        if !data_dir.is_dir() {
            tracing::warn!(dir = %data_dir.display(), "source directory does not exist");
            return Ok(LoadOutcome::default());
        }
        let files = self.list_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no loadable files found");
            return Ok(LoadOutcome::default());
        }
        let mut outcome = LoadOutcome::default();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(n = file_index + 1, total = files.len(), path = %file_path.display(), "loading");
            match read_file_content(file_path) {
                Ok(text) => outcome.documents.push(Document {
                    id: doc_id(file_path, data_dir),
                    path: file_path.clone(),
                    text,
                }),
                Err(error) => {
                    tracing::warn!(path = %file_path.display(), %error, "skipping unreadable document");
                    outcome.failures.push(LoadFailure { path: file_path.clone(), error });
                }
            }
        }
        tracing::info!(
            documents = outcome.documents.len(),
            failures = outcome.failures.len(),
            dir = %data_dir.display(),
            "loaded source directory"
        );
        Ok(outcome)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot walk entry");
                    continue;
                }
            };
            // Symlinks are read through; broken ones surface as load failures.
            let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && !entry.path().is_dir());
            if !is_file {
                continue;
            }
            let ext = entry.path().extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
            if ext.is_some_and(|ext| self.extensions.contains(&ext)) {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();
        files
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)
        .map_err(|source| Error::Io { path: file_path.display().to_string(), source })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

fn doc_id(file_path: &Path, data_dir: &Path) -> String {
    let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// blake3 over the embedder id, the chunking parameters and `(id, text)`
/// pairs in order. Equal fingerprints mean a rebuild would store the same
/// vectors.
pub fn corpus_fingerprint(documents: &[Document], embedder_id: &str, chunking: ChunkingConfig) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(embedder_id.len() as u64).to_le_bytes());
    hasher.update(embedder_id.as_bytes());
    hasher.update(&(chunking.chunk_size as u64).to_le_bytes());
    hasher.update(&(chunking.chunk_overlap as u64).to_le_bytes());
    for doc in documents {
        hasher.update(&(doc.id.len() as u64).to_le_bytes());
        hasher.update(doc.id.as_bytes());
        hasher.update(&(doc.text.len() as u64).to_le_bytes());
        hasher.update(doc.text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
