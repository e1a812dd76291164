//! In-memory chapter corpus.
//!
//! The corpus is built once at startup by scanning the configured document
//! directory and is read-only afterwards, so it can be shared across request
//! handlers behind an `Arc` without locking.
//!
//! # Loading rules
//!
//! - A missing directory is created and yields an empty corpus.
//! - Only regular files directly inside the directory (or symlinks to
//!   them) are considered, and only those whose extension
//!   (case-insensitive) is recognised. Dangling links are skipped with a
//!   warning.
//! - The document identifier is the file stem: `Chapter1.pdf` → `Chapter1`.
//! - Files are visited in sorted filename order. When two files share a stem
//!   (`Chapter1.pdf`, `Chapter1.PDF`) the later one overwrites the earlier.
//! - A file whose extraction fails, or yields only whitespace, is recorded
//!   with empty text and is **unavailable**: it is not listed, not counted,
//!   and [`Corpus::get`] returns `None` for it.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::error::TutorError;
use crate::extract::{extension_of, extract_file};

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: BTreeMap<String, String>,
}

impl Corpus {
    /// Loads every recognised document in `dir`.
    ///
    /// Never fails: directory problems are logged and produce an empty
    /// corpus, and per-document extraction failures are isolated.
    pub fn load(dir: &Path, extensions: &[String]) -> Self {
        match Self::try_load(dir, extensions) {
            Ok(corpus) => corpus,
            Err(e) => {
                error!("{}", e);
                Self::default()
            }
        }
    }

    fn try_load(dir: &Path, extensions: &[String]) -> Result<Self, TutorError> {
        let unavailable = |source: std::io::Error| TutorError::Configuration {
            path: dir.to_path_buf(),
            source,
        };

        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(unavailable)?;
            info!("Created document directory: {}", dir.display());
            return Ok(Self::default());
        }
        if !dir.is_dir() {
            return Err(unavailable(std::io::Error::other("not a directory")));
        }
        std::fs::read_dir(dir).map_err(unavailable)?;

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let recognised = extension_of(entry.path())
                .map(|ext| extensions.iter().any(|e| *e == ext))
                .unwrap_or(false);
            if recognised {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        if paths.is_empty() {
            warn!("No documents found in {}", dir.display());
        }

        let mut corpus = Self::default();
        for path in paths {
            let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let text = match extract_file(&path) {
                Ok(text) => text,
                Err(e) => {
                    error!("{}", TutorError::from(e));
                    String::new()
                }
            };

            if text.trim().is_empty() {
                warn!("Chapter {} has no extractable text; marking unavailable", id);
            } else {
                info!("Loaded chapter: {} ({} chars)", id, text.chars().count());
            }

            if corpus.documents.insert(id.clone(), text).is_some() {
                warn!(
                    "Duplicate chapter identifier {}; {} replaces the earlier file",
                    id,
                    path.display()
                );
            }
        }

        Ok(corpus)
    }

    /// Builds a corpus from `(identifier, text)` pairs, applying the same
    /// overwrite and availability rules as [`Corpus::load`].
    pub fn from_documents<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Text of an available document.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.documents
            .get(id)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Identifiers of available documents, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.available().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.available().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers that were found on disk but produced no text.
    pub fn unavailable(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|(_, text)| text.trim().is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    fn available(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents
            .iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(id, text)| (id.as_str(), text.as_str()))
    }
}
