// ── Configuration directory accessor ──
//
// The only component that touches persistent state. Every write holds the
// per-path lock for its whole read/mutate/persist span and lands through a
// sibling temp file plus rename, so readers see either the old or the new
// bytes.

mod locks;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub use locks::PathLocks;

use crate::document::ConfigDocument;
use crate::error::CoreError;
use crate::reconcile;
use crate::theme::ThemeDefinition;

/// File name of the structured configuration document.
pub const DOCUMENT_FILE: &str = "configuration.yaml";
/// Directory (relative to the config root) holding theme files.
pub const THEMES_DIR: &str = "themes";

/// Result of [`ConfigStore::update_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate<R> {
    /// Whatever the mutation closure returned.
    pub result: R,
    /// Whether the document was written back.
    pub persisted: bool,
}

/// A directory entry returned by [`ConfigStore::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Accessor for the hub's configuration directory.
///
/// Cheap to clone; clones share the same lock table.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
    locks: Arc<PathLocks>,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(PathLocks::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(DOCUMENT_FILE)
    }

    pub fn themes_dir(&self) -> PathBuf {
        self.root.join(THEMES_DIR)
    }

    // ── Configuration document ───────────────────────────────────────

    /// Read `configuration.yaml`. A missing file is an empty document.
    pub async fn load_document(&self) -> Result<ConfigDocument, CoreError> {
        let path = self.document_path();
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(ConfigDocument::from(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration document missing, starting empty");
                Ok(ConfigDocument::default())
            }
            Err(e) => Err(CoreError::persistence("read", path, e)),
        }
    }

    /// Locked read-modify-write of `configuration.yaml`.
    ///
    /// `mutate` runs on the freshly loaded document; the result is written
    /// back only if the text changed.
    pub async fn update_document<F, R>(&self, mutate: F) -> Result<DocumentUpdate<R>, CoreError>
    where
        F: FnOnce(&mut ConfigDocument) -> R,
    {
        let path = self.document_path();
        let _guard = self.locks.lock(&path).await;

        let mut doc = self.load_document().await?;
        let before = doc.clone();
        let result = mutate(&mut doc);

        let persisted = doc != before;
        if persisted {
            write_atomic(&path, doc.as_str())
                .await
                .map_err(|e| CoreError::persistence("write", &path, e))?;
            info!(path = %path.display(), bytes = doc.as_str().len(), "configuration document saved");
        }

        Ok(DocumentUpdate { result, persisted })
    }

    // ── Themes ───────────────────────────────────────────────────────

    /// Install `theme` under `themes/`, holding the theme file's lock.
    pub async fn install_theme(&self, theme: &ThemeDefinition) -> Result<PathBuf, CoreError> {
        let dir = self.themes_dir();
        let _guard = self.locks.lock(&dir.join(theme.file_name())).await;
        reconcile::install_theme(&dir, theme).await
    }

    // ── Arbitrary files ──────────────────────────────────────────────

    /// Resolve a caller-supplied relative path against the config root.
    ///
    /// Rejects absolute paths, `..` segments and NUL bytes. An empty path
    /// resolves to the root itself only when `allow_root` is set.
    pub fn resolve(&self, relative: &str, allow_root: bool) -> Result<PathBuf, CoreError> {
        if relative.contains("..") || relative.starts_with('/') || relative.contains('\0') {
            return Err(CoreError::validation("Invalid path"));
        }

        let rel = Path::new(relative);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(CoreError::validation("Invalid path"));
        }
        if !allow_root && rel.components().all(|c| c == Component::CurDir) {
            return Err(CoreError::validation("Path is required"));
        }

        Ok(self.root.join(rel))
    }

    /// Read a UTF-8 file below the root.
    pub async fn read_file(&self, relative: &str) -> Result<String, CoreError> {
        let path = self.resolve(relative, false)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CoreError::NotFound {
                what: "file".into(),
            }),
            Err(e) => Err(CoreError::persistence("read", path, e)),
        }
    }

    /// Write a file below the root, creating parent directories.
    pub async fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf, CoreError> {
        let path = self.resolve(relative, false)?;
        let _guard = self.locks.lock(&path).await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::persistence("create", parent, e))?;
        }
        write_atomic(&path, content)
            .await
            .map_err(|e| CoreError::persistence("write", &path, e))?;

        info!(path = %path.display(), bytes = content.len(), "file written");
        Ok(path)
    }

    /// List a directory below the root, sorted by name.
    pub async fn list_dir(&self, relative: &str) -> Result<Vec<FileEntry>, CoreError> {
        let path = self.resolve(relative, true)?;
        let mut dir = match fs::read_dir(&path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::NotFound {
                    what: "directory".into(),
                });
            }
            Err(e) => return Err(CoreError::persistence("list", path, e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CoreError::persistence("list", &path, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| CoreError::persistence("stat", entry.path(), e))?;
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: if meta.is_file() { meta.len() } else { 0 },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Write `contents` to a sibling temp file, sync it, then rename it over
/// `path`.
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
