//! File and folder operations scoped to a bound library/folder.
//!
//! Every public operation logs its outcome and returns it; batch helpers
//! keep going after a per-item failure and hand back a `BatchReport`.

use crate::sharepoint::error::{SharePointError, SharePointErrorCode, SharePointResult};
use crate::sharepoint::naming::resolve_unique_name;
use crate::sharepoint::recycle_bin::most_recent;
use crate::sharepoint::session::{Session, SharedSession};
use crate::sharepoint::types::{
    BatchReport, FolderContext, RecycleBinItem, RemoteFile, RemoteFolder, RestoreReport,
    SharePointConfig,
};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::Path;

/// Names known to exist in the bound folder.  A hint for collision
/// avoidance, rebuilt from a listing on demand.
#[derive(Debug, Default)]
struct ExistingFiles {
    names: HashSet<String>,
    loaded: bool,
}

impl ExistingFiles {
    fn clear(&mut self) {
        self.names.clear();
        self.loaded = false;
    }
}

/// High-level manager for one document library folder.
#[derive(Debug)]
pub struct SharePointFileManager {
    session: SharedSession,
    relative_url: String,
    context: Option<FolderContext>,
    existing_files: ExistingFiles,
}

impl SharePointFileManager {
    /// Manager over an existing session.  `relative_url` is the
    /// server-relative base libraries are addressed under (`/sites/Team`).
    pub fn new(session: SharedSession, relative_url: impl Into<String>) -> Self {
        Self {
            session,
            relative_url: relative_url.into().trim_end_matches('/').to_string(),
            context: None,
            existing_files: ExistingFiles::default(),
        }
    }

    /// Authenticate a new session from `config` and wrap it.
    pub async fn connect(config: &SharePointConfig) -> SharePointResult<Self> {
        config.credentials()?;
        let relative_url = config.base_relative_url()?;
        let session = Session::connect(config).await?.shared();
        Ok(Self::new(session, relative_url))
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn relative_url(&self) -> &str {
        &self.relative_url
    }

    /// The bound folder, if `set_folder_ctx` succeeded.
    pub fn folder_ctx(&self) -> Option<&FolderContext> {
        self.context.as_ref()
    }

    /// Current contents of the existing-files cache.
    pub fn cached_file_names(&self) -> &HashSet<String> {
        &self.existing_files.names
    }

    // ─── Folder context ──────────────────────────────────────────────

    /// Bind `{base}/{library_name}/{folder_name}` as the target of all file
    /// operations.  An empty `folder_name` binds the library root.  On
    /// failure the previous context is dropped.
    pub async fn set_folder_ctx(
        &mut self,
        library_name: &str,
        folder_name: &str,
    ) -> SharePointResult<&FolderContext> {
        let url = server_relative_path(&self.relative_url, library_name, folder_name);
        self.context = None;
        self.existing_files.clear();

        match self.session.library().get_folder(&url).await {
            Ok(folder) => {
                info!("Folder context set to {}", url);
                Ok(self.context.insert(FolderContext {
                    library_name: library_name.to_string(),
                    folder_name: folder_name.to_string(),
                    server_relative_url: url,
                    folder,
                }))
            }
            Err(e) => {
                error!("Error setting folder context {}: {}", url, e);
                Err(e)
            }
        }
    }

    fn context_url(&self) -> SharePointResult<String> {
        self.context
            .as_ref()
            .map(|c| c.server_relative_url.clone())
            .ok_or_else(SharePointError::no_folder_context)
    }

    // ─── Listing ─────────────────────────────────────────────────────

    /// Files directly inside the bound folder.
    pub async fn get_files(&self) -> SharePointResult<Vec<RemoteFile>> {
        let outcome = match self.context_url() {
            Ok(url) => self.session.library().list_files(&url).await,
            Err(e) => Err(e),
        };
        logged("getting files", outcome)
    }

    /// Folders directly inside the bound folder.
    pub async fn get_folders(&self) -> SharePointResult<Vec<RemoteFolder>> {
        let outcome = match self.context_url() {
            Ok(url) => self.session.library().list_folders(&url).await,
            Err(e) => Err(e),
        };
        logged("getting folders", outcome)
    }

    /// Create a folder inside the bound folder.
    pub async fn create_sharepoint_folder(&self, name: &str) -> SharePointResult<RemoteFolder> {
        let outcome = match self.context_url() {
            Ok(url) => self.session.library().create_folder(&url, name).await,
            Err(e) => Err(e),
        };
        if outcome.is_ok() {
            info!("Created SharePoint folder: {}", name);
        }
        logged("creating SharePoint folder", outcome)
    }

    // ─── Naming ──────────────────────────────────────────────────────

    /// `file_name`, or the first `{stem}_{n}{ext}` not in the cache.
    pub fn get_file_name(&self, file_name: &str) -> String {
        resolve_unique_name(file_name, &self.existing_files.names)
    }

    async fn load_existing_files(&mut self, folder_url: &str) -> SharePointResult<()> {
        let files = self.session.library().list_files(folder_url).await?;
        self.existing_files.names.extend(files.into_iter().map(|f| f.name));
        self.existing_files.loaded = true;
        debug!(
            "Cached {} existing file names for {}",
            self.existing_files.names.len(),
            folder_url
        );
        Ok(())
    }

    // ─── Upload ──────────────────────────────────────────────────────

    /// Upload under the local base name, replacing any same-named file.
    pub async fn upload_file(&mut self, local_path: impl AsRef<Path>) -> SharePointResult<RemoteFile> {
        let outcome = self.try_upload_file(local_path.as_ref()).await;
        logged("uploading file with override", outcome)
    }

    async fn try_upload_file(&mut self, local_path: &Path) -> SharePointResult<RemoteFile> {
        let folder_url = self.context_url()?;
        let name = base_name(local_path)?;
        let content = tokio::fs::read(local_path).await?;

        let file = self
            .session
            .library()
            .upload_file(&folder_url, &name, content, true)
            .await?;
        self.existing_files.names.insert(name.clone());
        info!("Uploaded file with override: {}", name);
        Ok(file)
    }

    /// Upload under `file_name` (default: the local base name), renamed to
    /// `{stem}_{n}{ext}` if that name is taken.  Never replaces a file.
    pub async fn upload_file_without_override(
        &mut self,
        local_path: impl AsRef<Path>,
        file_name: Option<&str>,
    ) -> SharePointResult<RemoteFile> {
        let outcome = self
            .try_upload_file_without_override(local_path.as_ref(), file_name)
            .await;
        logged("uploading file without override", outcome)
    }

    async fn try_upload_file_without_override(
        &mut self,
        local_path: &Path,
        file_name: Option<&str>,
    ) -> SharePointResult<RemoteFile> {
        let folder_url = self.context_url()?;
        if !self.existing_files.loaded {
            self.load_existing_files(&folder_url).await?;
        }

        let desired = match file_name {
            Some(n) => n.to_string(),
            None => base_name(local_path)?,
        };
        let name = self.get_file_name(&desired);
        let content = tokio::fs::read(local_path).await?;

        let file = self
            .session
            .library()
            .upload_file(&folder_url, &name, content, false)
            .await?;
        self.existing_files.names.insert(name.clone());
        info!("Uploaded file without override: {}", name);
        Ok(file)
    }

    /// Upload each path with `upload_file`, continuing past failures.
    pub async fn upload_multiple_files<I, P>(
        &mut self,
        local_paths: I,
    ) -> SharePointResult<BatchReport<RemoteFile>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let folder_url = logged("uploading multiple files", self.context_url())?;
        if let Err(e) = self.load_existing_files(&folder_url).await {
            warn!("Could not list existing files before batch upload: {}", e);
        }

        let mut report = BatchReport::new();
        for path in local_paths {
            let path = path.as_ref();
            let outcome = self.upload_file(path).await;
            report.record(path.display().to_string(), outcome);
        }
        self.existing_files.clear();

        info!(
            "Uploaded {} of {} files",
            report.succeeded.len(),
            report.attempted()
        );
        Ok(report)
    }

    /// Upload each path with `upload_file_without_override`, continuing
    /// past failures.  Fails up front if the folder cannot be listed.
    pub async fn upload_multiple_files_without_override<I, P>(
        &mut self,
        local_paths: I,
    ) -> SharePointResult<BatchReport<RemoteFile>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let context = logged("uploading multiple files without override", self.context_url());
        let folder_url = context?;
        self.existing_files.clear();
        if let Err(e) = self.load_existing_files(&folder_url).await {
            self.existing_files.clear();
            return logged("uploading multiple files without override", Err(e));
        }

        let mut report = BatchReport::new();
        for path in local_paths {
            let path = path.as_ref();
            let outcome = self.upload_file_without_override(path, None).await;
            report.record(path.display().to_string(), outcome);
        }
        self.existing_files.clear();

        info!(
            "Uploaded {} of {} files without override",
            report.succeeded.len(),
            report.attempted()
        );
        Ok(report)
    }

    // ─── Delete ──────────────────────────────────────────────────────

    /// Move one file of the bound folder to the recycle bin.
    pub async fn delete_file(&mut self, file_name: &str) -> SharePointResult<()> {
        let outcome = match self.context_url() {
            Ok(url) => {
                let file_url = format!("{}/{}", url, file_name.trim_start_matches('/'));
                self.session.library().recycle_file(&file_url).await
            }
            Err(e) => Err(e),
        };
        if outcome.is_ok() {
            self.existing_files.names.remove(file_name);
            info!("Deleted file: {}", file_name);
        }
        logged("deleting file", outcome)
    }

    /// `delete_file` for each name; every failure is independent.
    pub async fn delete_multiple_files<I, S>(&mut self, file_names: I) -> BatchReport<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::new();
        for name in file_names {
            let name = name.as_ref();
            let outcome = self.delete_file(name).await.map(|_| name.to_string());
            report.record(name, outcome);
        }
        report
    }

    /// Recycle every immediate file and folder of the bound folder.
    pub async fn delete_all_files_and_folders(&mut self) -> SharePointResult<BatchReport<String>> {
        let files = self.get_files().await?;
        let folders = self.get_folders().await?;
        let library = self.session.library();

        let mut report = BatchReport::new();
        for file in files {
            let outcome = library.recycle_file(&file.server_relative_url).await;
            let outcome = logged("deleting file", outcome).map(|_| file.name.clone());
            report.record(file.name, outcome);
        }
        for folder in folders {
            let outcome = library.recycle_folder(&folder.server_relative_url).await;
            let outcome = logged("deleting folder", outcome).map(|_| folder.name.clone());
            report.record(folder.name, outcome);
        }
        self.existing_files.clear();

        if report.is_complete_success() {
            info!("All files and folders are deleted");
        } else {
            warn!(
                "Deleted {} items, {} failed",
                report.succeeded.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    /// Recycle the bound folder itself and drop the context.
    pub async fn delete_entire_folder(&mut self) -> SharePointResult<()> {
        let outcome = match self.context_url() {
            Ok(url) => self.session.library().recycle_folder(&url).await,
            Err(e) => Err(e),
        };
        if outcome.is_ok() {
            self.context = None;
            self.existing_files.clear();
            info!("SharePoint folder and its contents are deleted");
        }
        logged("deleting the SharePoint folder", outcome)
    }

    // ─── Recycle bin ─────────────────────────────────────────────────

    /// Site recycle-bin entries, newest deletion first, at most `max_items`
    /// (`None` or `Some(0)`: all).
    pub async fn get_recently_deleted_items(
        &self,
        max_items: Option<usize>,
    ) -> SharePointResult<Vec<RecycleBinItem>> {
        let outcome = self.session.library().recycle_bin_items().await;
        logged("getting recently deleted items", outcome).map(|items| most_recent(items, max_items))
    }

    /// Restore up to `num_to_restore` of the most recent deletions.  A
    /// failed plain restore falls back to the folder restore path.
    pub async fn recover_data(&self, num_to_restore: usize) -> SharePointResult<RestoreReport> {
        let mut report = RestoreReport::new();
        if num_to_restore == 0 {
            info!("Restored 0 items");
            return Ok(report);
        }

        let items = self.get_recently_deleted_items(Some(num_to_restore)).await?;
        for item in items.into_iter().take(num_to_restore) {
            let outcome = self.restore_item(&item).await.map(|_| item.clone());
            report.record(item.title, outcome);
        }

        info!("Restored {} items", report.restored_count());
        Ok(report)
    }

    async fn restore_item(&self, item: &RecycleBinItem) -> SharePointResult<()> {
        let library = self.session.library();
        let outcome = match library.restore_item(&item.id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Plain restore of {} failed ({}), trying folder restore", item.title, e);
                library.restore_folder_item(&item.id).await
            }
        };
        if outcome.is_ok() {
            info!(
                "Item recovered to {} file name is {}",
                item.dir_name, item.title
            );
        }
        logged("restoring item", outcome)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════════════

/// `{base}/{library}/{folder}` without doubled or trailing slashes.
pub fn server_relative_path(base: &str, library_name: &str, folder_name: &str) -> String {
    let mut path = base.trim_end_matches('/').to_string();
    for segment in [library_name, folder_name] {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            path.push('/');
            path.push_str(segment);
        }
    }
    path
}

fn base_name(local_path: &Path) -> SharePointResult<String> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| {
            SharePointError::new(
                SharePointErrorCode::InvalidRequest,
                format!("Not a file path: {}", local_path.display()),
            )
        })
}

fn logged<T>(what: &str, outcome: SharePointResult<T>) -> SharePointResult<T> {
    if let Err(ref e) = outcome {
        error!("Error {}: {}", what, e);
    }
    outcome
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_relative_path() {
        assert_eq!(
            server_relative_path("/sites/Team", "Shared Documents", "Reports"),
            "/sites/Team/Shared Documents/Reports"
        );
        assert_eq!(
            server_relative_path("/sites/Team/", "Docs", ""),
            "/sites/Team/Docs"
        );
        assert_eq!(
            server_relative_path("/sites/Team", "/Docs/", "/2024/Q1/"),
            "/sites/Team/Docs/2024/Q1"
        );
        assert_eq!(server_relative_path("", "Docs", "Reports"), "/Docs/Reports");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("local/a.txt")).unwrap(), "a.txt");
        assert_eq!(
            base_name(Path::new("..")).unwrap_err().code,
            SharePointErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_existing_files_clear_resets_loaded() {
        let mut cache = ExistingFiles::default();
        cache.names.insert("a.txt".into());
        cache.loaded = true;
        cache.clear();
        assert!(cache.names.is_empty());
        assert!(!cache.loaded);
    }
}
