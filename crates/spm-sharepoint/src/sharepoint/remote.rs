//! The remote document-library boundary.
//!
//! `DocumentLibrary` is everything the file manager needs from the service.
//! `SharePointRestLibrary` (see `rest.rs`) is the production implementation;
//! tests plug in an in-memory one.

use crate::sharepoint::error::SharePointResult;
use crate::sharepoint::types::{RecycleBinItem, RemoteFile, RemoteFolder};
use async_trait::async_trait;

/// Operations against a document library, addressed by server-relative URL.
#[async_trait]
pub trait DocumentLibrary: Send + Sync {
    /// Resolve a server-relative folder path.  Fails with `NotFound` when
    /// the folder does not exist.
    async fn get_folder(&self, folder_url: &str) -> SharePointResult<RemoteFolder>;

    /// Immediate files of a folder.
    async fn list_files(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFile>>;

    /// Immediate subfolders of a folder.
    async fn list_folders(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFolder>>;

    /// Create a child folder.
    async fn create_folder(&self, parent_url: &str, name: &str) -> SharePointResult<RemoteFolder>;

    /// Store `content` as `name` inside the folder.  With `overwrite` off
    /// the service refuses to replace an existing file.
    async fn upload_file(
        &self,
        folder_url: &str,
        name: &str,
        content: Vec<u8>,
        overwrite: bool,
    ) -> SharePointResult<RemoteFile>;

    /// Move a file to the recycle bin.
    async fn recycle_file(&self, file_url: &str) -> SharePointResult<()>;

    /// Move a folder (and its contents) to the recycle bin.
    async fn recycle_folder(&self, folder_url: &str) -> SharePointResult<()>;

    /// Site recycle-bin contents, in service order.
    async fn recycle_bin_items(&self) -> SharePointResult<Vec<RecycleBinItem>>;

    /// Restore a single recycle-bin entry to its original location.
    async fn restore_item(&self, item_id: &str) -> SharePointResult<()>;

    /// Restore an entry renaming whatever now occupies its original name.
    /// Used for folders whose restore collides with a re-created folder.
    async fn restore_folder_item(&self, item_id: &str) -> SharePointResult<()>;
}
