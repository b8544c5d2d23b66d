#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use spm_sharepoint::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

pub const SITE_URL: &str = "https://contoso.sharepoint.com/sites/Team";
pub const BASE: &str = "/sites/Team";

/// Contents removed together by one recycle call.
#[derive(Debug, Clone, Default)]
struct Trashed {
    folders: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    bin: Vec<(RecycleBinItem, Trashed)>,
    next_id: u32,

    fail_listing: bool,
    fail_uploads: HashSet<String>,
    fail_recycles: HashSet<String>,
    fail_restores: HashSet<String>,
    plain_restore_refused: HashSet<String>,

    uploads: Vec<(String, bool)>,
    plain_restores: Vec<String>,
    folder_restores: Vec<String>,
    bin_reads: usize,
}

/// In-memory document library keyed by server-relative URL.
#[derive(Debug, Default)]
pub struct FakeLibrary {
    state: Mutex<State>,
}

fn parent_of(url: &str) -> &str {
    url.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn leaf_of(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(_, leaf)| leaf)
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

impl FakeLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a folder and all its ancestors below the site.
    pub fn add_folder(&self, url: &str) {
        let mut st = self.state.lock().unwrap();
        let mut current = url.trim_end_matches('/').to_string();
        while current.len() > BASE.len() {
            st.folders.insert(current.clone());
            current = parent_of(&current).to_string();
        }
    }

    pub fn add_file(&self, url: &str, content: &[u8]) {
        self.add_folder(parent_of(url));
        self.state
            .lock()
            .unwrap()
            .files
            .insert(url.to_string(), content.to_vec());
    }

    /// Seed a recycle-bin entry deleted `minutes` after a fixed epoch.
    pub fn add_deleted_file(&self, id: &str, url: &str, minutes: i64) {
        let mut st = self.state.lock().unwrap();
        let item = bin_item(id, url, RecycleBinItemType::File, epoch() + Duration::minutes(minutes));
        let trashed = Trashed {
            folders: Vec::new(),
            files: vec![(url.to_string(), b"restored".to_vec())],
        };
        st.bin.push((item, trashed));
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.state.lock().unwrap().fail_uploads.insert(name.to_string());
    }

    /// Recycling the file or folder at `url` fails.
    pub fn fail_recycle_of(&self, url: &str) {
        self.state.lock().unwrap().fail_recycles.insert(url.to_string());
    }

    /// Both restore paths fail for `id`.
    pub fn fail_restore_of(&self, id: &str) {
        self.state.lock().unwrap().fail_restores.insert(id.to_string());
    }

    /// Only the plain restore fails for `id`.
    pub fn refuse_plain_restore_of(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .plain_restore_refused
            .insert(id.to_string());
    }

    pub fn has_file(&self, url: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(url)
    }

    pub fn has_folder(&self, url: &str) -> bool {
        self.state.lock().unwrap().folders.contains(url)
    }

    pub fn file_content(&self, url: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(url).cloned()
    }

    pub fn file_names_in(&self, folder_url: &str) -> Vec<String> {
        let st = self.state.lock().unwrap();
        st.files
            .keys()
            .filter(|k| parent_of(k) == folder_url)
            .map(|k| leaf_of(k).to_string())
            .collect()
    }

    pub fn bin_titles(&self) -> Vec<String> {
        let st = self.state.lock().unwrap();
        st.bin.iter().map(|(item, _)| item.title.clone()).collect()
    }

    /// `(name, overwrite)` for every upload call, in order.
    pub fn uploads(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn plain_restores(&self) -> Vec<String> {
        self.state.lock().unwrap().plain_restores.clone()
    }

    pub fn folder_restores(&self) -> Vec<String> {
        self.state.lock().unwrap().folder_restores.clone()
    }

    pub fn bin_reads(&self) -> usize {
        self.state.lock().unwrap().bin_reads
    }
}

fn bin_item(id: &str, url: &str, item_type: RecycleBinItemType, deleted: DateTime<Utc>) -> RecycleBinItem {
    RecycleBinItem {
        id: id.to_string(),
        title: leaf_of(url).to_string(),
        dir_name: parent_of(url).trim_start_matches('/').to_string(),
        leaf_name: leaf_of(url).to_string(),
        deleted_date: deleted,
        item_type,
        size: 0,
        deleted_by_name: Some("Test User".to_string()),
    }
}

fn remote_file(url: &str, content: &[u8]) -> RemoteFile {
    RemoteFile {
        name: leaf_of(url).to_string(),
        server_relative_url: url.to_string(),
        length: content.len() as u64,
        unique_id: None,
        time_created: None,
        time_last_modified: None,
    }
}

fn remote_folder(url: &str) -> RemoteFolder {
    RemoteFolder {
        name: leaf_of(url).to_string(),
        server_relative_url: url.to_string(),
        item_count: 0,
        unique_id: None,
        time_last_modified: None,
    }
}

impl State {
    fn recycle(&mut self, url: &str, item_type: RecycleBinItemType, trashed: Trashed) {
        self.next_id += 1;
        let id = format!("deleted-{}", self.next_id);
        let deleted = epoch() + Duration::hours(1) + Duration::minutes(self.next_id as i64);
        self.bin.push((bin_item(&id, url, item_type, deleted), trashed));
    }

    fn restore(&mut self, item_id: &str) -> SharePointResult<()> {
        let pos = self
            .bin
            .iter()
            .position(|(item, _)| item.id == item_id)
            .ok_or_else(|| SharePointError::not_found(format!("No recycle bin item {}", item_id)))?;
        let (_, trashed) = self.bin.remove(pos);
        self.folders.extend(trashed.folders);
        self.files.extend(trashed.files);
        Ok(())
    }
}

#[async_trait]
impl DocumentLibrary for FakeLibrary {
    async fn get_folder(&self, folder_url: &str) -> SharePointResult<RemoteFolder> {
        let st = self.state.lock().unwrap();
        if st.folders.contains(folder_url) {
            Ok(remote_folder(folder_url))
        } else {
            Err(SharePointError::not_found(format!("File Not Found: {}", folder_url)))
        }
    }

    async fn list_files(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFile>> {
        let st = self.state.lock().unwrap();
        if st.fail_listing {
            return Err(SharePointError::network("listing unavailable"));
        }
        Ok(st
            .files
            .iter()
            .filter(|(url, _)| parent_of(url) == folder_url)
            .map(|(url, content)| remote_file(url, content))
            .collect())
    }

    async fn list_folders(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFolder>> {
        let st = self.state.lock().unwrap();
        if st.fail_listing {
            return Err(SharePointError::network("listing unavailable"));
        }
        Ok(st
            .folders
            .iter()
            .filter(|url| parent_of(url) == folder_url)
            .map(|url| remote_folder(url))
            .collect())
    }

    async fn create_folder(&self, parent_url: &str, name: &str) -> SharePointResult<RemoteFolder> {
        let mut st = self.state.lock().unwrap();
        if !st.folders.contains(parent_url) {
            return Err(SharePointError::not_found(parent_url.to_string()));
        }
        let url = format!("{}/{}", parent_url, name);
        st.folders.insert(url.clone());
        Ok(remote_folder(&url))
    }

    async fn upload_file(
        &self,
        folder_url: &str,
        name: &str,
        content: Vec<u8>,
        overwrite: bool,
    ) -> SharePointResult<RemoteFile> {
        let mut st = self.state.lock().unwrap();
        st.uploads.push((name.to_string(), overwrite));
        if st.fail_uploads.contains(name) {
            return Err(SharePointError::new(
                SharePointErrorCode::InternalError,
                format!("upload of {} rejected", name),
            ));
        }
        if !st.folders.contains(folder_url) {
            return Err(SharePointError::not_found(folder_url.to_string()));
        }
        let url = format!("{}/{}", folder_url, name);
        if !overwrite && st.files.contains_key(&url) {
            return Err(SharePointError::conflict(format!(
                "A file with the name {} already exists.",
                url
            )));
        }
        let file = remote_file(&url, &content);
        st.files.insert(url, content);
        Ok(file)
    }

    async fn recycle_file(&self, file_url: &str) -> SharePointResult<()> {
        let mut st = self.state.lock().unwrap();
        if st.fail_recycles.contains(file_url) {
            return Err(SharePointError::new(
                SharePointErrorCode::InsufficientPermissions,
                format!("cannot recycle {}", file_url),
            ));
        }
        let content = st
            .files
            .remove(file_url)
            .ok_or_else(|| SharePointError::not_found(format!("File Not Found: {}", file_url)))?;
        let trashed = Trashed {
            folders: Vec::new(),
            files: vec![(file_url.to_string(), content)],
        };
        st.recycle(file_url, RecycleBinItemType::File, trashed);
        Ok(())
    }

    async fn recycle_folder(&self, folder_url: &str) -> SharePointResult<()> {
        let mut st = self.state.lock().unwrap();
        if st.fail_recycles.contains(folder_url) {
            return Err(SharePointError::new(
                SharePointErrorCode::InsufficientPermissions,
                format!("cannot recycle {}", folder_url),
            ));
        }
        if !st.folders.contains(folder_url) {
            return Err(SharePointError::not_found(format!("File Not Found: {}", folder_url)));
        }
        let prefix = format!("{}/", folder_url);
        let folders: Vec<String> = st
            .folders
            .iter()
            .filter(|f| *f == folder_url || f.starts_with(&prefix))
            .cloned()
            .collect();
        let file_urls: Vec<String> = st
            .files
            .keys()
            .filter(|f| f.starts_with(&prefix))
            .cloned()
            .collect();

        let mut trashed = Trashed {
            folders,
            files: Vec::new(),
        };
        for f in &trashed.folders {
            st.folders.remove(f);
        }
        for url in file_urls {
            if let Some(content) = st.files.remove(&url) {
                trashed.files.push((url, content));
            }
        }
        st.recycle(folder_url, RecycleBinItemType::Folder, trashed);
        Ok(())
    }

    async fn recycle_bin_items(&self) -> SharePointResult<Vec<RecycleBinItem>> {
        let mut st = self.state.lock().unwrap();
        st.bin_reads += 1;
        Ok(st.bin.iter().map(|(item, _)| item.clone()).collect())
    }

    async fn restore_item(&self, item_id: &str) -> SharePointResult<()> {
        let mut st = self.state.lock().unwrap();
        st.plain_restores.push(item_id.to_string());
        if st.fail_restores.contains(item_id) || st.plain_restore_refused.contains(item_id) {
            return Err(SharePointError::new(
                SharePointErrorCode::InvalidRequest,
                format!("cannot restore {}", item_id),
            ));
        }
        st.restore(item_id)
    }

    async fn restore_folder_item(&self, item_id: &str) -> SharePointResult<()> {
        let mut st = self.state.lock().unwrap();
        st.folder_restores.push(item_id.to_string());
        if st.fail_restores.contains(item_id) {
            return Err(SharePointError::new(
                SharePointErrorCode::InvalidRequest,
                format!("cannot restore {}", item_id),
            ));
        }
        st.restore(item_id)
    }
}

/// A manager over `library` for the `/sites/Team` site.
pub fn manager(library: Arc<FakeLibrary>) -> SharePointFileManager {
    let credentials = Credentials::Client {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
    };
    let session = Session::from_library(SITE_URL, &credentials, library).shared();
    SharePointFileManager::new(session, BASE)
}

/// A local file named `name` inside `dir` holding `content`.
pub fn local_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}
