//! `DocumentLibrary` over the SharePoint REST API.
//!
//! Files and folders are addressed through the `…ByServerRelativePath`
//! endpoints so names containing `%`, `#` or `'` round-trip intact.

use crate::sharepoint::api_client::SharePointApiClient;
use crate::sharepoint::error::SharePointResult;
use crate::sharepoint::remote::DocumentLibrary;
use crate::sharepoint::types::{RecycleBinItem, RemoteFile, RemoteFolder};
use async_trait::async_trait;
use log::{debug, info};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Characters that must be encoded inside a `DecodedUrl='…'` literal.
const PATH_LITERAL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// REST-backed document library.
#[derive(Debug)]
pub struct SharePointRestLibrary {
    client: SharePointApiClient,
}

impl SharePointRestLibrary {
    pub fn new(client: SharePointApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SharePointApiClient {
        &self.client
    }
}

#[async_trait]
impl DocumentLibrary for SharePointRestLibrary {
    async fn get_folder(&self, folder_url: &str) -> SharePointResult<RemoteFolder> {
        let resp = self.client.get(&folder_endpoint(folder_url)).await?;
        let folder: RemoteFolder = serde_json::from_value(resp)?;
        Ok(folder)
    }

    async fn list_files(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFile>> {
        let path = format!("{}/Files", folder_endpoint(folder_url));
        let files: Vec<RemoteFile> = parse_collection(self.client.get(&path).await?)?;
        debug!("Listed {} files in {}", files.len(), folder_url);
        Ok(files)
    }

    async fn list_folders(&self, folder_url: &str) -> SharePointResult<Vec<RemoteFolder>> {
        let path = format!("{}/Folders", folder_endpoint(folder_url));
        let folders: Vec<RemoteFolder> = parse_collection(self.client.get(&path).await?)?;
        debug!("Listed {} folders in {}", folders.len(), folder_url);
        Ok(folders)
    }

    async fn create_folder(&self, parent_url: &str, name: &str) -> SharePointResult<RemoteFolder> {
        let path = format!(
            "{}/Folders/AddUsingPath(DecodedUrl='{}')",
            folder_endpoint(parent_url),
            path_literal(name)
        );
        let resp = self.client.post(&path, None).await?;
        let folder: RemoteFolder = serde_json::from_value(resp)?;
        info!("Created folder {}", folder.server_relative_url);
        Ok(folder)
    }

    async fn upload_file(
        &self,
        folder_url: &str,
        name: &str,
        content: Vec<u8>,
        overwrite: bool,
    ) -> SharePointResult<RemoteFile> {
        let path = upload_endpoint(folder_url, name, overwrite);
        let resp = self.client.post_bytes(&path, content).await?;
        let file: RemoteFile = serde_json::from_value(resp)?;
        Ok(file)
    }

    async fn recycle_file(&self, file_url: &str) -> SharePointResult<()> {
        let path = format!(
            "_api/web/GetFileByServerRelativePath(DecodedUrl='{}')/recycle()",
            path_literal(file_url)
        );
        self.client.post(&path, None).await?;
        Ok(())
    }

    async fn recycle_folder(&self, folder_url: &str) -> SharePointResult<()> {
        let path = format!("{}/recycle()", folder_endpoint(folder_url));
        self.client.post(&path, None).await?;
        Ok(())
    }

    async fn recycle_bin_items(&self) -> SharePointResult<Vec<RecycleBinItem>> {
        let items: Vec<RecycleBinItem> =
            parse_collection(self.client.get("_api/site/RecycleBin").await?)?;
        debug!("Recycle bin holds {} items", items.len());
        Ok(items)
    }

    async fn restore_item(&self, item_id: &str) -> SharePointResult<()> {
        let path = format!("_api/site/RecycleBin('{}')/restore()", item_id.replace('\'', "''"));
        self.client.post(&path, None).await?;
        Ok(())
    }

    async fn restore_folder_item(&self, item_id: &str) -> SharePointResult<()> {
        let body = restore_by_ids_body(item_id);
        self.client
            .post("_api/site/RecycleBin/RestoreByIds", Some(&body))
            .await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Endpoint builders
// ═══════════════════════════════════════════════════════════════════════

/// Quote a server-relative path for use inside `DecodedUrl='…'`.
fn path_literal(path: &str) -> String {
    utf8_percent_encode(&path.replace('\'', "''"), PATH_LITERAL).to_string()
}

fn folder_endpoint(folder_url: &str) -> String {
    format!(
        "_api/web/GetFolderByServerRelativePath(DecodedUrl='{}')",
        path_literal(folder_url)
    )
}

fn upload_endpoint(folder_url: &str, name: &str, overwrite: bool) -> String {
    format!(
        "{}/Files/AddUsingPath(DecodedUrl='{}',Overwrite={})",
        folder_endpoint(folder_url),
        path_literal(name),
        overwrite
    )
}

fn restore_by_ids_body(item_id: &str) -> serde_json::Value {
    json!({
        "ids": [item_id],
        "bRenameExistingItems": true,
    })
}

/// Items of a `{ "value": [...] }` collection reply.
fn parse_collection<T: DeserializeOwned>(resp: serde_json::Value) -> SharePointResult<Vec<T>> {
    match resp {
        serde_json::Value::Object(mut map) => match map.remove("value") {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(Vec::new()),
        },
        serde_json::Value::Null => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
