//! # spm-sharepoint: SharePoint Document Library Client
//!
//! Convenience layer over a SharePoint document library, built against the
//! **SharePoint REST API** (`_api/web`, `_api/site`).
//!
//! ## Capabilities
//!
//! - **Authentication** – user credentials via SAML federation (FedAuth /
//!   rtFa cookies + request digest) or app-only client credentials via the
//!   Azure ACS token endpoint with realm discovery.
//! - **Folder context** – bind a library + subfolder and run every file
//!   operation against it.
//! - **Listing** – immediate files and folders of the bound folder.
//! - **Uploads** – overwrite or collision-free (`name_1.ext`, `name_2.ext`, …)
//!   uploads, single or batched, with per-file reports.
//! - **Deletes** – single, batched, whole-folder contents, or the bound folder
//!   itself; everything goes to the recycle bin.
//! - **Recovery** – list the most recently deleted items and restore them,
//!   falling back to a rename-on-conflict folder restore.

pub mod types;
pub mod error;
pub mod auth;
pub mod api_client;
pub mod remote;
pub mod rest;
pub mod naming;
pub mod recycle_bin;
pub mod session;
pub mod file_manager;

// Re-exports
pub use error::{SharePointError, SharePointErrorCode, SharePointResult};
pub use file_manager::SharePointFileManager;
pub use naming::{resolve_unique_name, split_name};
pub use recycle_bin::{most_recent, DEFAULT_RECENT_ITEMS};
pub use remote::DocumentLibrary;
pub use session::{Session, SharedSession};
pub use types::*;
