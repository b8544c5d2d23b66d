//! Support code for the `spm` binary: configuration loading and logging.
//! The SharePoint client itself lives in the `spm-sharepoint` crate.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, FolderSettings};
