//! `spm [CONFIG]`: bind the configured library folder and list it.

use spm_lib::{logging, AppConfig};
use spm_sharepoint::SharePointFileManager;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let config = AppConfig::load(std::env::args_os().nth(1).map(PathBuf::from))?;
    tracing::info!(site = %config.sharepoint.site_url, "loaded configuration");

    let mut manager = SharePointFileManager::connect(&config.sharepoint).await?;
    manager
        .set_folder_ctx(&config.folder.library_name, &config.folder.folder_name)
        .await?;

    let files = manager.get_files().await?;
    println!("Files in folder:");
    for file in &files {
        println!("{}", file.name);
    }

    let folders = manager.get_folders().await?;
    println!("\nFolders in folder:");
    for folder in &folders {
        println!("{}", folder.name);
    }

    tracing::info!(files = files.len(), folders = folders.len(), "listing complete");
    Ok(())
}
