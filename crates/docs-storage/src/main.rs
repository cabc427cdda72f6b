use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docs_storage::config::Config;
use docs_storage::{StorageContext, StorageSelector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting docs-storage");
    info!("  Filesystem allowed: {}", config.allow_filesystem);
    info!("  WOPI allowed: {}", config.allow_wopi);
    info!("  Jail root: {}", config.jail_root.display());

    let ctx = StorageContext::new(config.security_config()?);
    let anonymizer = ctx.anonymizer.clone();
    let selector = StorageSelector::new(ctx)?;
    let auth = config.access_token();

    let mut storage = selector
        .select(&config.uri, &config.jail_root, &config.jail_path)
        .await?;
    info!("Selected {} storage", storage.kind());

    let identity = storage.fetch_metadata(&auth).await?;
    if let Some(file_info) = storage.file_info() {
        info!(
            "  {} ({} bytes, modified {}), owner {}",
            anonymizer.anonymize_url(&file_info.filename),
            file_info.size,
            file_info.modified_time,
            anonymizer.anonymize_username(&file_info.owner_id)
        );
    }
    info!(
        "  Editing as {} ({})",
        anonymizer.anonymize_username(&identity.user_name),
        anonymizer.anonymize_username(&identity.user_id)
    );
    if let Some(wopi_info) = storage.wopi_file_info() {
        info!(
            "  Can write: {}, CheckFileInfo took {:?}",
            wopi_info.can_write, wopi_info.call_duration
        );
    }

    let jailed = storage.load_to_local(&auth, None).await?;
    info!(
        "Loaded into jail at {}",
        anonymizer.anonymize_url(&jailed.to_string_lossy())
    );

    if config.save_back {
        let result = storage.save_from_local(&auth, None, None, false).await;
        if result.is_ok() {
            info!("Saved back: {:?}", result);
        } else {
            warn!("Save back did not succeed: {:?}", result);
            anyhow::bail!("save failed: {:?}", result);
        }
    }

    Ok(())
}
