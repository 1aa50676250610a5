//! Verified download example for the B2 client
//!
//! This example demonstrates:
//! - Authorizing an account
//! - Uploading a file with its SHA-1
//! - Downloading it back and checking the digest
//!
//! Run with:
//!   B2_ACCOUNT_ID=... B2_APPLICATION_KEY=... B2_BUCKET_ID=... \
//!   cargo run --example verified_download -- <local-file>

use b2_client::{B2Client, Config};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "b2_client=debug".into()),
        )
        .init();

    let account_id = std::env::var("B2_ACCOUNT_ID")?;
    let application_key = std::env::var("B2_APPLICATION_KEY")?;
    let bucket_id = std::env::var("B2_BUCKET_ID")?;
    let local = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: verified_download <local-file>"))?;

    let client = B2Client::new(Config::default().with_timeout(Duration::from_secs(120)))?;
    client.authorize(&account_id, &application_key).await?;
    println!("Authorized as {}", account_id);

    let target = client.get_upload_url(&bucket_id).await?;
    let name = std::path::Path::new(&local)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");
    let uploaded = client.upload_file(&target, &local, name).await?;
    println!("Uploaded {} as {}", name, uploaded.file_id);

    match client.download_file_by_id(&uploaded.file_id, "downloads").await {
        Ok(path) => println!("Verified download at {}", path.display()),
        Err(e) if e.is_integrity_failure() => {
            eprintln!("Corrupt transfer, retry the download: {}", e);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
