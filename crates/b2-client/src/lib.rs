//! # B2 Client SDK
//!
//! A client SDK for the Backblaze B2 native API.
//!
//! ## Features
//!
//! - **Sessions**: one `authorize` call, then every request reuses the token
//! - **Verified Downloads**: content is hashed in bounded memory and checked
//!   against the SHA-1 the service declares
//! - **Uploads**: the SHA-1 is computed up front and sent with the body
//!
//! ## Example
//!
//! ```rust,ignore
//! use b2_client::{B2Client, BucketType, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = B2Client::new(Config::default())?;
//!     client.authorize("account-id", "application-key").await?;
//!
//!     let bucket_id = client.create_bucket("photos", BucketType::AllPrivate).await?;
//!
//!     let target = client.get_upload_url(&bucket_id).await?;
//!     let file = client.upload_file(&target, "cat.jpg", "cat.jpg").await?;
//!
//!     match client.download_file_by_id(&file.file_id, "downloads").await {
//!         Ok(path) => println!("saved {}", path.display()),
//!         Err(e) if e.is_integrity_failure() => eprintln!("corrupt transfer, retry: {}", e),
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
pub mod digest;
mod error;
mod session;
mod transfer;
mod types;

pub use client::B2Client;
pub use config::{Config, DEFAULT_BLOCK_SIZE};
pub use digest::{sha1_bytes, sha1_file, sha1_reader, Sha1Digest};
pub use error::{ClientError, Result};
pub use session::Session;
pub use transfer::{
    local_file_name, verify_file, TransferOutcome, TransferState, CONTENT_SHA1_HEADER,
    FILE_NAME_HEADER,
};
pub use types::*;
