//! Verified downloads and uploads
//!
//! A download streams the body to disk, hashes the written file and checks
//! the result against `X-Bz-Content-Sha1`. Uploads hash first and send the
//! digest along so the service can reject corrupted bodies.

use crate::{
    client::{check, parse_json, B2Client, API_PREFIX},
    digest::{normalize_declared, sha1_file_blocking},
    types::{UploadUrl, UploadedFile},
    ClientError, Result,
};
use futures::StreamExt;
use reqwest::{header, Response};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// Header carrying the (percent-encoded) file name
pub const FILE_NAME_HEADER: &str = "X-Bz-File-Name";

/// Header carrying the hex SHA-1 of the content
pub const CONTENT_SHA1_HEADER: &str = "X-Bz-Content-Sha1";

/// Content type that lets B2 pick one from the file name
const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

/// Linux NAME_MAX
const NAME_MAX: usize = 255;

/// Progress of one download
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Requesting,
    /// Streaming the body to disk
    Receiving,
    /// Hashing what was written
    Verifying,
    Verified,
    Mismatched,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Mismatched | Self::Failed)
    }
}

/// Result of comparing a local file against the server digest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Where the bytes were written
    pub local_path: PathBuf,
    /// Digest from `X-Bz-Content-Sha1`, as sent
    pub declared_digest: String,
    /// Lowercase hex SHA-1 of the local file
    pub computed_digest: String,
    pub matched: bool,
}

impl TransferOutcome {
    /// The local path, or `Integrity` when the digests differ
    pub fn into_result(self) -> Result<PathBuf> {
        if self.matched {
            Ok(self.local_path)
        } else {
            Err(ClientError::Integrity {
                path: self.local_path,
                declared: self.declared_digest,
                computed: self.computed_digest,
            })
        }
    }
}

/// Hash `path` and compare it with a declared digest
pub async fn verify_file(
    path: impl Into<PathBuf>,
    declared: &str,
    block_size: usize,
) -> Result<TransferOutcome> {
    let local_path = path.into();
    let computed = sha1_file_blocking(local_path.clone(), block_size).await?;

    Ok(TransferOutcome {
        matched: computed.matches_declared(declared),
        computed_digest: computed.to_hex(),
        declared_digest: declared.to_string(),
        local_path,
    })
}

struct Transfer<'a> {
    file_id: &'a str,
    state: TransferState,
}

impl<'a> Transfer<'a> {
    fn new(file_id: &'a str) -> Self {
        Self {
            file_id,
            state: TransferState::Idle,
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug!(file_id = self.file_id, from = ?self.state, to = ?next, "transfer state");
        self.state = next;
    }
}

/// Removes a file being written unless `keep` is called.
///
/// Covers errors mid-stream as well as the download future being dropped
/// (timeout or cancellation by the caller).
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            debug!(path = %self.path.display(), "removing partial download");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl B2Client {
    /// Download a file by ID into `out_dir` and verify its SHA-1.
    ///
    /// The file is stored under the name the server reports, made safe for
    /// the local filesystem. On a digest mismatch the file is kept and its
    /// path returned inside `ClientError::Integrity`.
    #[instrument(skip(self, out_dir))]
    pub async fn download_file_by_id(
        &self,
        file_id: &str,
        out_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let mut transfer = Transfer::new(file_id);

        match self.receive(&mut transfer, out_dir.as_ref()).await {
            Ok(outcome) if outcome.matched => {
                transfer.advance(TransferState::Verified);
                outcome.into_result()
            }
            Ok(outcome) => {
                transfer.advance(TransferState::Mismatched);
                warn!(
                    path = %outcome.local_path.display(),
                    declared = %outcome.declared_digest,
                    computed = %outcome.computed_digest,
                    "downloaded content does not match server SHA-1"
                );
                outcome.into_result()
            }
            Err(e) => {
                transfer.advance(TransferState::Failed);
                Err(e)
            }
        }
    }

    async fn receive(&self, transfer: &mut Transfer<'_>, out_dir: &Path) -> Result<TransferOutcome> {
        const OP: &str = "b2_download_file_by_id";

        let session = self.session.require(OP)?;
        transfer.advance(TransferState::Requesting);

        let url = format!("{}{}/{}", self.download_base(&session), API_PREFIX, OP);
        debug!("Sending GET request to {}", url);
        let response = self
            .http
            .get(&url)
            .query(&[("fileId", transfer.file_id)])
            .header(header::AUTHORIZATION, &session.authorization_token)
            .send()
            .await?;
        let response = check(OP, response).await?;

        let remote_name = required_header(OP, &response, FILE_NAME_HEADER)?;
        let declared = required_header(OP, &response, CONTENT_SHA1_HEADER)?;
        let file_name = local_file_name(&remote_name)
            .ok_or_else(|| ClientError::parse(OP, format!("unusable file name {:?}", remote_name)))?;

        tokio::fs::create_dir_all(out_dir).await?;
        let path = out_dir.join(file_name);

        transfer.advance(TransferState::Receiving);
        write_body(response, &path).await?;

        transfer.advance(TransferState::Verifying);
        verify_file(path, &declared, self.config.block_size).await
    }

    /// Upload a local file through a URL from `get_upload_url`
    #[instrument(skip(self, target, local_path))]
    pub async fn upload_file(
        &self,
        target: &UploadUrl,
        local_path: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<UploadedFile> {
        const OP: &str = "b2_upload_file";

        if target.authorization_token.is_empty() {
            return Err(ClientError::Unauthenticated { operation: OP });
        }

        let local_path = local_path.as_ref();
        let sha1 = sha1_file_blocking(local_path.to_path_buf(), self.config.block_size).await?;
        let file = tokio::fs::File::open(local_path).await?;
        let content_length = file.metadata().await?.len();
        let content_type = mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(AUTO_CONTENT_TYPE);

        debug!("Sending POST request to {}", target.upload_url);
        let response = self
            .http
            .post(&target.upload_url)
            .header(header::AUTHORIZATION, &target.authorization_token)
            .header(FILE_NAME_HEADER, urlencoding::encode(file_name).into_owned())
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, content_length)
            .header(CONTENT_SHA1_HEADER, sha1.to_hex())
            .body(file)
            .send()
            .await?;
        let response = check(OP, response).await?;
        let uploaded: UploadedFile = parse_json(OP, response).await?;

        if !uploaded.content_sha1.is_empty()
            && normalize_declared(&uploaded.content_sha1) != sha1.to_hex()
        {
            return Err(ClientError::Integrity {
                path: local_path.to_path_buf(),
                declared: uploaded.content_sha1,
                computed: sha1.to_hex(),
            });
        }
        Ok(uploaded)
    }
}

async fn write_body(response: Response, path: &Path) -> Result<()> {
    let guard = PartialFile::new(path.to_path_buf());
    let mut file = tokio::fs::File::create(path).await?;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    guard.keep();
    Ok(())
}

fn required_header(operation: &'static str, response: &Response, name: &str) -> Result<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::parse(operation, format!("missing {} header", name)))
}

/// Turn a server file name into a single safe path component.
///
/// The name is percent-decoded, then only what cannot appear in one path
/// component is escaped back: `/`, backslash, NUL and control characters become
/// `%XX`, and so does `%` itself, which keeps distinct remote names distinct
/// on disk. Everything else, dots and underscores included, is kept.
/// Returns `None` for `.`, `..`, an empty name, or one longer than
/// `NAME_MAX` bytes once escaped.
pub fn local_file_name(remote: &str) -> Option<String> {
    let decoded = urlencoding::decode(remote).ok()?;
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        return None;
    }

    let mut out = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        if c == '%' || c == '/' || c == '\\' || c.is_control() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        } else {
            out.push(c);
        }
    }

    (out.len() <= NAME_MAX).then_some(out)
}
