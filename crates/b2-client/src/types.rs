//! Common types for the client SDK

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket visibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketType {
    /// Anyone can download files
    #[serde(rename = "allPublic")]
    AllPublic,
    /// Downloads require an authorization token
    #[serde(rename = "allPrivate")]
    AllPrivate,
}

impl BucketType {
    /// Wire spelling used by the B2 API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllPublic => "allPublic",
            Self::AllPrivate => "allPrivate",
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target returned by `b2_get_upload_url`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    /// Bucket the URL uploads into
    #[serde(default)]
    pub bucket_id: String,
    /// URL to POST file content to
    pub upload_url: String,
    /// Token for this upload URL only (not the account token)
    pub authorization_token: String,
}

/// A file stored by `upload_file`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Server file ID
    pub file_id: String,
    /// Name the file was stored under
    pub file_name: String,
    /// SHA-1 the server recorded
    #[serde(default)]
    pub content_sha1: String,
    /// Size in bytes
    #[serde(default)]
    pub content_length: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeAccountResponse {
    pub authorization_token: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BucketResponse {
    pub bucket_id: String,
}
