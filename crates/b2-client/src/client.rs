//! Main client implementation

use crate::{
    session::{Session, SessionState},
    types::*,
    ClientError, Config, Result,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

/// Path prefix of every B2 native API call
pub(crate) const API_PREFIX: &str = "/b2api/v1";

/// B2 storage client
///
/// Holds its own session: `authorize` must succeed before any other call.
/// The client is cheap to share behind an `Arc` and every call takes a
/// snapshot of the session, so re-authorizing while transfers run is safe.
pub struct B2Client {
    pub(crate) config: Config,
    pub(crate) http: Client,
    pub(crate) session: SessionState,
}

impl B2Client {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid user agent: {}", config.user_agent)))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            config,
            http,
            session: SessionState::default(),
        })
    }

    /// Create with endpoint URL
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::new(Config::new(endpoint))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the current session, if authorized
    pub fn session(&self) -> Option<Session> {
        self.session.snapshot()
    }

    /// Whether a usable token is installed
    pub fn is_authorized(&self) -> bool {
        self.session.require("is_authorized").is_ok()
    }

    /// Drop the current session
    pub fn sign_out(&self) {
        self.session.clear();
    }

    // ==================== Account ====================

    /// Exchange an account ID and application key for a session token.
    ///
    /// The previous session, if any, stays in place unless the whole
    /// exchange succeeds.
    #[instrument(skip(self, application_key))]
    pub async fn authorize(&self, account_id: &str, application_key: &str) -> Result<()> {
        const OP: &str = "b2_authorize_account";

        let url = format!("{}{}/{}", self.config.base_url(), API_PREFIX, OP);
        let credentials = STANDARD.encode(format!("{}:{}", account_id, application_key));

        debug!("Sending GET request to {}", url);
        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("Basic {}", credentials))
            .send()
            .await?;
        let reply: AuthorizeAccountResponse = parse_json(OP, check(OP, response).await?).await?;

        if reply.authorization_token.is_empty() {
            return Err(ClientError::parse(OP, "authorizationToken is empty"));
        }

        let session = Session {
            account_id: reply
                .account_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| account_id.to_string()),
            authorization_token: reply.authorization_token,
            api_url: reply.api_url,
            download_url: reply.download_url,
        };
        info!(account_id = %session.account_id, "authorized B2 account");
        self.session.install(session);
        Ok(())
    }

    // ==================== Bucket Operations ====================

    /// Create a bucket, returning its ID
    #[instrument(skip(self))]
    pub async fn create_bucket(&self, bucket_name: &str, bucket_type: BucketType) -> Result<String> {
        const OP: &str = "b2_create_bucket";

        let session = self.session.require(OP)?;
        let response = self
            .post_form(
                OP,
                &session,
                &[
                    ("accountId", session.account_id.as_str()),
                    ("bucketName", bucket_name),
                    ("bucketType", bucket_type.as_str()),
                ],
            )
            .await?;
        let reply: BucketResponse = parse_json(OP, response).await?;
        Ok(reply.bucket_id)
    }

    /// Delete a bucket by ID
    #[instrument(skip(self))]
    pub async fn delete_bucket(&self, bucket_id: &str) -> Result<()> {
        const OP: &str = "b2_delete_bucket";

        let session = self.session.require(OP)?;
        self.post_form(
            OP,
            &session,
            &[
                ("accountId", session.account_id.as_str()),
                ("bucketId", bucket_id),
            ],
        )
        .await?;
        Ok(())
    }

    // ==================== File Operations ====================

    /// Delete one version of a file
    #[instrument(skip(self))]
    pub async fn delete_file_version(&self, file_name: &str, file_id: &str) -> Result<()> {
        const OP: &str = "b2_delete_file_version";

        let session = self.session.require(OP)?;
        self.post_form(OP, &session, &[("fileName", file_name), ("fileId", file_id)])
            .await?;
        Ok(())
    }

    /// Get a URL (and its token) for uploading into a bucket
    #[instrument(skip(self))]
    pub async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrl> {
        const OP: &str = "b2_get_upload_url";

        let session = self.session.require(OP)?;
        let response = self
            .post_form(OP, &session, &[("bucketId", bucket_id)])
            .await?;
        let mut target: UploadUrl = parse_json(OP, response).await?;

        if target.upload_url.is_empty() {
            return Err(ClientError::parse(OP, "no upload URL returned"));
        }
        if target.bucket_id.is_empty() {
            target.bucket_id = bucket_id.to_string();
        }
        Ok(target)
    }

    // ==================== Helper Methods ====================

    pub(crate) fn api_base<'a>(&'a self, session: &'a Session) -> &'a str {
        session
            .api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or_else(|| self.config.base_url())
    }

    pub(crate) fn download_base<'a>(&'a self, session: &'a Session) -> &'a str {
        session
            .download_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or_else(|| self.config.base_url())
    }

    async fn post_form(
        &self,
        operation: &'static str,
        session: &Session,
        form: &[(&str, &str)],
    ) -> Result<Response> {
        let url = format!("{}{}/{}", self.api_base(session), API_PREFIX, operation);

        debug!("Sending POST request to {}", url);
        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, &session.authorization_token)
            .form(form)
            .send()
            .await?;

        check(operation, response).await
    }
}

/// Turn a non-success status into an `Api` error
pub(crate) async fn check(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return match response.text().await {
            Ok(text) => Err(ClientError::from_api_body(operation, status.as_u16(), &text)),
            Err(e) => {
                debug!(error = %e, "failed to read error body for {}", operation);
                Err(ClientError::Api {
                    operation,
                    status: status.as_u16(),
                    code: format!("HTTP{}", status.as_u16()),
                    message: format!("error body unreadable: {}", e),
                })
            }
        };
    }
    Ok(response)
}

pub(crate) async fn parse_json<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::parse(operation, e.to_string()))
}
