//! Artifact resolution: turn a classified [`Reference`] into raw bytes.

use std::fs;
use std::io::Read;

use anyhow::Result;
use reqwest::blocking::{Client, Response};
use tracing::{debug, instrument};

use crate::config::SessionConfig;
use crate::core::reference::Reference;
use crate::error::ResolveError;
use crate::io::http::create_http_client;

/// Source of artifact bytes.
pub trait Resolve {
    fn resolve(&self, reference: &Reference) -> Result<Vec<u8>, ResolveError>;
}

/// Default cap on the size of one artifact.
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;

/// Resolves local files from disk and remote URLs over HTTP.
///
/// Artifacts larger than `max_bytes` fail instead of being read into memory.
pub struct ArtifactResolver {
    client: Client,
    max_bytes: u64,
}

impl ArtifactResolver {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = create_http_client(config.connect_timeout(), config.fetch_timeout())?;
        Ok(Self::with_client(client).with_limit(config.max_artifact_bytes))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }

    pub fn with_limit(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn read_local(&self, url: &url::Url) -> Result<Vec<u8>, ResolveError> {
        let path = url.to_file_path().map_err(|()| ResolveError::InvalidFileUrl {
            url: url.to_string(),
        })?;
        let size = fs::metadata(&path)
            .map_err(|source| ResolveError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        if size > self.max_bytes {
            return Err(ResolveError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        fs::read(&path).map_err(|source| ResolveError::Io { path, source })
    }

    fn read_remote(&self, url: &url::Url) -> Result<Vec<u8>, ResolveError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| ResolveError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        self.read_limited(response, url)
    }

    /// Stream the body, failing as soon as it exceeds the size cap.
    fn read_limited(&self, response: Response, url: &url::Url) -> Result<Vec<u8>, ResolveError> {
        let too_large = || ResolveError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        let mut reader = response;
        let mut buffer = [0u8; 8192];
        loop {
            let n = reader.read(&mut buffer).map_err(|source| ResolveError::Body {
                url: url.to_string(),
                source,
            })?;
            if n == 0 {
                break;
            }
            if (bytes.len() + n) as u64 > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&buffer[..n]);
        }
        Ok(bytes)
    }
}

impl Resolve for ArtifactResolver {
    #[instrument(skip_all, fields(kind = reference.kind()))]
    fn resolve(&self, reference: &Reference) -> Result<Vec<u8>, ResolveError> {
        let bytes = match reference {
            Reference::Literal(text) => text.as_bytes().to_vec(),
            Reference::LocalFile(url) => self.read_local(url)?,
            Reference::Remote(url) => self.read_remote(url)?,
        };
        debug!(reference = %reference, bytes = bytes.len(), "artifact resolved");
        Ok(bytes)
    }
}
