//! Background image retrieval.
//!
//! Supports `http`/`https` URLs, local `file` URLs and inline `data:` URLs
//! (base64 or percent-encoded).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use url::Url;

use crate::error::{FetchError, FetchResult};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum image size in bytes.
const DEFAULT_MAX_BYTES: usize = 32 * 1024 * 1024;

/// Limits applied to every fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout for HTTP fetches.
    pub timeout: Duration,
    /// Largest accepted image, in bytes.
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl FetchConfig {
    /// Create a fetch configuration from environment variables or defaults.
    ///
    /// Environment variables:
    /// - `EMOJI_ART_FETCH_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `EMOJI_ART_FETCH_MAX_BYTES`: Largest accepted image (default: 32 MiB)
    #[must_use]
    pub fn from_env() -> Self {
        let timeout = std::env::var("EMOJI_ART_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_bytes = std::env::var("EMOJI_ART_FETCH_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BYTES);
        Self {
            timeout: Duration::from_secs(timeout),
            max_bytes,
        }
    }
}

/// Retrieves the raw bytes behind a background reference.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the bytes at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be retrieved.
    async fn fetch(&self, url: &Url) -> FetchResult<Vec<u8>>;
}

/// The default fetcher, backed by `reqwest` and `tokio::fs`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the given limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("emoji-art/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// The limits in effect.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch_http(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let limit = self.config.max_bytes;
        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn fetch_file(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let path = url.to_file_path().map_err(|()| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a local file URL: {url}"),
            )
        })?;
        let bytes = tokio::fs::read(&path).await?;
        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge {
                limit: self.config.max_bytes,
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => self.fetch_file(url).await,
            "data" => decode_data_url(url),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Decode the payload of a `data:` URL.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns [`FetchError::InvalidDataUrl`] if the URL is malformed.
pub fn decode_data_url(url: &Url) -> FetchResult<Vec<u8>> {
    let uri_data = url
        .as_str()
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::InvalidDataUrl("not a data URL".to_string()))?;

    let (metadata, encoded) = uri_data
        .split_once(',')
        .ok_or_else(|| FetchError::InvalidDataUrl("missing comma".to_string()))?;

    if metadata.ends_with(";base64") {
        let payload = percent_decode(encoded)?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| FetchError::InvalidDataUrl(format!("bad base64: {e}")))
    } else {
        percent_decode(encoded)
    }
}

fn percent_decode(input: &str) -> FetchResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| FetchError::InvalidDataUrl("bad percent escape".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_data_url() {
        let url = Url::parse("data:text/plain;base64,aGVsbG8=").expect("url");
        assert_eq!(decode_data_url(&url).expect("decode"), b"hello");
    }

    #[test]
    fn test_decode_percent_data_url() {
        let url = Url::parse("data:,a%20b%2Cc").expect("url");
        assert_eq!(decode_data_url(&url).expect("decode"), b"a b,c");
    }

    #[test]
    fn test_invalid_data_urls() {
        let missing_comma = Url::parse("data:image/png").expect("url");
        assert!(matches!(
            decode_data_url(&missing_comma),
            Err(FetchError::InvalidDataUrl(_))
        ));

        let bad_escape = Url::parse("data:,%zz").expect("url");
        assert!(decode_data_url(&bad_escape).is_err());

        let bad_base64 = Url::parse("data:image/png;base64,@@@").expect("url");
        assert!(decode_data_url(&bad_base64).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_bytes, 32 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).expect("client");
        let url = Url::parse("ftp://example.com/a.png").expect("url");
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[tokio::test]
    async fn test_fetch_file_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bg.bin");
        std::fs::write(&path, b"pixels").expect("write");

        let fetcher = HttpFetcher::new(FetchConfig::default()).expect("client");
        let url = Url::from_file_path(&path).expect("file url");
        assert_eq!(fetcher.fetch(&url).await.expect("fetch"), b"pixels");
    }

    #[tokio::test]
    async fn test_fetch_file_over_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0_u8; 64]).expect("write");

        let fetcher = HttpFetcher::new(FetchConfig {
            max_bytes: 16,
            ..FetchConfig::default()
        })
        .expect("client");
        let url = Url::from_file_path(&path).expect("file url");
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::TooLarge { limit: 16 })
        ));
    }
}
