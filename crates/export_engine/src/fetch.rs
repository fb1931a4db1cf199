use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::StorageSettings;
use crate::types::{FailureKind, ImageFetchError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted `Content-Type` prefixes. A response without the header is accepted.
    pub allowed_content_type_prefixes: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_type_prefixes: vec!["image/".to_string()],
        }
    }
}

/// Resolves the `src` of an image block to its raw bytes.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, src: &str) -> Result<Bytes, ImageFetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestImageFetcher {
    settings: FetchSettings,
    base_url: Option<Url>,
    client: reqwest::Client,
}

impl ReqwestImageFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, ImageFetchError> {
        let client = build_client(&settings)?;
        Ok(Self {
            settings,
            base_url: None,
            client,
        })
    }

    /// Relative references such as `/storage/a.png` are joined onto `base`.
    pub fn with_base_url(mut self, base: &str) -> Result<Self, ImageFetchError> {
        let base = Url::parse(base)
            .map_err(|err| ImageFetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        self.base_url = Some(base);
        Ok(self)
    }

    fn resolve(&self, src: &str) -> Result<Url, ImageFetchError> {
        match Url::parse(src) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(src)
                    .map_err(|err| ImageFetchError::new(FailureKind::InvalidUrl, err.to_string())),
                None => Err(ImageFetchError::new(
                    FailureKind::InvalidUrl,
                    format!("relative image reference {src:?} without a base url"),
                )),
            },
            Err(err) => Err(ImageFetchError::new(FailureKind::InvalidUrl, err.to_string())),
        }
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        self.settings
            .allowed_content_type_prefixes
            .iter()
            .any(|prefix| ct.starts_with(&prefix.to_ascii_lowercase()))
    }

    fn too_large(&self, actual: u64) -> ImageFetchError {
        ImageFetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, ImageFetchError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| ImageFetchError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl ImageSource for ReqwestImageFetcher {
    async fn load(&self, src: &str) -> Result<Bytes, ImageFetchError> {
        let url = self.resolve(src)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ImageFetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ImageFetchError::new(FailureKind::NotFound, url.to_string()));
        }
        if !status.is_success() {
            return Err(ImageFetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(ImageFetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            body.extend_from_slice(&chunk);
        }

        engine_debug!("Fetched image {} ({} bytes)", url, body.len());
        Ok(body.freeze())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ImageFetchError {
    if err.is_timeout() {
        return ImageFetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return ImageFetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    ImageFetchError::new(FailureKind::Network, err.to_string())
}

/// Serves images whose path starts with the storage URL prefix from a local
/// directory. Absolute URLs are matched on their path.
#[derive(Debug, Clone)]
pub struct StorageImageSource {
    root: PathBuf,
    url_prefix: String,
    max_bytes: u64,
}

impl StorageImageSource {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
            max_bytes,
        }
    }

    /// Local path for `src`, or `None` when `src` is outside the storage prefix.
    pub fn local_path(&self, src: &str) -> Result<Option<PathBuf>, ImageFetchError> {
        let path = match Url::parse(src) {
            Ok(url) => url.path().to_string(),
            Err(_) => src.split(['?', '#']).next().unwrap_or(src).to_string(),
        };
        let Some(relative) = path.strip_prefix(&self.url_prefix) else {
            return Ok(None);
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(ImageFetchError::new(
                FailureKind::InvalidUrl,
                format!("storage path {src:?} escapes the storage root"),
            ));
        }
        Ok(Some(self.root.join(relative)))
    }
}

#[async_trait::async_trait]
impl ImageSource for StorageImageSource {
    async fn load(&self, src: &str) -> Result<Bytes, ImageFetchError> {
        let Some(path) = self.local_path(src)? else {
            return Err(ImageFetchError::new(
                FailureKind::NotFound,
                format!("{src:?} is not a storage reference"),
            ));
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(|err| {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                FailureKind::NotFound
            } else {
                FailureKind::Io
            };
            ImageFetchError::new(kind, format!("{}: {err}", path.display()))
        })?;
        if metadata.len() > self.max_bytes {
            return Err(ImageFetchError::new(
                FailureKind::TooLarge {
                    max_bytes: self.max_bytes,
                    actual: Some(metadata.len()),
                },
                path.display().to_string(),
            ));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| ImageFetchError::new(FailureKind::Io, err.to_string()))?;
        engine_debug!("Loaded image {} from storage", path.display());
        Ok(Bytes::from(bytes))
    }
}

/// Local storage first, then the network.
pub struct ChainedImageResolver {
    storage: Option<StorageImageSource>,
    remote: Arc<dyn ImageSource>,
}

impl ChainedImageResolver {
    pub fn new(storage: Option<StorageImageSource>, remote: Arc<dyn ImageSource>) -> Self {
        Self { storage, remote }
    }

    /// Wire the default resolver from settings.
    pub fn from_settings(
        fetch: &FetchSettings,
        storage: &StorageSettings,
    ) -> Result<Self, ImageFetchError> {
        let mut fetcher = ReqwestImageFetcher::new(fetch.clone())?;
        if let Some(base) = storage.public_base_url.as_deref() {
            fetcher = fetcher.with_base_url(base)?;
        }
        let local = storage.root.as_ref().map(|root| {
            StorageImageSource::new(root.clone(), storage.url_prefix.clone(), fetch.max_bytes)
        });
        Ok(Self::new(local, Arc::new(fetcher)))
    }
}

#[async_trait::async_trait]
impl ImageSource for ChainedImageResolver {
    async fn load(&self, src: &str) -> Result<Bytes, ImageFetchError> {
        if let Some(storage) = &self.storage {
            if storage.local_path(src)?.is_some() {
                match storage.load(src).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(err) => {
                        engine_debug!("Storage lookup for {} failed ({}), trying remote", src, err)
                    }
                }
            }
        }
        self.remote.load(src).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_paths_map_under_root() {
        let source = StorageImageSource::new("/srv/files", "/storage/", 1024);
        assert_eq!(
            source.local_path("/storage/ab/cd.png").unwrap(),
            Some(PathBuf::from("/srv/files/ab/cd.png"))
        );
        assert_eq!(
            source
                .local_path("https://example.com/storage/x.png?v=2")
                .unwrap(),
            Some(PathBuf::from("/srv/files/x.png"))
        );
        assert_eq!(source.local_path("/other/x.png").unwrap(), None);
    }

    #[test]
    fn storage_rejects_traversal() {
        let source = StorageImageSource::new("/srv/files", "/storage/", 1024);
        let err = source.local_path("/storage/../etc/passwd").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }

    #[test]
    fn content_type_prefix_match_ignores_parameters() {
        let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
        assert!(fetcher.is_content_type_allowed("image/png"));
        assert!(fetcher.is_content_type_allowed("Image/JPEG; charset=binary"));
        assert!(!fetcher.is_content_type_allowed("text/html"));
    }

    #[test]
    fn relative_reference_needs_base() {
        let fetcher = ReqwestImageFetcher::new(FetchSettings::default()).unwrap();
        assert_eq!(
            fetcher.resolve("/a.png").unwrap_err().kind,
            FailureKind::InvalidUrl
        );
        let fetcher = fetcher.with_base_url("https://blog.example/").unwrap();
        assert_eq!(
            fetcher.resolve("/a.png").unwrap().as_str(),
            "https://blog.example/a.png"
        );
    }
}
