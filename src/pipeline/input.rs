//! Input resolution: turn a source string into a decoded raster.
//!
//! Collage sources go through an [`ImageLoader`]. The loader never fails the
//! whole build: it returns a [`LoadOutcome`], and the compositor turns
//! `Unavailable` into a blank cell plus a warning.
//!
//! Supported source strings for [`DefaultLoader`]:
//!
//! ```text
//! /photos/a.jpg                     local file (tokio::fs)
//! https://host/b.png                HTTP(S) download (reqwest)
//! data:image/png;base64,iVBORw0…    inline base64 payload
//! ```
//!
//! PDF inputs take a different route ([`resolve_pdf_input`]): pdfium wants a
//! file-system path, so URLs are downloaded into a `TempDir` that lives as
//! long as the returned [`ResolvedInput`].

use crate::config::LoaderConfig;
use crate::error::{ImgkitError, SourceError};
use crate::pipeline::codec;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// Result of asking a loader for one source.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(DynamicImage),
    Unavailable(SourceError),
}

impl From<Result<DynamicImage, SourceError>> for LoadOutcome {
    fn from(r: Result<DynamicImage, SourceError>) -> Self {
        match r {
            Ok(img) => LoadOutcome::Loaded(img),
            Err(e) => LoadOutcome::Unavailable(e),
        }
    }
}

impl LoadOutcome {
    pub fn into_result(self) -> Result<DynamicImage, SourceError> {
        match self {
            LoadOutcome::Loaded(img) => Ok(img),
            LoadOutcome::Unavailable(e) => Err(e),
        }
    }
}

/// Something that can turn a source string into a raster.
pub trait ImageLoader: Send + Sync {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, LoadOutcome>;
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the input string is a `data:` URI.
pub fn is_data_uri(input: &str) -> bool {
    input.starts_with("data:")
}

/// Load one mandatory image; any failure is fatal.
pub async fn load_required(
    loader: &dyn ImageLoader,
    source: &str,
) -> Result<DynamicImage, ImgkitError> {
    loader
        .load(source)
        .await
        .into_result()
        .map_err(SourceError::into_fatal)
}

// ── Default loader ───────────────────────────────────────────────────────

/// Loads local files, HTTP(S) URLs and base64 `data:` URIs.
#[derive(Debug, Clone)]
pub struct DefaultLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl DefaultLoader {
    pub fn new(config: LoaderConfig) -> Result<Self, ImgkitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(concat!("edgequake-imgkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImgkitError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Fetch the raw bytes behind a source string.
    pub async fn fetch_bytes(&self, source: &str) -> Result<Vec<u8>, SourceError> {
        if is_url(source) {
            self.download(source).await
        } else if is_data_uri(source) {
            self.decode_data_uri(source)
        } else {
            self.read_local(source).await
        }
    }

    /// Fetch and decode a source.
    pub async fn load_image(&self, source: &str) -> Result<DynamicImage, SourceError> {
        let bytes = self.fetch_bytes(source).await?;
        let input = source.to_string();
        tokio::task::spawn_blocking(move || {
            codec::decode(&bytes).map_err(|e| SourceError::Decode {
                input: input.clone(),
                detail: e.to_string(),
            })
        })
        .await
        .map_err(|e| SourceError::Decode {
            input: source.to_string(),
            detail: format!("decode task panicked: {e}"),
        })?
    }

    async fn read_local(&self, source: &str) -> Result<Vec<u8>, SourceError> {
        let path = Path::new(source);
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(source, e))?;
        self.check_size(source, metadata.len())?;

        let bytes = tokio::fs::read(path).await.map_err(|e| io_error(source, e))?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        info!("Downloading image from: {}", url);
        let timeout_secs = self.config.download_timeout_secs;
        let transport_err = |e: reqwest::Error| {
            if e.is_timeout() {
                SourceError::Timeout {
                    input: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                SourceError::Network {
                    input: url.to_string(),
                    detail: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(transport_err)?;
        if !response.status().is_success() {
            return Err(SourceError::HttpStatus {
                input: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        if let Some(len) = response.content_length() {
            self.check_size(url, len)?;
        }

        // Content-Length can be absent or wrong; enforce the cap while streaming.
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_err)?;
            self.check_size(url, (bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }

    fn decode_data_uri(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        let invalid = |detail: &str| SourceError::InvalidDataUri {
            input: truncate_for_log(uri),
            detail: detail.to_string(),
        };

        let rest = uri.strip_prefix("data:").ok_or_else(|| invalid("missing 'data:' prefix"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing ',' separator"))?;
        if !header.ends_with(";base64") {
            return Err(invalid("only base64 data URIs are supported"));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| invalid(&e.to_string()))?;
        self.check_size(&truncate_for_log(uri), bytes.len() as u64)?;
        Ok(bytes)
    }

    fn check_size(&self, source: &str, size: u64) -> Result<(), SourceError> {
        if size > self.config.max_source_bytes {
            return Err(SourceError::TooLarge {
                input: source.to_string(),
                size,
                limit: self.config.max_source_bytes,
            });
        }
        Ok(())
    }
}

impl ImageLoader for DefaultLoader {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, LoadOutcome> {
        async move { self.load_image(source).await.into() }.boxed()
    }
}

fn io_error(source: &str, e: std::io::Error) -> SourceError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound {
            input: source.to_string(),
        },
        std::io::ErrorKind::PermissionDenied => SourceError::PermissionDenied {
            input: source.to_string(),
        },
        _ => SourceError::Io {
            input: source.to_string(),
            detail: e.to_string(),
        },
    }
}

/// Data URIs can be megabytes long; keep error messages readable.
fn truncate_for_log(s: &str) -> String {
    const MAX: usize = 64;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

// ── In-memory loader ─────────────────────────────────────────────────────

/// Serves pre-decoded images by name; unknown names are `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    images: HashMap<String, DynamicImage>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, image: DynamicImage) {
        self.images.insert(source.into(), image);
    }

    pub fn with(mut self, source: impl Into<String>, image: DynamicImage) -> Self {
        self.insert(source, image);
        self
    }
}

impl ImageLoader for MemoryLoader {
    fn load<'a>(&'a self, source: &'a str) -> BoxFuture<'a, LoadOutcome> {
        let outcome = match self.images.get(source) {
            Some(img) => LoadOutcome::Loaded(img.clone()),
            None => LoadOutcome::Unavailable(SourceError::NotFound {
                input: source.to_string(),
            }),
        };
        futures::future::ready(outcome).boxed()
    }
}

// ── PDF inputs ───────────────────────────────────────────────────────────

/// The resolved PDF input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory that is removed
    /// when this value is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Resolve a PDF path or URL to a local file whose first bytes are `%PDF`.
pub async fn resolve_pdf_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, ImgkitError> {
    if is_url(input) {
        download_pdf(input, timeout_secs).await
    } else {
        resolve_local_pdf(input)
    }
}

fn resolve_local_pdf(path_str: &str) -> Result<ResolvedInput, ImgkitError> {
    let path = PathBuf::from(path_str);

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ImgkitError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImgkitError::InputNotFound {
                input: path_str.to_string(),
            });
        }
        Err(e) => {
            return Err(ImgkitError::ReadFailed {
                input: path_str.to_string(),
                reason: e.to_string(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_pdf(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ImgkitError> {
    let loader = DefaultLoader::new(LoaderConfig {
        download_timeout_secs: timeout_secs,
        max_source_bytes: u64::MAX,
    })?;
    let bytes = loader
        .fetch_bytes(url)
        .await
        .map_err(SourceError::into_fatal)?;

    let temp_dir = TempDir::new().map_err(|e| ImgkitError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(pdf_filename(url));

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(ImgkitError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ImgkitError::Internal(format!("Failed to write temp file: {}", e)))?;
    info!("Downloaded PDF to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment if it looks like a file name, else `downloaded.pdf`.
fn pdf_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
