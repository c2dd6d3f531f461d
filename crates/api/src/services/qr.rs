//! QR code links and image rendering.
//!
//! A participant's QR code encodes the public scan URL
//! `<base>/scan?code=<token>`. Images are produced by an external renderer
//! (a `qrserver`-compatible HTTP endpoint) and proxied through this service.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::config::QrConfig;

/// Error type for QR rendering.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Invalid QR configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("QR renderer returned status {0}")]
    RendererStatus(u16),
}

/// Extract the token from raw scanner input.
///
/// Scanners read the full scan URL off the badge; a hand-typed token is
/// used as is. Returns an empty string for blank input.
pub fn extract_code(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "code")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Builds scan and image URLs for participant tokens.
#[derive(Debug, Clone)]
pub struct QrLinks {
    scan_base: Url,
    renderer: Url,
    size: u32,
    margin: u32,
}

impl QrLinks {
    pub fn new(config: &QrConfig) -> Result<Self, QrError> {
        let base = Url::parse(&config.public_base_url).map_err(|e| {
            QrError::InvalidConfig(format!("public_base_url {}: {}", config.public_base_url, e))
        })?;
        let mut scan_base = base;
        scan_base
            .path_segments_mut()
            .map_err(|_| {
                QrError::InvalidConfig(format!(
                    "public_base_url {} cannot carry a path",
                    config.public_base_url
                ))
            })?
            .pop_if_empty()
            .push("scan");
        scan_base.set_query(None);
        let renderer = Url::parse(&config.renderer_url).map_err(|e| {
            QrError::InvalidConfig(format!("renderer_url {}: {}", config.renderer_url, e))
        })?;

        Ok(Self {
            scan_base,
            renderer,
            size: config.size,
            margin: config.margin,
        })
    }

    /// URL encoded in the participant's QR code.
    pub fn scan_url(&self, code: &str) -> String {
        let mut url = self.scan_base.clone();
        url.query_pairs_mut().clear().append_pair("code", code);
        url.into()
    }

    /// Renderer URL producing the QR image for `code`.
    pub fn image_url(&self, code: &str) -> String {
        let mut url = self.renderer.clone();
        url.query_pairs_mut()
            .append_pair("size", &format!("{0}x{0}", self.size))
            .append_pair("data", &self.scan_url(code))
            .append_pair("margin", &self.margin.to_string());
        url.into()
    }
}

/// Produces PNG images for QR payloads.
#[async_trait::async_trait]
pub trait QrRenderer: Send + Sync {
    async fn render_png(&self, image_url: &str) -> Result<Vec<u8>, QrError>;
}

/// Fetches images from the configured HTTP renderer.
pub struct HttpQrRenderer {
    client: Client,
}

impl HttpQrRenderer {
    pub fn new(config: &QrConfig) -> Result<Self, QrError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl QrRenderer for HttpQrRenderer {
    async fn render_png(&self, image_url: &str) -> Result<Vec<u8>, QrError> {
        let response = self.client.get(image_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "QR renderer request failed");
            return Err(QrError::RendererStatus(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Mock renderer for development and testing.
///
/// Returns a fixed PNG signature instead of calling out.
#[derive(Debug, Clone, Default)]
pub struct MockQrRenderer {
    /// Whether to simulate renderer failures.
    pub simulate_failure: bool,
}

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

impl MockQrRenderer {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl QrRenderer for MockQrRenderer {
    async fn render_png(&self, image_url: &str) -> Result<Vec<u8>, QrError> {
        if self.simulate_failure {
            tracing::warn!(image_url, "Mock QR renderer simulating failure");
            return Err(QrError::RendererStatus(502));
        }
        tracing::debug!(image_url, "Mock: Would fetch QR image");
        Ok(PNG_SIGNATURE.to_vec())
    }
}
