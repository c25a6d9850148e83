//! Text detection through the `tesseract` CLI

use crate::backend::{response::BackendError, TextDetector};
use crate::core::config::OcrConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const OCR_CAPABILITY: &str = "OCR text detection";

/// An image on disk
///
/// Images built from bytes are spilled to a temporary file that lives as
/// long as the last clone of the `Image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    path: PathBuf,
    #[serde(skip)]
    temp: Option<Arc<NamedTempFile>>,
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Image {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp: None,
        }
    }

    /// Write encoded image bytes to a temporary file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BackendError> {
        let mut file = NamedTempFile::new()
            .map_err(|e| BackendError::Internal(format!("Failed to create temp image: {}", e)))?;
        file.write_all(bytes)
            .map_err(|e| BackendError::Internal(format!("Failed to write temp image: {}", e)))?;
        Ok(Self {
            path: file.path().to_path_buf(),
            temp: Some(Arc::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map ISO 639-1 codes to tesseract language packs; unknown codes pass through
pub fn tesseract_language(code: &str) -> &str {
    match code {
        "en" => "eng",
        "fr" => "fra",
        "de" => "deu",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "nl" => "nld",
        "ru" => "rus",
        "ja" => "jpn",
        "ko" => "kor",
        "zh" | "ch_sim" => "chi_sim",
        "ch_tra" => "chi_tra",
        other => other,
    }
}

/// Detector that shells out to `tesseract <image> stdout -l <langs>`
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    binary: String,
    timeout_secs: u64,
}

impl TesseractDetector {
    pub fn new(binary: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.binary.clone(), config.timeout_secs)
    }
}

#[async_trait]
impl TextDetector for TesseractDetector {
    async fn detect(&self, image: &Image, languages: &[String]) -> Result<String, BackendError> {
        let langs = languages
            .iter()
            .map(|l| tesseract_language(l))
            .collect::<Vec<_>>()
            .join("+");

        debug!(image = %image.path().display(), langs = %langs, "Spawning tesseract");

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.binary)
                .arg(image.path())
                .arg("stdout")
                .args(["-l", langs.as_str()])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| BackendError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackendError::DependencyMissing {
                capability: OCR_CAPABILITY.to_string(),
                hint: format!(
                    "Install tesseract (e.g. `apt install tesseract-ocr`) or set ocr.binary; '{}' was not found",
                    self.binary
                ),
            },
            _ => BackendError::Internal(format!("Failed to execute {}: {}", self.binary, e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("tesseract exited with code {}: {}", exit_code, stderr.trim());
            return Err(BackendError::Internal(format!(
                "tesseract exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("tesseract returned {} bytes of text", text.len());
        Ok(text)
    }
}

/// Detect the text in `image`, defaulting to English
pub async fn detect_text(
    detector: &dyn TextDetector,
    image: &Image,
    languages: Option<&[String]>,
) -> Result<String, BackendError> {
    let default = ["en".to_string()];
    let languages = match languages {
        Some(langs) if !langs.is_empty() => langs,
        _ => &default[..],
    };
    detector.detect(image, languages).await
}
