//! OCR Module
//!
//! Wraps the external OCR pipeline behind the `OcrEngine` trait. The
//! production engine shells out to ocrmypdf; tests substitute a stub.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;

/// ocrmypdf exit code meaning "the input already has a text layer"
const EXIT_ALREADY_HAS_TEXT: i32 = 6;

/// What the engine did with the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrOutcome {
    /// A new text layer was produced
    Converted,
    /// The input already had a text layer; the output is a copy
    AlreadyHasText,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to launch OCR engine: {0}")]
    Spawn(std::io::Error),

    #[error("OCR engine exited with code {code}: {stderr}")]
    Engine { code: i32, stderr: String },

    #[error("OCR engine was terminated by a signal")]
    Terminated,

    #[error("failed to copy already-searchable input to output: {0}")]
    CopyOutput(std::io::Error),
}

/// External OCR engine contract
///
/// Takes an input PDF path, an output path, and a language code, and either
/// produces a searchable PDF at the output path or fails. The call blocks the
/// requesting task until the engine returns; no timeout is applied.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn ocr(
        &self,
        input: &Path,
        output: &Path,
        language: &str,
    ) -> Result<OcrOutcome, OcrError>;
}

/// Engine backed by the ocrmypdf command-line tool
pub struct OcrMyPdfEngine {
    binary: PathBuf,
}

impl OcrMyPdfEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for OcrMyPdfEngine {
    async fn ocr(
        &self,
        input: &Path,
        output: &Path,
        language: &str,
    ) -> Result<OcrOutcome, OcrError> {
        tracing::debug!(input = %input.display(), language, "starting OCR run");

        let result = tokio::process::Command::new(&self.binary)
            .arg("--deskew")
            .arg("--force-ocr")
            .arg("-l")
            .arg(language)
            .arg(input)
            .arg(output)
            .output()
            .await
            .map_err(OcrError::Spawn)?;

        let outcome = map_exit_status(result.status, &result.stderr)?;

        // On a prior-text-layer result ocrmypdf leaves no output file, but
        // the caller is promised a downloadable copy either way.
        if outcome == OcrOutcome::AlreadyHasText && !output.exists() {
            tokio::fs::copy(input, output)
                .await
                .map_err(OcrError::CopyOutput)?;
        }

        tracing::debug!(output = %output.display(), ?outcome, "OCR run finished");
        Ok(outcome)
    }
}

fn map_exit_status(status: ExitStatus, stderr: &[u8]) -> Result<OcrOutcome, OcrError> {
    match status.code() {
        Some(0) => Ok(OcrOutcome::Converted),
        Some(EXIT_ALREADY_HAS_TEXT) => Ok(OcrOutcome::AlreadyHasText),
        Some(code) => Err(OcrError::Engine {
            code,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }),
        None => Err(OcrError::Terminated),
    }
}
