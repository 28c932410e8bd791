//! OCR Engines
//!
//! Defines the engine trait and a Tesseract command-line implementation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{OcrError, OcrParams, OcrResult};

/// OCR engine trait.
///
/// Engines are not assumed to tolerate concurrent `recognize` calls; callers
/// go through [`super::OcrService`], which serializes them.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// One-time setup, run before the first recognition
    async fn initialize(&self) -> Result<(), OcrError> {
        Ok(())
    }

    /// Recognize text in a PNG-encoded image
    async fn recognize(&self, image_png: &[u8], params: &OcrParams) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR through the `tesseract` binary
pub struct TesseractEngine {
    binary: String,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(params: &OcrParams) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            params.language.clone(),
            "--oem".to_string(),
            "1".to_string(),
            "--psm".to_string(),
            params.psm.as_tesseract().to_string(),
        ];
        if let Some(whitelist) = &params.whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", whitelist));
        }
        args.push("tsv".to_string());
        args
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn initialize(&self) -> Result<(), OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| OcrError::InitializationError(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(OcrError::InitializationError(format!(
                "{} --version exited with {}",
                self.binary, output.status
            )));
        }
        Ok(())
    }

    async fn recognize(&self, image_png: &[u8], params: &OcrParams) -> Result<OcrResult, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(Self::args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_png)
                .await
                .map_err(|e| OcrError::ProcessingError(format!("Failed to write image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Build a result from Tesseract's TSV output.
///
/// Words on the same line are joined with spaces and lines with newlines.
/// Confidence is the mean word confidence, scaled to 0-1.
fn parse_tsv(tsv: &str) -> OcrResult {
    let mut text = String::new();
    let mut current_line: Option<(u32, u32, u32)> = None;
    let mut confidence_sum = 0.0f32;
    let mut words = 0u32;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let Ok(conf) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        let word = cols[11].trim();
        if conf < 0.0 || word.is_empty() {
            continue;
        }

        let line = (
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        match current_line {
            Some(prev) if prev == line => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line);
        text.push_str(word);

        confidence_sum += conf;
        words += 1;
    }

    let confidence = if words == 0 {
        0.0
    } else {
        (confidence_sum / words as f32 / 100.0).clamp(0.0, 1.0)
    };
    OcrResult { text, confidence }
}
