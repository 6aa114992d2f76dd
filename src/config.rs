//! Configuration types for merge/split processing.
//!
//! Every knob lives in [`ProcessConfig`], built via its
//! [`ProcessConfigBuilder`]. One struct is easy to clone into concurrent
//! tasks and easy to print when two runs disagree.

use crate::engine::DocumentEngine;
use crate::error::SplitMergeError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a merge/split call.
///
/// Built via [`ProcessConfig::builder()`] or using
/// [`ProcessConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_splitmerge::{FailurePolicy, ProcessConfig};
///
/// let config = ProcessConfig::builder()
///     .scale(2.0)
///     .concurrency(4)
///     .failure_policy(FailurePolicy::CollectErrors)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessConfig {
    /// Render scale applied to each page of a merge group. Range: 0.1–8.0. Default: 1.5.
    ///
    /// 1.0 renders one pixel per PDF point (72 per inch). 1.5 gives 108 px
    /// per inch, enough to keep body text legible in the stitched image.
    pub scale: f32,

    /// Image format of composite artifacts. Default: [`ImageFormat::Jpeg`].
    pub image_format: ImageFormat,

    /// JPEG quality (1–100) when `image_format` is JPEG. Default: 90.
    pub jpeg_quality: u8,

    /// RGBA fill for canvas areas no member covers. Default: opaque white.
    ///
    /// Members narrower than the widest one leave a strip on their right;
    /// JPEG has no alpha channel, so a transparent fill would come out black.
    pub background: [u8; 4],

    /// Maximum merge groups (or split pages) processed at once. Default: 8.
    pub concurrency: usize,

    /// What a one-number directive token means. Default: [`SinglePagePolicy::Split`].
    pub single_page_policy: SinglePagePolicy,

    /// How per-unit failures are reported. Default: [`FailurePolicy::FailFast`].
    pub failure_policy: FailurePolicy,

    /// Deadline for one merge group or one split page, in seconds. Default: none.
    ///
    /// Expiry fails only that unit; the rest of the batch continues or
    /// aborts according to `failure_policy`.
    pub unit_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit pdfium library (file or directory). Default: none, which
    /// falls back to `PDFIUM_LIB_PATH`, the working directory, then the
    /// system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Pre-constructed document engine. Takes precedence over the default
    /// [`crate::engine::PdfEngine`].
    pub engine: Option<Arc<dyn DocumentEngine>>,

    /// Receives per-artifact events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            scale: 1.5,
            image_format: ImageFormat::default(),
            jpeg_quality: 90,
            background: [255, 255, 255, 255],
            concurrency: 8,
            single_page_policy: SinglePagePolicy::default(),
            failure_policy: FailurePolicy::default(),
            unit_timeout_secs: None,
            download_timeout_secs: 120,
            pdfium_lib_path: None,
            engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("scale", &self.scale)
            .field("image_format", &self.image_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("background", &self.background)
            .field("concurrency", &self.concurrency)
            .field("single_page_policy", &self.single_page_policy)
            .field("failure_policy", &self.failure_policy)
            .field("unit_timeout_secs", &self.unit_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn DocumentEngine>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProcessProgressCallback>"),
            )
            .finish()
    }
}

impl ProcessConfig {
    /// Create a new builder for `ProcessConfig`.
    pub fn builder() -> ProcessConfigBuilder {
        ProcessConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessConfig`].
#[derive(Debug)]
pub struct ProcessConfigBuilder {
    config: ProcessConfig,
}

impl ProcessConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn background(mut self, rgba: [u8; 4]) -> Self {
        self.config.background = rgba;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn single_page_policy(mut self, policy: SinglePagePolicy) -> Self {
        self.config.single_page_policy = policy;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn unit_timeout_secs(mut self, secs: u64) -> Self {
        self.config.unit_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn DocumentEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessConfig, SplitMergeError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale < 0.1 || c.scale > 8.0 {
            return Err(SplitMergeError::InvalidConfig(format!(
                "Scale must be 0.1–8.0, got {}",
                c.scale
            )));
        }
        if c.concurrency == 0 {
            return Err(SplitMergeError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Meaning of a directive token that holds a single page number, e.g. `"9"`.
///
/// `"9"` can be read as "page 9 merges into itself" (an image of one page)
/// or as "page 9 is not part of any merge". Both readings exist in the
/// wild, so the choice is explicit. Two-bound tokens such as `"9-9"` are
/// always merge groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SinglePagePolicy {
    /// The page stays a split candidate and becomes its own PDF. (default)
    #[default]
    Split,
    /// The page becomes a merge group of one and is emitted as an image.
    Merge,
}

/// How a failing merge group or split page affects the call.
///
/// The policy is applied uniformly to every unit of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// The first unit error aborts the call; no artifacts are returned. (default)
    #[default]
    FailFast,
    /// Each failed unit is reported in [`crate::output::ProcessOutput::failures`];
    /// every other unit still produces its artifact.
    CollectErrors,
}

/// Encoding of composite (merged) artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossy, small; `.jpg`, `image/jpeg`. (default)
    #[default]
    Jpeg,
    /// Lossless; `.png`, `image/png`.
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ProcessConfig::default();
        assert_eq!(c.scale, 1.5);
        assert_eq!(c.image_format, ImageFormat::Jpeg);
        assert_eq!(c.single_page_policy, SinglePagePolicy::Split);
        assert_eq!(c.failure_policy, FailurePolicy::FailFast);
        assert!(c.unit_timeout_secs.is_none());
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = ProcessConfig::builder()
            .concurrency(0)
            .jpeg_quality(0)
            .build()
            .expect("clamped values are valid");
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.jpeg_quality, 1);

        let err = ProcessConfig::builder().scale(0.0).build().unwrap_err();
        assert!(matches!(err, SplitMergeError::InvalidConfig(_)));

        let err = ProcessConfig::builder().scale(f32::NAN).build().unwrap_err();
        assert!(matches!(err, SplitMergeError::InvalidConfig(_)));
    }

    #[test]
    fn image_format_naming() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", ProcessConfig::default());
        assert!(s.contains("scale"));
        assert!(s.contains("engine: None"));
    }
}
