//! Error types for the pdf-splitmerge library.
//!
//! A single enum, [`SplitMergeError`], covers every failure. Its variants fall
//! into three groups that the orchestrator treats differently:
//!
//! * **Directive errors** ([`SplitMergeError::Parse`],
//!   [`SplitMergeError::Range`]) are detected before any page is rendered and
//!   always abort the whole call. Nothing is partially produced.
//!
//! * **Unit errors** ([`SplitMergeError::Render`], [`SplitMergeError::Encode`],
//!   [`SplitMergeError::Extract`], [`SplitMergeError::Composite`],
//!   [`SplitMergeError::Timeout`]) belong to one merge group or one split
//!   page. Under [`crate::config::FailurePolicy::FailFast`] the first one
//!   aborts the call; under [`crate::config::FailurePolicy::CollectErrors`]
//!   each one is stored in an [`crate::output::ArtifactFailure`] and the other
//!   units still complete.
//!
//! * **Setup errors** (input resolution, decoding, pdfium binding, config)
//!   mean the call cannot start at all.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-splitmerge library.
#[derive(Debug, Error)]
pub enum SplitMergeError {
    // ── Directive errors ──────────────────────────────────────────────────
    /// A directive token is not `N` or `N-M`.
    #[error("Invalid directive token '{token}': {reason}")]
    Parse { token: String, reason: String },

    /// A directive token names a page outside the document.
    #[error("Directive token '{token}' refers to page {page}, but the document has {total} pages")]
    Range {
        token: String,
        page: usize,
        total: usize,
    },

    // ── Unit errors ───────────────────────────────────────────────────────
    /// The rendering backend could not rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// Output bytes (image or document) could not be serialised.
    #[error("Encoding failed for {unit}: {detail}")]
    Encode { unit: String, detail: String },

    /// A page could not be copied into its own document.
    #[error("Extraction failed for page {page}: {detail}")]
    Extract { page: usize, detail: String },

    /// Rendered members could not be stitched into one canvas.
    #[error("Compositing failed for {unit}: {detail}")]
    Composite { unit: String, detail: String },

    /// A merge group failed; `source` names the failing stage.
    #[error("Merge of {range} failed: {source}")]
    MergeGroupFailed {
        range: String,
        #[source]
        source: Box<SplitMergeError>,
    },

    /// A merge group or split page exceeded the configured deadline.
    #[error("{unit} timed out after {secs}s")]
    Timeout { unit: String, secs: u64 },

    /// Some units failed under the collect-errors policy.
    ///
    /// Returned by [`crate::output::ProcessOutput::into_result`].
    #[error("{failed}/{total} artifacts failed")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The input bytes are not a document the backend can load.
    #[error("Could not decode PDF: {detail}")]
    Decode { detail: String },

    /// A single page was requested outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rotation angles are restricted to quarter turns.
    #[error("Rotation angle {angle} is not a multiple of 90 degrees")]
    InvalidAngle { angle: i32 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they do not start with `%PDF`.
    #[error("Input '{name}' is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rendering merge groups needs a pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory holding it).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SplitMergeError {
    /// True for errors that belong to one merge group or split page.
    pub fn is_unit_error(&self) -> bool {
        matches!(
            self,
            SplitMergeError::Render { .. }
                | SplitMergeError::Encode { .. }
                | SplitMergeError::Extract { .. }
                | SplitMergeError::Composite { .. }
                | SplitMergeError::MergeGroupFailed { .. }
                | SplitMergeError::Timeout { .. }
        )
    }
}
