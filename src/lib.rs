//! # pdf-splitmerge
//!
//! Merge page ranges of a PDF into stitched images and split every other
//! page into its own PDF, in one call.
//!
//! ## The directive
//!
//! `"1-4,7-8"` on a 10-page document produces two images (pages 1–4 stacked
//! top to bottom, then pages 7–8) followed by four single-page PDFs for pages
//! 5, 6, 9 and 10. A bare number such as `"9"` leaves page 9 as a split page
//! unless [`SinglePagePolicy::Merge`] is configured.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Parse     directive → merge groups (all errors raised here)
//!  ├─ 3. Merge     per group: claim pages, render (pdfium), stitch, encode
//!  ├─ 4. Split     per unclaimed page: extract into its own PDF (lopdf)
//!  └─ 5. Output    merge artifacts in directive order, then splits by page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_splitmerge::{process_file, write_artifacts, ProcessConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProcessConfig::default();
//!     let output = process_file("scan.pdf", "1-4,7-8", &config).await?;
//!     let paths = write_artifacts(&output.artifacts, "out").await?;
//!     eprintln!("wrote {} files", paths.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap, anyhow, tracing-subscriber, indicatif, serde_json) |
//!
//! Only merge groups need pdfium. Counting, splitting and rotating are pure
//! Rust via lopdf.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FailurePolicy, ImageFormat, ProcessConfig, ProcessConfigBuilder, SinglePagePolicy};
pub use directive::{parse_directive, MergeGroup};
pub use engine::{DocumentEngine, PdfEngine};
pub use error::SplitMergeError;
pub use output::{
    ArtifactFailure, ArtifactSource, OutputArtifact, ProcessOutput, ProcessStats, RotatedDocument,
    WorkUnit,
};
pub use pipeline::composite::{CompositeImage, RenderedPage};
pub use pipeline::input::{resolve_input, InputDocument};
pub use process::{
    page_count, process, process_file, process_sync, rotate, split_single_page, write_artifacts,
};
pub use progress::{NoopProgressCallback, ProcessProgressCallback, ProgressCallback};
