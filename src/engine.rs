//! The document-library seam.
//!
//! Everything the orchestrator needs from a PDF library goes through
//! [`DocumentEngine`]. The default [`PdfEngine`] uses lopdf for the vector
//! work and pdfium for rasterising; tests inject their own engine through
//! [`crate::config::ProcessConfigBuilder::engine`].
//!
//! Methods are blocking. The orchestrator calls them through
//! [`run_blocking`], which moves the call onto Tokio's blocking pool.

use crate::config::ProcessConfig;
use crate::error::SplitMergeError;
use crate::pipeline::composite::RenderedPage;
use crate::pipeline::{extract, render};
use std::path::PathBuf;
use std::sync::Arc;

/// Document capabilities consumed by the orchestrator.
///
/// Every method takes the source document bytes; implementations decode
/// them per call, so one engine can serve any number of concurrent tasks.
pub trait DocumentEngine: Send + Sync {
    /// Decode and count pages.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, SplitMergeError>;

    /// Copy page `page` (1-based) into a new single-page document.
    fn extract_page(&self, pdf: &[u8], page: usize) -> Result<Vec<u8>, SplitMergeError>;

    /// Rasterise page `page` (1-based) at `scale`.
    fn render_page(
        &self,
        pdf: &[u8],
        page: usize,
        scale: f32,
    ) -> Result<RenderedPage, SplitMergeError>;

    /// Rasterise several pages at `scale`, in any order.
    ///
    /// The default calls [`render_page`](Self::render_page) once per page.
    /// Engines with a per-document setup cost should pay it once per batch.
    fn render_pages(
        &self,
        pdf: &[u8],
        pages: &[usize],
        scale: f32,
    ) -> Result<Vec<RenderedPage>, SplitMergeError> {
        pages
            .iter()
            .map(|&page| self.render_page(pdf, page, scale))
            .collect()
    }

    /// Set every page's rotation to `degrees` and re-serialise.
    fn rotate_all_pages(&self, pdf: &[u8], degrees: i32) -> Result<Vec<u8>, SplitMergeError>;
}

/// lopdf for structure, pdfium for pixels.
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    pdfium_lib_path: Option<PathBuf>,
}

impl PdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind pdfium from this file or directory instead of searching for it.
    pub fn with_pdfium_lib_path(path: impl Into<PathBuf>) -> Self {
        Self {
            pdfium_lib_path: Some(path.into()),
        }
    }

    pub fn from_config(config: &ProcessConfig) -> Self {
        Self {
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        }
    }
}

impl DocumentEngine for PdfEngine {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, SplitMergeError> {
        extract::page_count(pdf)
    }

    fn extract_page(&self, pdf: &[u8], page: usize) -> Result<Vec<u8>, SplitMergeError> {
        extract::extract_page(pdf, page)
    }

    fn render_page(
        &self,
        pdf: &[u8],
        page: usize,
        scale: f32,
    ) -> Result<RenderedPage, SplitMergeError> {
        render::render_page_blocking(pdf, page, scale, self.pdfium_lib_path.as_deref())
    }

    fn render_pages(
        &self,
        pdf: &[u8],
        pages: &[usize],
        scale: f32,
    ) -> Result<Vec<RenderedPage>, SplitMergeError> {
        render::render_pages_blocking(pdf, pages, scale, self.pdfium_lib_path.as_deref())
    }

    fn rotate_all_pages(&self, pdf: &[u8], degrees: i32) -> Result<Vec<u8>, SplitMergeError> {
        extract::rotate_all_pages(pdf, degrees)
    }
}

/// The configured engine, or a [`PdfEngine`] built from the config.
pub(crate) fn resolve_engine(config: &ProcessConfig) -> Arc<dyn DocumentEngine> {
    match config.engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(PdfEngine::from_config(config)),
    }
}

/// Run a blocking engine call on the blocking pool.
///
/// `what` names the call in the error raised if the task panics.
pub(crate) async fn run_blocking<T, F>(what: &str, f: F) -> Result<T, SplitMergeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SplitMergeError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SplitMergeError::Internal(format!("{} task panicked: {}", what, e)))?
}
