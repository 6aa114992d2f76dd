//! PDF rasterisation: render pages to RGBA buffers via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is
//! synchronous and CPU-bound. Callers run [`render_pages_blocking`] inside
//! `tokio::task::spawn_blocking` so Tokio worker threads keep serving the
//! other merge groups while a page renders.
//!
//! ## Library resolution
//!
//! The pdfium shared library is looked up in this order: an explicit path
//! from the config, `PDFIUM_LIB_PATH`, the working directory, then the
//! system library search path. The first path that binds is remembered for
//! the rest of the process.

use crate::error::SplitMergeError;
use crate::pipeline::composite::RenderedPage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Bind to a pdfium library, trying each known location.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, SplitMergeError> {
    if let Some(path) = explicit {
        return bind_at(path);
    }
    if let Some(path) = RESOLVED_PATH.get() {
        return bind_at(path);
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(env_path) = std::env::var_os("PDFIUM_LIB_PATH") {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("./"));

    for candidate in &candidates {
        if let Ok(pdfium) = bind_at(candidate) {
            let _ = RESOLVED_PATH.set(candidate.clone());
            return Ok(pdfium);
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| SplitMergeError::PdfiumBindingFailed(e.to_string()))
}

/// Bind to a library file, or to the platform library name inside a directory.
fn bind_at(path: &Path) -> Result<Pdfium, SplitMergeError> {
    let lib = if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    };

    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| SplitMergeError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e)))
}

/// Render page `page` (1-based) of `pdf` at `scale` (1.0 = 72 px per inch).
pub fn render_page_blocking(
    pdf: &[u8],
    page: usize,
    scale: f32,
    pdfium_lib_path: Option<&Path>,
) -> Result<RenderedPage, SplitMergeError> {
    render_pages_blocking(pdf, &[page], scale, pdfium_lib_path)?
        .pop()
        .ok_or_else(|| SplitMergeError::Internal(format!("no render for page {}", page)))
}

/// Render several pages with one pdfium binding and one document load.
///
/// Results come back in the order of `page_numbers`.
pub fn render_pages_blocking(
    pdf: &[u8],
    page_numbers: &[usize],
    scale: f32,
    pdfium_lib_path: Option<&Path>,
) -> Result<Vec<RenderedPage>, SplitMergeError> {
    let pdfium = bind_pdfium(pdfium_lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| SplitMergeError::Decode {
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

    let mut results = Vec::with_capacity(page_numbers.len());
    for &page in page_numbers {
        if page == 0 || page > total {
            return Err(SplitMergeError::PageOutOfRange { page, total });
        }

        let pdf_page = pages
            .get((page - 1) as u16)
            .map_err(|e| SplitMergeError::Render {
                page,
                detail: format!("{:?}", e),
            })?;

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| SplitMergeError::Render {
                page,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image().to_rgba8();
        debug!(
            "Rendered page {} at {}x → {}x{} px",
            page,
            scale,
            image.width(),
            image.height()
        );
        results.push(RenderedPage::new(page, image));
    }

    Ok(results)
}
