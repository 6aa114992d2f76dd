//! Vector-side document work via lopdf: page count, single-page extraction,
//! rotation, and re-serialisation.
//!
//! None of this needs a rasteriser, so it stays pure Rust and works without
//! a pdfium library. All functions are blocking; callers run them inside
//! `spawn_blocking`.

use crate::error::SplitMergeError;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

fn load(pdf: &[u8]) -> Result<Document, SplitMergeError> {
    Document::load_mem(pdf).map_err(|e| SplitMergeError::Decode {
        detail: e.to_string(),
    })
}

fn save(doc: &mut Document, unit: String) -> Result<Vec<u8>, SplitMergeError> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| SplitMergeError::Encode {
        unit,
        detail: e.to_string(),
    })?;
    Ok(buf)
}

/// Number of pages in the document.
pub fn page_count(pdf: &[u8]) -> Result<usize, SplitMergeError> {
    Ok(load(pdf)?.get_pages().len())
}

/// Copy page `page` (1-based) into a new single-page document.
///
/// The copy keeps the page's resources, annotations and inherited attributes;
/// objects only reachable from other pages are pruned.
pub fn extract_page(pdf: &[u8], page: usize) -> Result<Vec<u8>, SplitMergeError> {
    let mut doc = load(pdf)?;
    let pages = doc.get_pages();
    let total = pages.len();

    if page == 0 || page > total {
        return Err(SplitMergeError::PageOutOfRange { page, total });
    }

    let others: Vec<u32> = pages
        .keys()
        .copied()
        .filter(|&n| n as usize != page)
        .collect();
    if !others.is_empty() {
        doc.delete_pages(&others);
    }
    doc.prune_objects();

    if doc.get_pages().len() != 1 {
        return Err(SplitMergeError::Extract {
            page,
            detail: format!("expected 1 page after extraction, found {}", doc.get_pages().len()),
        });
    }

    let bytes = save(&mut doc, format!("page {page}"))?;
    debug!("Extracted page {} → {} bytes", page, bytes.len());
    Ok(bytes)
}

/// Set every page's `/Rotate` to `degrees` (absolute, not added).
pub fn rotate_all_pages(pdf: &[u8], degrees: i32) -> Result<Vec<u8>, SplitMergeError> {
    let mut doc = load(pdf)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for id in &page_ids {
        let dict = doc
            .get_object_mut(*id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| SplitMergeError::Decode {
                detail: format!("page object {:?}: {}", id, e),
            })?;
        dict.set("Rotate", Object::Integer(i64::from(degrees)));
    }

    let bytes = save(&mut doc, "rotated document".into())?;
    debug!("Rotated {} pages to {}°", page_ids.len(), degrees);
    Ok(bytes)
}
