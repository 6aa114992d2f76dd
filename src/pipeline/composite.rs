//! Raster compositing: stack the rendered pages of a merge group into one image.
//!
//! The layout is a vertical strip. The canvas is as wide as the widest member
//! and as tall as all members together; each member is drawn at `x = 0`,
//! directly below the one before it. Nothing is scaled or cropped, so a
//! narrower page leaves a background-filled strip on its right.
//!
//! Members may arrive in any order (renders complete concurrently). They are
//! sorted by page number before placement, so the output order never depends
//! on scheduling.

use crate::error::SplitMergeError;
use image::{GenericImage, Rgba, RgbaImage};
use std::sync::Arc;
use tracing::debug;

/// One page rasterised at a fixed scale.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page: usize,
    pub image: RgbaImage,
}

impl RenderedPage {
    pub fn new(page: usize, image: RgbaImage) -> Self {
        Self { page, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// The stitched image of a merge group.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    pub image: RgbaImage,
    /// Member pages in placement order (ascending).
    pub pages: Vec<usize>,
}

impl CompositeImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Canvas size and per-member offsets of a vertical strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripLayout {
    pub width: u32,
    pub height: u32,
    /// `(x, y)` of each member, in input order.
    pub offsets: Vec<(u32, u32)>,
}

impl StripLayout {
    /// Lay out members of the given `(width, height)` top to bottom.
    ///
    /// Returns `None` when the total height does not fit in `u32`.
    pub fn vertical(sizes: &[(u32, u32)]) -> Option<Self> {
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut width = 0u32;
        let mut y = 0u32;
        for &(w, h) in sizes {
            offsets.push((0, y));
            width = width.max(w);
            y = y.checked_add(h)?;
        }
        Some(Self {
            width,
            height: y,
            offsets,
        })
    }
}

/// Stitch `members` into one image, ordered by page number.
///
/// `unit` names the merge group in error messages, e.g. `"pages 1-3"`.
pub fn stitch_vertical(
    members: &[Arc<RenderedPage>],
    background: [u8; 4],
    unit: &str,
) -> Result<CompositeImage, SplitMergeError> {
    if members.is_empty() {
        return Err(SplitMergeError::Composite {
            unit: unit.to_string(),
            detail: "no pages to stitch".into(),
        });
    }

    let mut ordered: Vec<&RenderedPage> = members.iter().map(Arc::as_ref).collect();
    ordered.sort_by_key(|m| m.page);

    let sizes: Vec<(u32, u32)> = ordered.iter().map(|m| (m.width(), m.height())).collect();
    let layout = StripLayout::vertical(&sizes).ok_or_else(|| SplitMergeError::Composite {
        unit: unit.to_string(),
        detail: "combined height exceeds u32::MAX pixels".into(),
    })?;

    let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, Rgba(background));
    for (member, &(x, y)) in ordered.iter().zip(&layout.offsets) {
        canvas
            .copy_from(&member.image, x, y)
            .map_err(|e| SplitMergeError::Composite {
                unit: unit.to_string(),
                detail: format!("placing page {}: {}", member.page, e),
            })?;
    }

    debug!(
        "Stitched {} → {}x{} px",
        unit, layout.width, layout.height
    );

    Ok(CompositeImage {
        image: canvas,
        pages: ordered.iter().map(|m| m.page).collect(),
    })
}
