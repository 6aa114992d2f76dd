//! Image encoding: `CompositeImage` → JPEG or PNG bytes, and `data:` URLs.
//!
//! JPEG is the default because stitched pages get tall quickly and photos or
//! scans inside them compress far better lossy. JPEG has no alpha channel, so
//! the RGBA canvas is flattened to RGB first; the compositor fills uncovered
//! areas with an opaque background for exactly this reason.
//!
//! The data-URL helpers let callers hand artifacts to web front-ends
//! (`<img src=…>`, download links) without touching the filesystem.

use crate::config::ImageFormat;
use crate::error::SplitMergeError;
use crate::pipeline::composite::CompositeImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a composite as `format`.
///
/// `quality` is only used for JPEG (1–100).
pub fn encode_composite(
    composite: &CompositeImage,
    format: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb: RgbImage = composite.image.convert();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        }
        ImageFormat::Png => {
            composite
                .image
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }

    debug!(
        "Encoded {}x{} composite → {} bytes {:?}",
        composite.width(),
        composite.height(),
        buf.len(),
        format
    );
    Ok(buf)
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and decoded bytes.
pub fn from_data_url(url: &str) -> Result<(String, Vec<u8>), SplitMergeError> {
    let invalid = |why: &str| SplitMergeError::InvalidInput {
        input: format!("data URL ({why})"),
    };

    let rest = url.strip_prefix("data:").ok_or_else(|| invalid("missing 'data:' prefix"))?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| invalid("missing ','"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("only base64 payloads are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&e.to_string()))?;

    Ok((mime.to_string(), bytes))
}
