//! Pipeline stages used by the orchestrator.
//!
//! Each submodule does one job and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ render ──▶ composite ──▶ encode     (merge groups)
//! input ─────┤      ▲
//! (path/URL) │   tracker (claims + shared renders)
//!            └─▶ extract                            (split pages, rotation)
//! ```
//!
//! 1. [`input`]     : read a local file or download a URL into memory
//! 2. [`tracker`]   : unclaimed-page set and per-call render cache
//! 3. [`render`]    : rasterise one page via pdfium; blocking
//! 4. [`composite`] : stack rendered pages into one canvas
//! 5. [`encode`]    : JPEG/PNG encoding and `data:` URLs
//! 6. [`extract`]   : lopdf page count, page extraction and rotation; blocking

pub mod composite;
pub mod encode;
pub mod extract;
pub mod input;
pub mod render;
pub mod tracker;
