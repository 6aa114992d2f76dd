//! Output types returned by the merge/split operations.

use crate::error::SplitMergeError;
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One finished output unit: a composite image or a single-page document.
#[derive(Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// `<base>.jpg` / `<base>.png` for composites, `<base>.pdf` for split pages.
    ///
    /// Several artifacts of one call may share a name; see
    /// [`crate::process::write_artifacts`].
    pub filename: String,

    pub mime_type: String,

    #[serde(skip)]
    pub bytes: Vec<u8>,

    pub source: ArtifactSource,
}

/// Where an artifact came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Stitched image of a merge group.
    Composite {
        pages: Vec<usize>,
        width: u32,
        height: u32,
    },
    /// A page extracted into its own document.
    SinglePage { page: usize },
}

impl OutputArtifact {
    pub fn composite(
        filename: String,
        mime_type: &str,
        bytes: Vec<u8>,
        pages: Vec<usize>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            filename,
            mime_type: mime_type.to_string(),
            bytes,
            source: ArtifactSource::Composite { pages, width, height },
        }
    }

    pub fn single_page(filename: String, bytes: Vec<u8>, page: usize) -> Self {
        Self {
            filename,
            mime_type: "application/pdf".to_string(),
            bytes,
            source: ArtifactSource::SinglePage { page },
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.source, ArtifactSource::Composite { .. })
    }

    /// `data:<mime>;base64,…` for handing the artifact to a web front-end.
    pub fn to_data_url(&self) -> String {
        encode::to_data_url(&self.mime_type, &self.bytes)
    }

    /// Rebuild an artifact from a data URL.
    ///
    /// The URL carries no page information, so `source` must be supplied.
    pub fn from_data_url(
        filename: impl Into<String>,
        url: &str,
        source: ArtifactSource,
    ) -> Result<Self, SplitMergeError> {
        let (mime_type, bytes) = encode::from_data_url(url)?;
        Ok(Self {
            filename: filename.into(),
            mime_type,
            bytes,
            source,
        })
    }
}

impl fmt::Debug for OutputArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputArtifact")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("source", &self.source)
            .finish()
    }
}

/// Result of [`crate::process::rotate`].
#[derive(Debug, Clone)]
pub struct RotatedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// The `/Rotate` value now set on every page.
    pub effective_angle: i32,
}

/// The unit a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkUnit {
    Merge { token: String, pages: Vec<usize> },
    Split { page: usize },
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnit::Merge { pages, .. } => match (pages.first(), pages.last()) {
                (Some(a), Some(b)) if a != b => write!(f, "merge of pages {}-{}", a, b),
                (Some(a), _) => write!(f, "merge of page {}", a),
                _ => write!(f, "empty merge"),
            },
            WorkUnit::Split { page } => write!(f, "split of page {}", page),
        }
    }
}

/// A unit that failed under [`crate::config::FailurePolicy::CollectErrors`].
#[derive(Debug)]
pub struct ArtifactFailure {
    pub unit: WorkUnit,
    pub error: SplitMergeError,
}

/// Counters for one `process` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessStats {
    pub total_pages: usize,
    pub merge_groups: usize,
    pub split_pages: usize,
    /// Pages actually rasterised; overlapping groups share renders.
    pub rendered_pages: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Everything a `process` call produced.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Merge artifacts in directive order, then split artifacts by page.
    pub artifacts: Vec<OutputArtifact>,
    /// Empty unless the collect-errors policy is active.
    pub failures: Vec<ArtifactFailure>,
    pub stats: ProcessStats,
}

impl ProcessOutput {
    /// The artifacts, or [`SplitMergeError::PartialFailure`] if any unit failed.
    pub fn into_result(self) -> Result<Vec<OutputArtifact>, SplitMergeError> {
        if self.failures.is_empty() {
            return Ok(self.artifacts);
        }
        let succeeded = self.artifacts.len();
        let failed = self.failures.len();
        Err(SplitMergeError::PartialFailure {
            succeeded,
            failed,
            total: succeeded + failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_shows_length_not_bytes() {
        let a = OutputArtifact::single_page("doc.pdf".into(), vec![0; 2048], 3);
        let s = format!("{:?}", a);
        assert!(s.contains("<2048 bytes>"));
        assert!(!s.contains("0, 0, 0"));
    }

    #[test]
    fn manifest_json_omits_bytes() {
        let a = OutputArtifact::composite(
            "doc.jpg".into(),
            "image/jpeg",
            vec![1, 2, 3],
            vec![1, 2],
            10,
            40,
        );
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("bytes").is_none());
        assert_eq!(json["source"]["kind"], "composite");
        assert_eq!(json["source"]["height"], 40);
    }

    #[test]
    fn data_url_round_trip_keeps_payload() {
        let a = OutputArtifact::single_page("doc.pdf".into(), b"%PDF-1.7 body".to_vec(), 2);
        let url = a.to_data_url();
        let back =
            OutputArtifact::from_data_url("doc.pdf", &url, ArtifactSource::SinglePage { page: 2 })
                .unwrap();
        assert_eq!(back.bytes, a.bytes);
        assert_eq!(back.mime_type, "application/pdf");
    }

    #[test]
    fn work_unit_display() {
        let m = WorkUnit::Merge {
            token: "1-3".into(),
            pages: vec![1, 2, 3],
        };
        assert_eq!(m.to_string(), "merge of pages 1-3");
        assert_eq!(WorkUnit::Split { page: 4 }.to_string(), "split of page 4");
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let out = ProcessOutput {
            artifacts: vec![OutputArtifact::single_page("d.pdf".into(), vec![], 3)],
            failures: vec![ArtifactFailure {
                unit: WorkUnit::Split { page: 4 },
                error: SplitMergeError::Extract {
                    page: 4,
                    detail: "x".into(),
                },
            }],
            stats: ProcessStats::default(),
        };
        match out.into_result().unwrap_err() {
            SplitMergeError::PartialFailure { succeeded, failed, total } => {
                assert_eq!((succeeded, failed, total), (1, 1, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
