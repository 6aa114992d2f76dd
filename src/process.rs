//! Merge/split orchestration and the other document operations.
//!
//! ## Flow of [`process`]
//!
//! ```text
//! bytes ─▶ page count ─▶ parse directive ─┬─▶ merge groups (buffered)
//!                                         │     claim → render* → stitch → encode
//!                                         │
//!                                         └─▶ join ─▶ remaining() ─▶ split pages (buffered)
//!                                                                      extract
//! ```
//!
//! Merge groups and split pages each run through `buffered(concurrency)`:
//! up to `concurrency` units are in flight, and results come back in
//! submission order, so the artifact list is deterministic no matter which
//! render finishes first. Each merge group renders the pages no other group
//! has reserved in one engine call. Split candidates are read from the tracker only
//! after the merge stream is drained.

use crate::config::{FailurePolicy, ProcessConfig};
use crate::directive::{parse_directive, MergeGroup};
use crate::engine::{resolve_engine, run_blocking, DocumentEngine};
use crate::error::SplitMergeError;
use crate::output::{
    ArtifactFailure, OutputArtifact, ProcessOutput, ProcessStats, RotatedDocument, WorkUnit,
};
use crate::pipeline::composite::{stitch_vertical, RenderedPage};
use crate::pipeline::encode::encode_composite;
use crate::pipeline::input;
use crate::pipeline::tracker::{PageSetTracker, RenderCache};
use crate::progress::ProgressCallback;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Apply a merge/split directive to a PDF.
///
/// Returns merge artifacts in directive order followed by one single-page
/// PDF per unclaimed page, ascending.
///
/// # Errors
/// * [`SplitMergeError::Decode`] when `pdf` is not a PDF.
/// * [`SplitMergeError::Parse`] / [`SplitMergeError::Range`] for a bad
///   directive; nothing is rendered in that case.
/// * Under [`FailurePolicy::FailFast`], the first unit error.
///
/// # Example
/// ```rust,no_run
/// use pdf_splitmerge::{process, ProcessConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("scan.pdf")?;
/// let output = process(&bytes, "scan", "1-4,7-8", &ProcessConfig::default()).await?;
/// for artifact in &output.artifacts {
///     println!("{} ({} bytes)", artifact.filename, artifact.bytes.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn process(
    pdf: &[u8],
    base_name: &str,
    directive: &str,
    config: &ProcessConfig,
) -> Result<ProcessOutput, SplitMergeError> {
    let start = Instant::now();
    info!("Processing '{}' with directive '{}'", base_name, directive);

    // ── Step 1: Validate and count ───────────────────────────────────────
    if !input::looks_like_pdf(pdf) {
        return Err(SplitMergeError::Decode {
            detail: "missing %PDF header".into(),
        });
    }
    let ctx = UnitContext::new(pdf, base_name, config);
    let total_pages = ctx.page_count().await?;
    info!("Document has {} pages", total_pages);

    // ── Step 2: Parse directive ──────────────────────────────────────────
    let groups = parse_directive(directive, total_pages, config.single_page_policy)?;
    let tracker = PageSetTracker::new(total_pages);
    let planned_splits = planned_split_count(total_pages, &groups);
    debug!(
        "{} merge groups, {} split pages planned",
        groups.len(),
        planned_splits
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_process_start(groups.len(), planned_splits);
    }

    // A zero from a hand-built config would stall `buffered`.
    let concurrency = config.concurrency.max(1);
    let mut sink = UnitSink::new(config);

    // ── Step 3: Merge groups ─────────────────────────────────────────────
    let merges = stream::iter(groups.iter().map(|group| {
        let ctx = &ctx;
        let tracker = &tracker;
        async move {
            let unit = WorkUnit::Merge {
                token: group.token.clone(),
                pages: group.pages.clone(),
            };
            let result = ctx.with_deadline(&unit, ctx.merge(group, tracker)).await;
            (unit, result)
        }
    }).collect::<Vec<_>>())
    .buffered(concurrency);
    sink.drain(merges).await?;

    // ── Step 4: Split candidates (after every merge has joined) ──────────
    let remaining = tracker.remaining();
    let split_pages = remaining.len();

    // ── Step 5: Split pages ──────────────────────────────────────────────
    let splits = stream::iter(remaining.into_iter().map(|page| {
        let ctx = &ctx;
        async move {
            let unit = WorkUnit::Split { page };
            let result = ctx.with_deadline(&unit, ctx.split(page)).await;
            (unit, result)
        }
    }))
    .buffered(concurrency);
    sink.drain(splits).await?;

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let stats = ProcessStats {
        total_pages,
        merge_groups: groups.len(),
        split_pages,
        rendered_pages: ctx.cache.render_count(),
        failed: sink.failures.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Produced {} artifacts ({} failed) in {}ms",
        sink.artifacts.len(),
        stats.failed,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_process_complete(sink.artifacts.len(), sink.failures.len());
    }

    Ok(ProcessOutput {
        artifacts: sink.artifacts,
        failures: sink.failures,
        stats,
    })
}

/// Resolve a path or URL, then [`process`] it under its own base name.
pub async fn process_file(
    input_str: impl AsRef<str>,
    directive: &str,
    config: &ProcessConfig,
) -> Result<ProcessOutput, SplitMergeError> {
    let doc = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    process(&doc.bytes, &doc.base_name(), directive, config).await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    pdf: &[u8],
    base_name: &str,
    directive: &str,
    config: &ProcessConfig,
) -> Result<ProcessOutput, SplitMergeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| {
            SplitMergeError::Internal(format!("Failed to create tokio runtime: {}", e))
        })?
        .block_on(process(pdf, base_name, directive, config))
}

/// Number of pages in the document.
pub async fn page_count(pdf: &[u8], config: &ProcessConfig) -> Result<usize, SplitMergeError> {
    UnitContext::new(pdf, "", config).page_count().await
}

/// Copy one page (1-based) into its own PDF named `<base_name>.pdf`.
///
/// # Errors
/// [`SplitMergeError::Range`] when `page` is outside the document.
pub async fn split_single_page(
    pdf: &[u8],
    base_name: &str,
    page: usize,
    config: &ProcessConfig,
) -> Result<OutputArtifact, SplitMergeError> {
    let ctx = UnitContext::new(pdf, base_name, config);
    let total = ctx.page_count().await?;
    if page == 0 || page > total {
        return Err(SplitMergeError::Range {
            token: page.to_string(),
            page,
            total,
        });
    }
    ctx.split(page).await
}

/// Rotate every page of the document.
///
/// The stored rotation is `(angle + 90) mod 360`, set absolutely on each
/// page, and returned as `effective_angle`. Passing the previous
/// `effective_angle` back in advances the document one quarter turn.
pub async fn rotate(
    pdf: &[u8],
    base_name: &str,
    angle: i32,
    config: &ProcessConfig,
) -> Result<RotatedDocument, SplitMergeError> {
    let effective = effective_angle(angle)?;
    let ctx = UnitContext::new(pdf, base_name, config);

    let engine = Arc::clone(&ctx.engine);
    let source = Arc::clone(&ctx.pdf);
    let bytes =
        run_blocking("rotate", move || engine.rotate_all_pages(&source, effective)).await?;

    info!("Rotated '{}' to {}°", base_name, effective);
    Ok(RotatedDocument {
        filename: format!("{}.pdf", base_name),
        bytes,
        effective_angle: effective,
    })
}

/// `(angle + 90) mod 360` for quarter-turn angles.
pub fn effective_angle(angle: i32) -> Result<i32, SplitMergeError> {
    if angle.rem_euclid(90) != 0 {
        return Err(SplitMergeError::InvalidAngle { angle });
    }
    Ok((angle.rem_euclid(360) + 90) % 360)
}

/// Write artifacts into `dir`, returning the paths written.
///
/// Each file is written to a temporary name and renamed into place. Names
/// repeated within the batch get `-2`, `-3`, … before the extension.
pub async fn write_artifacts(
    artifacts: &[OutputArtifact],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, SplitMergeError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SplitMergeError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let mut n = 1;
        let mut name = artifact.filename.clone();
        while !used.insert(name.clone()) {
            n += 1;
            name = numbered_name(&artifact.filename, n);
        }

        let path = dir.join(&name);
        let tmp_path = dir.join(format!(".{}.tmp", name));
        tokio::fs::write(&tmp_path, &artifact.bytes)
            .await
            .map_err(|e| SplitMergeError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| SplitMergeError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        written.push(path);
    }

    Ok(written)
}

/// `doc.pdf`, 3 → `doc-3.pdf`
fn numbered_name(filename: &str, n: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, n, ext),
        _ => format!("{}-{}", filename, n),
    }
}

fn planned_split_count(total_pages: usize, groups: &[MergeGroup]) -> usize {
    let preview = PageSetTracker::new(total_pages);
    for group in groups {
        preview.claim(&group.pages);
    }
    preview.remaining().len()
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Shared state for the units of one call.
struct UnitContext<'a> {
    engine: Arc<dyn DocumentEngine>,
    pdf: Arc<[u8]>,
    base_name: &'a str,
    config: &'a ProcessConfig,
    cache: RenderCache,
}

impl<'a> UnitContext<'a> {
    fn new(pdf: &[u8], base_name: &'a str, config: &'a ProcessConfig) -> Self {
        Self {
            engine: resolve_engine(config),
            pdf: Arc::from(pdf),
            base_name,
            config,
            cache: RenderCache::new(),
        }
    }

    async fn page_count(&self) -> Result<usize, SplitMergeError> {
        let engine = Arc::clone(&self.engine);
        let pdf = Arc::clone(&self.pdf);
        run_blocking("page count", move || engine.page_count(&pdf)).await
    }

    async fn render(&self, pages: &[usize]) -> Result<Vec<Arc<RenderedPage>>, SplitMergeError> {
        self.cache
            .get_or_render_all(pages, |batch| {
                let engine = Arc::clone(&self.engine);
                let pdf = Arc::clone(&self.pdf);
                let scale = self.config.scale;
                debug!("Rendering pages {:?}", batch);
                run_blocking("render", move || engine.render_pages(&pdf, &batch, scale))
            })
            .await
    }

    /// Claim, render, stitch and encode one merge group.
    async fn merge(
        &self,
        group: &MergeGroup,
        tracker: &PageSetTracker,
    ) -> Result<OutputArtifact, SplitMergeError> {
        self.merge_inner(group, tracker)
            .await
            .map_err(|source| SplitMergeError::MergeGroupFailed {
                range: group.to_string(),
                source: Box::new(source),
            })
    }

    async fn merge_inner(
        &self,
        group: &MergeGroup,
        tracker: &PageSetTracker,
    ) -> Result<OutputArtifact, SplitMergeError> {
        tracker.claim(&group.pages);

        let members = self.render(&group.pages).await?;

        let unit = group.to_string();
        let background = self.config.background;
        let format = self.config.image_format;
        let quality = self.config.jpeg_quality;
        let (composite, bytes) = run_blocking("encode", move || {
            let composite = stitch_vertical(&members, background, &unit)?;
            let bytes =
                encode_composite(&composite, format, quality).map_err(|e| SplitMergeError::Encode {
                    unit,
                    detail: e.to_string(),
                })?;
            Ok((composite, bytes))
        })
        .await?;

        Ok(OutputArtifact::composite(
            format!("{}.{}", self.base_name, format.extension()),
            format.mime_type(),
            bytes,
            composite.pages.clone(),
            composite.width(),
            composite.height(),
        ))
    }

    async fn split(&self, page: usize) -> Result<OutputArtifact, SplitMergeError> {
        let engine = Arc::clone(&self.engine);
        let pdf = Arc::clone(&self.pdf);
        let bytes = run_blocking("extract", move || engine.extract_page(&pdf, page)).await?;
        Ok(OutputArtifact::single_page(
            format!("{}.pdf", self.base_name),
            bytes,
            page,
        ))
    }

    async fn with_deadline<T>(
        &self,
        unit: &WorkUnit,
        fut: impl Future<Output = Result<T, SplitMergeError>>,
    ) -> Result<T, SplitMergeError> {
        match self.config.unit_timeout_secs {
            None => fut.await,
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
                .await
                .map_err(|_| SplitMergeError::Timeout {
                    unit: unit.to_string(),
                    secs,
                })?,
        }
    }
}

/// Applies the failure policy to finished units.
struct UnitSink {
    policy: FailurePolicy,
    callback: Option<ProgressCallback>,
    artifacts: Vec<OutputArtifact>,
    failures: Vec<ArtifactFailure>,
}

impl UnitSink {
    fn new(config: &ProcessConfig) -> Self {
        Self {
            policy: config.failure_policy,
            callback: config.progress_callback.clone(),
            artifacts: Vec::new(),
            failures: Vec::new(),
        }
    }

    async fn drain<S>(&mut self, units: S) -> Result<(), SplitMergeError>
    where
        S: Stream<Item = (WorkUnit, Result<OutputArtifact, SplitMergeError>)>,
    {
        let mut units = std::pin::pin!(units);
        while let Some((unit, result)) = units.next().await {
            match result {
                Ok(artifact) => {
                    if let Some(ref cb) = self.callback {
                        let unit = unit.to_string();
                        cb.on_artifact_complete(&unit, &artifact.filename, artifact.bytes.len());
                    }
                    self.artifacts.push(artifact);
                }
                Err(error) => {
                    warn!("{} failed: {}", unit, error);
                    if let Some(ref cb) = self.callback {
                        cb.on_artifact_error(&unit.to_string(), &error.to_string());
                    }
                    match self.policy {
                        FailurePolicy::FailFast => return Err(error),
                        FailurePolicy::CollectErrors => {
                            self.failures.push(ArtifactFailure { unit, error })
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinglePagePolicy;

    #[test]
    fn effective_angle_adds_a_quarter_turn() {
        assert_eq!(effective_angle(0).unwrap(), 90);
        assert_eq!(effective_angle(90).unwrap(), 180);
        assert_eq!(effective_angle(180).unwrap(), 270);
        assert_eq!(effective_angle(270).unwrap(), 0);
        assert_eq!(effective_angle(-90).unwrap(), 0);
        assert_eq!(effective_angle(720).unwrap(), 90);
    }

    #[test]
    fn effective_angle_rejects_partial_turns() {
        assert!(matches!(
            effective_angle(45),
            Err(SplitMergeError::InvalidAngle { angle: 45 })
        ));
        assert!(effective_angle(i32::MAX).is_err());
    }

    #[test]
    fn numbered_names_keep_extension() {
        assert_eq!(numbered_name("doc.pdf", 2), "doc-2.pdf");
        assert_eq!(numbered_name("doc.v2.jpg", 3), "doc.v2-3.jpg");
        assert_eq!(numbered_name("noext", 2), "noext-2");
    }

    #[test]
    fn planned_splits_exclude_every_merged_page() {
        let groups = parse_directive("1-2,4-5", 6, SinglePagePolicy::Split).unwrap();
        assert_eq!(planned_split_count(6, &groups), 2);
        assert_eq!(planned_split_count(3, &[]), 3);
    }

    #[tokio::test]
    async fn write_artifacts_disambiguates_names() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            OutputArtifact::single_page("doc.pdf".into(), b"a".to_vec(), 1),
            OutputArtifact::single_page("doc.pdf".into(), b"b".to_vec(), 2),
            OutputArtifact::single_page("doc.pdf".into(), b"c".to_vec(), 3),
        ];
        let paths = write_artifacts(&artifacts, dir.path()).await.unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.pdf", "doc-2.pdf", "doc-3.pdf"]);
        assert_eq!(std::fs::read(&paths[2]).unwrap(), b"c");

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_a_decode_error() {
        let err = process(b"GIF89a", "x", "", &ProcessConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SplitMergeError::Decode { .. }));
    }
}
