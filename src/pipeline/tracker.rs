//! Per-call bookkeeping shared by concurrent merge tasks.
//!
//! [`PageSetTracker`] holds the pages nobody has claimed yet. Merge tasks
//! claim their members while they run; the orchestrator reads
//! [`PageSetTracker::remaining`] only after every merge task has joined, so
//! the split set it sees is final.
//!
//! [`RenderCache`] makes overlapping merge groups (`"1-3,2-4"`) share
//! renders. Each group renders the pages nobody else has reserved in one
//! batch. A second group asking for a page still in flight waits for that
//! batch instead of starting another render.

use crate::error::SplitMergeError;
use crate::pipeline::composite::RenderedPage;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Holders never panic mid-update, so a poisoned set is still consistent.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The set of page numbers not yet consumed by a merge group.
#[derive(Debug)]
pub struct PageSetTracker {
    unclaimed: Mutex<BTreeSet<usize>>,
}

impl PageSetTracker {
    /// Track pages `1..=total_pages`.
    pub fn new(total_pages: usize) -> Self {
        Self {
            unclaimed: Mutex::new((1..=total_pages).collect()),
        }
    }

    /// Remove `pages` from the unclaimed set in one atomic step.
    ///
    /// Pages already claimed (or never tracked) are ignored, so overlapping
    /// groups can claim the same page safely.
    pub fn claim(&self, pages: &[usize]) {
        let mut set = lock(&self.unclaimed);
        for page in pages {
            set.remove(page);
        }
    }

    /// Unclaimed pages in ascending order.
    pub fn remaining(&self) -> Vec<usize> {
        lock(&self.unclaimed).iter().copied().collect()
    }
}

/// One page's render, locked while the batch that owns it is running.
type Slot = Arc<tokio::sync::Mutex<Option<Arc<RenderedPage>>>>;

/// Renders shared across the merge groups of one call.
#[derive(Debug, Default)]
pub struct RenderCache {
    slots: Mutex<HashMap<usize, Slot>>,
    renders: AtomicUsize,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return renders of `pages`, in the same order.
    ///
    /// Pages nobody has asked for yet are reserved and rendered in a single
    /// `render` call. Pages reserved by another group are awaited. If that
    /// group's batch failed, the missing pages are rendered here in a second
    /// batch.
    pub async fn get_or_render_all<F, Fut>(
        &self,
        pages: &[usize],
        render: F,
    ) -> Result<Vec<Arc<RenderedPage>>, SplitMergeError>
    where
        F: Fn(Vec<usize>) -> Fut,
        Fut: Future<Output = Result<Vec<RenderedPage>, SplitMergeError>>,
    {
        let mut owned = Vec::new();
        let mut awaited = Vec::new();
        {
            let mut slots = lock(&self.slots);
            for &page in pages {
                match slots.get(&page) {
                    Some(slot) => awaited.push((page, Arc::clone(slot))),
                    None => {
                        let slot = Slot::default();
                        let guard = Arc::clone(&slot).try_lock_owned().map_err(|_| {
                            SplitMergeError::Internal(format!("render slot {page} busy"))
                        })?;
                        slots.insert(page, slot);
                        owned.push((page, guard));
                    }
                }
            }
        }

        let mut found = HashMap::with_capacity(pages.len());

        // Owned slots are released before waiting on anyone else.
        if !owned.is_empty() {
            let batch = owned.iter().map(|(page, _)| *page).collect();
            let mut rendered = self.render_batch(batch, &render).await?;
            for (page, mut guard) in owned {
                if let Some(image) = rendered.remove(&page) {
                    *guard = Some(Arc::clone(&image));
                    found.insert(page, image);
                }
            }
        }

        let mut retry = Vec::new();
        for (page, slot) in &awaited {
            match slot.lock().await.as_ref() {
                Some(image) => {
                    found.insert(*page, Arc::clone(image));
                }
                None => retry.push(*page),
            }
        }

        if !retry.is_empty() {
            let rendered = self.render_batch(retry, &render).await?;
            for (page, image) in rendered {
                if let Some((_, slot)) = awaited.iter().find(|(p, _)| *p == page) {
                    slot.lock().await.get_or_insert_with(|| Arc::clone(&image));
                }
                found.insert(page, image);
            }
        }

        pages
            .iter()
            .map(|page| {
                found
                    .remove(page)
                    .ok_or_else(|| SplitMergeError::Internal(format!("no render for page {page}")))
            })
            .collect()
    }

    async fn render_batch<F, Fut>(
        &self,
        pages: Vec<usize>,
        render: &F,
    ) -> Result<HashMap<usize, Arc<RenderedPage>>, SplitMergeError>
    where
        F: Fn(Vec<usize>) -> Fut,
        Fut: Future<Output = Result<Vec<RenderedPage>, SplitMergeError>>,
    {
        self.renders.fetch_add(pages.len(), Ordering::SeqCst);
        let rendered = render(pages).await?;
        Ok(rendered
            .into_iter()
            .map(|image| (image.page, Arc::new(image)))
            .collect())
    }

    /// Number of page renders actually issued.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn starts_with_every_page() {
        let t = PageSetTracker::new(4);
        assert_eq!(t.remaining(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_document_has_nothing_remaining() {
        assert!(PageSetTracker::new(0).remaining().is_empty());
    }

    #[test]
    fn claim_is_idempotent() {
        let t = PageSetTracker::new(5);
        t.claim(&[1, 2, 3]);
        t.claim(&[2, 3, 4]);
        t.claim(&[2, 3]);
        assert_eq!(t.remaining(), vec![5]);
    }

    #[test]
    fn claiming_untracked_pages_is_a_no_op() {
        let t = PageSetTracker::new(3);
        t.claim(&[7, 0]);
        assert_eq!(t.remaining(), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_lose_no_updates() {
        let t = Arc::new(PageSetTracker::new(200));
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let t = Arc::clone(&t);
                tokio::spawn(async move {
                    let pages: Vec<usize> = (i * 10 + 1..=i * 10 + 10).collect();
                    t.claim(&pages);
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert!(t.remaining().is_empty());
    }

    fn blanks(pages: Vec<usize>) -> Result<Vec<RenderedPage>, SplitMergeError> {
        Ok(pages
            .into_iter()
            .map(|page| RenderedPage::new(page, RgbaImage::new(4, 6)))
            .collect())
    }

    #[tokio::test]
    async fn cache_renders_each_page_once() {
        let cache = RenderCache::new();
        let batches = Mutex::new(Vec::new());
        let render = |pages: Vec<usize>| {
            batches.lock().unwrap().push(pages.clone());
            async move { blanks(pages) }
        };

        let first = cache.get_or_render_all(&[1, 2, 3], &render).await.unwrap();
        let second = cache.get_or_render_all(&[3, 2, 4], &render).await.unwrap();

        assert_eq!(first.iter().map(|p| p.page).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(second.iter().map(|p| p.page).collect::<Vec<_>>(), vec![3, 2, 4]);
        assert!(Arc::ptr_eq(&first[2], &second[0]));
        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(cache.render_count(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_request_waits_for_the_batch_in_flight() {
        let cache = Arc::new(RenderCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = {
            let (cache, calls) = (Arc::clone(&cache), Arc::clone(&calls));
            tokio::spawn(async move {
                cache
                    .get_or_render_all(&[1, 2], |pages| {
                        calls.fetch_add(pages.len(), Ordering::SeqCst);
                        async move {
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            blanks(pages)
                        }
                    })
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let fast = cache
            .get_or_render_all(&[2], |pages| {
                calls.fetch_add(pages.len(), Ordering::SeqCst);
                async move { blanks(pages) }
            })
            .await
            .unwrap();

        assert_eq!(fast[0].page, 2);
        assert!(slow.await.unwrap().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_batch_can_be_retried() {
        let cache = RenderCache::new();
        let err = cache
            .get_or_render_all(&[1, 2], |_| async {
                Err::<Vec<RenderedPage>, _>(SplitMergeError::Render {
                    page: 1,
                    detail: "boom".into(),
                })
            })
            .await;
        assert!(err.is_err());

        let ok = cache
            .get_or_render_all(&[2, 1], |pages| async move {
                blanks(pages)
            })
            .await
            .unwrap();
        assert_eq!(ok.iter().map(|p| p.page).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(cache.render_count(), 4);
    }
}
