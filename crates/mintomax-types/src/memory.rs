//! Id'd memory regions with nested, scoped release.
//!
//! A [`MemoryRegion`] stands in for the host's memory context: it is the
//! owner-of-record for bytes allocated on its behalf and carries a stable
//! [`RegionId`] so callers can tell two regions apart. Rust ownership frees
//! the actual allocations; the region tracks accounting and lifetime.
//!
//! # Scopes
//!
//! [`MemoryRegion::scope`] opens a child region for short-lived temporaries
//! and returns a [`ScopedRegion`] guard. Dropping the guard releases every
//! byte charged to the child, on success and on error paths alike.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::trace;

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`MemoryRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(u64);

impl RegionId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct RegionInner {
    id: RegionId,
    label: String,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    open_scopes: AtomicUsize,
}

/// Shared handle to one accounting region. Clones refer to the same region.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    inner: Arc<RegionInner>,
}

impl MemoryRegion {
    /// Create a top-level region.
    pub fn new(label: impl Into<String>) -> Self {
        let id = RegionId(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Arc::new(RegionInner {
                id,
                label: label.into(),
                live_bytes: AtomicUsize::new(0),
                peak_bytes: AtomicUsize::new(0),
                open_scopes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> RegionId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Record `bytes` as allocated in this region.
    pub fn charge(&self, bytes: usize) {
        let live = self.inner.live_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.inner.peak_bytes.fetch_max(live, Ordering::Relaxed);
    }

    /// Bytes currently charged and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.inner.live_bytes.load(Ordering::Relaxed)
    }

    /// High-water mark of [`live_bytes`](Self::live_bytes).
    pub fn peak_bytes(&self) -> usize {
        self.inner.peak_bytes.load(Ordering::Relaxed)
    }

    /// Number of child scopes opened from this region and not yet dropped.
    pub fn open_scopes(&self) -> usize {
        self.inner.open_scopes.load(Ordering::Relaxed)
    }

    /// Release everything charged to this region; returns the released byte count.
    pub fn reset(&self) -> usize {
        self.inner.live_bytes.swap(0, Ordering::Relaxed)
    }

    /// Open a child region released when the returned guard drops.
    pub fn scope(&self, label: impl Into<String>) -> ScopedRegion {
        self.inner.open_scopes.fetch_add(1, Ordering::Relaxed);
        ScopedRegion {
            region: Self::new(label),
            parent: self.clone(),
        }
    }
}

/// Guard for a child region opened with [`MemoryRegion::scope`].
#[derive(Debug)]
pub struct ScopedRegion {
    region: MemoryRegion,
    parent: MemoryRegion,
}

impl ScopedRegion {
    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }
}

impl Drop for ScopedRegion {
    fn drop(&mut self) {
        let released = self.region.reset();
        self.parent.inner.open_scopes.fetch_sub(1, Ordering::Relaxed);
        trace!(
            region = self.region.id().get(),
            parent = self.parent.id().get(),
            label = %self.region.label(),
            released,
            "scoped region released"
        );
    }
}
