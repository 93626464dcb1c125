//! Heap usage tracking, used to report the memory bound of a streaming scan

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Global allocator wrapper recording current and peak heap usage
#[derive(Debug)]
pub struct PeakAllocator {
    /// The underlying system allocator
    inner:     System,
    /// Total bytes currently allocated
    allocated: AtomicUsize,
    /// Peak memory usage
    peak:      AtomicUsize,
}

impl PeakAllocator {
    /// Create a new tracking allocator
    #[must_use]
    pub const fn new() -> Self {
        Self { inner: System, allocated: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }

    /// Bytes currently allocated
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// Highest number of bytes allocated at once
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Restart peak tracking from the current usage
    pub fn reset_peak(&self) {
        self.peak.store(self.allocated(), Ordering::SeqCst);
    }

    fn record_alloc(&self, size: usize) {
        let new_size = self.allocated.fetch_add(size, Ordering::SeqCst) + size;
        self.peak.fetch_max(new_size, Ordering::SeqCst);
    }
}

impl Default for PeakAllocator {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for PeakAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded unchanged to the system allocator
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.allocated.fetch_sub(layout.size(), Ordering::SeqCst);
        // SAFETY: `ptr` was returned by `alloc` with the same layout
        unsafe {
            self.inner.dealloc(ptr, layout);
        }
    }
}
