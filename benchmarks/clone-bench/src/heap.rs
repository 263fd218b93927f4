//! jemalloc heap statistics
//!
//! The binary installs jemalloc as the global allocator and, with unprefixed
//! symbols, as the C `malloc` too, so these counters include libgit2's native
//! allocations. Counters read as zero where jemalloc is unavailable (MSVC) or
//! a mallctl read fails.

/// Point-in-time copy of the allocator counters, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes allocated by the application
    pub allocated: u64,
    /// Bytes in active pages
    pub active: u64,
    /// Bytes in physically resident allocator pages
    pub resident: u64,
    /// Bytes in chunks mapped by the allocator
    pub mapped: u64,
    /// Bytes retained for reuse instead of being returned to the OS
    pub retained: u64,
    pub arenas: u64,
    /// Freed memory is filled with junk (`opt.junk`)
    pub scrubs_freed_memory: bool,
}

#[cfg(not(target_env = "msvc"))]
pub fn stats() -> HeapStats {
    use tikv_jemalloc_ctl::{arenas, epoch, opt, stats};

    // jemalloc caches its statistics until the epoch is bumped
    if let Err(e) = epoch::advance() {
        tracing::warn!(error = %e, "Failed to refresh jemalloc statistics, heap counters will be zero");
        return HeapStats::default();
    }

    HeapStats {
        allocated: stats::allocated::read().unwrap_or(0) as u64,
        active: stats::active::read().unwrap_or(0) as u64,
        resident: stats::resident::read().unwrap_or(0) as u64,
        mapped: stats::mapped::read().unwrap_or(0) as u64,
        retained: stats::retained::read().unwrap_or(0) as u64,
        arenas: arenas::narenas::read().map(u64::from).unwrap_or(0),
        scrubs_freed_memory: opt::junk::read()
            .map(|junk| matches!(junk, "true" | "free"))
            .unwrap_or(false),
    }
}

#[cfg(target_env = "msvc")]
pub fn stats() -> HeapStats {
    HeapStats::default()
}
