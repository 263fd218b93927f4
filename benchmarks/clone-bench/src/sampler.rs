//! Memory sampling
//!
//! Collects jemalloc, process and host counters into a [`MemorySnapshot`].
//! Every source is optional: anything that cannot be read is reported as zero.

use chrono::Utc;
use std::path::Path;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::{heap, to_megabytes, MemorySnapshot};

/// Source of memory snapshots
pub trait MemorySampler: Send {
    /// Capture the current counters. Never fails.
    fn sample(&mut self) -> MemorySnapshot;
}

/// Raw counter values in bytes (or counts), before unit conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounters {
    pub heap_allocated: u64,
    pub heap_active: u64,
    pub heap_resident: u64,
    pub heap_mapped: u64,
    pub heap_retained: u64,
    pub arenas: u64,
    pub rss: u64,
    pub virtual_memory: u64,
    pub peak_rss: u64,
    pub data_segment: u64,
    pub swap: u64,
    pub system_total: u64,
    pub system_available: u64,
    pub system_used: u64,
    pub threads: u64,
    pub open_files: u64,
    pub scrubs_freed_memory: bool,
}

impl RawCounters {
    /// Convert to a snapshot stamped with the current time
    pub fn into_snapshot(self) -> MemorySnapshot {
        MemorySnapshot {
            captured_at: Utc::now(),
            heap_allocated: to_megabytes(self.heap_allocated),
            heap_active: to_megabytes(self.heap_active),
            heap_resident: to_megabytes(self.heap_resident),
            heap_mapped: to_megabytes(self.heap_mapped),
            heap_retained: to_megabytes(self.heap_retained),
            arenas: self.arenas,
            rss: to_megabytes(self.rss),
            virtual_memory: to_megabytes(self.virtual_memory),
            peak_rss: to_megabytes(self.peak_rss),
            data_segment: to_megabytes(self.data_segment),
            swap: to_megabytes(self.swap),
            system_total: to_megabytes(self.system_total),
            system_available: to_megabytes(self.system_available),
            system_used: to_megabytes(self.system_used),
            threads: self.threads,
            open_files: self.open_files,
            scrubs_freed_memory: self.scrubs_freed_memory,
        }
    }
}

/// Fields of interest from `/proc/self/status`, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub peak_rss: u64,
    pub data_segment: u64,
    pub swap: u64,
    pub threads: u64,
}

/// Parse the contents of a `/proc/<pid>/status` file
///
/// Unknown or malformed lines are skipped.
pub fn parse_proc_status(contents: &str) -> ProcStatus {
    let mut status = ProcStatus::default();

    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };

        match key {
            "VmHWM" => status.peak_rss = bytes,
            "VmData" => status.data_segment = bytes,
            "VmSwap" => status.swap = bytes,
            "Threads" => status.threads = value,
            _ => {}
        }
    }

    status
}

fn read_proc_status(path: &Path) -> ProcStatus {
    std::fs::read_to_string(path)
        .map(|contents| parse_proc_status(&contents))
        .unwrap_or_default()
}

/// Number of descriptors in a `/proc/<pid>/fd` listing of our own process
///
/// The listing includes the descriptor `read_dir` holds open while walking it.
fn open_files_from_listing(entries: u64) -> u64 {
    entries.saturating_sub(1)
}

fn count_open_files(fd_dir: &Path) -> u64 {
    std::fs::read_dir(fd_dir)
        .map(|entries| open_files_from_listing(entries.count() as u64))
        .unwrap_or(0)
}

/// Samples the current process through sysinfo, procfs and jemalloc
pub struct ProcessSampler {
    system: System,
    pid: Option<Pid>,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot determine current pid, process counters will be zero");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
        }
    }

    fn collect(&mut self) -> RawCounters {
        self.system.refresh_memory();

        let (rss, virtual_memory) = match self.pid {
            Some(pid) => {
                self.system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::new().with_memory(),
                );
                self.system
                    .process(pid)
                    .map(|p| (p.memory(), p.virtual_memory()))
                    .unwrap_or((0, 0))
            }
            None => (0, 0),
        };

        let heap = heap::stats();
        let status = read_proc_status(Path::new("/proc/self/status"));

        RawCounters {
            heap_allocated: heap.allocated,
            heap_active: heap.active,
            heap_resident: heap.resident,
            heap_mapped: heap.mapped,
            heap_retained: heap.retained,
            arenas: heap.arenas,
            rss,
            virtual_memory,
            peak_rss: status.peak_rss,
            data_segment: status.data_segment,
            swap: status.swap,
            system_total: self.system.total_memory(),
            system_available: self.system.available_memory(),
            system_used: self.system.used_memory(),
            threads: status.threads,
            open_files: count_open_files(Path::new("/proc/self/fd")),
            scrubs_freed_memory: heap.scrubs_freed_memory,
        }
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessSampler {
    fn sample(&mut self) -> MemorySnapshot {
        self.collect().into_snapshot()
    }
}
