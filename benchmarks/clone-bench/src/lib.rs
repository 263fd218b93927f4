//! Clone Benchmark Harness
//!
//! Measures the memory footprint of a shallow, single-branch git clone.
//! Memory is sampled before the clone, right after it, and again after a
//! fixed settle interval.
//!
//! ## Strategies
//!
//! - **libgit2**: in-process clone through the `git2` bindings
//! - **git-cli**: delegates to the `git` executable with global and system
//!   config disabled and terminal prompts turned off
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clone_bench::{Harness, HarnessConfig, ProcessSampler, StrategyKind, TokioDelay};
//!
//! let mut harness = Harness::new(
//!     HarnessConfig::default(),
//!     ProcessSampler::new(),
//!     StrategyKind::GitCli.build(),
//!     TokioDelay,
//! );
//! let report = harness.run("https://github.com/rust-lang/log.git", "out".as_ref()).await;
//! ```

pub mod clone;
pub mod error;
pub mod harness;
pub mod heap;
pub mod prepare;
pub mod reporter;
pub mod sampler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where in the run a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePoint {
    /// Before the clone starts
    Before,
    /// Immediately after the clone returns
    After,
    /// After the settle interval
    Final,
}

impl SamplePoint {
    pub fn name(&self) -> &'static str {
        match self {
            SamplePoint::Before => "Memory usage before cloning",
            SamplePoint::After => "Memory usage after cloning",
            SamplePoint::Final => "Final memory usage",
        }
    }
}

impl std::fmt::Display for SamplePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single rendered snapshot field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Megabytes, already rounded to two decimals
    Megabytes(f64),
    /// Raw count
    Count(u64),
    Flag(bool),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Megabytes(mb) => write!(f, "{:.2}MB", mb),
            FieldValue::Count(n) => write!(f, "{}", n),
            FieldValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Convert bytes to megabytes rounded to two decimal places
pub fn to_megabytes(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// Memory counters captured at one point in time
///
/// Size fields are megabytes rounded to two decimals; `arenas`, `threads`
/// and `open_files` are raw counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub captured_at: DateTime<Utc>,
    /// Bytes handed out by jemalloc, Rust and C allocations alike
    pub heap_allocated: f64,
    /// jemalloc active pages
    pub heap_active: f64,
    /// jemalloc pages resident in physical memory
    pub heap_resident: f64,
    /// jemalloc mapped chunks
    pub heap_mapped: f64,
    /// Memory jemalloc kept instead of returning to the OS
    pub heap_retained: f64,
    pub arenas: u64,
    /// Resident set size
    pub rss: f64,
    pub virtual_memory: f64,
    /// Peak resident set size (VmHWM)
    pub peak_rss: f64,
    /// Data segment size (VmData)
    pub data_segment: f64,
    pub swap: f64,
    pub system_total: f64,
    pub system_available: f64,
    pub system_used: f64,
    pub threads: u64,
    pub open_files: u64,
    /// Whether the allocator overwrites memory on free
    pub scrubs_freed_memory: bool,
}

impl MemorySnapshot {
    /// Field names and values in display order
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        use FieldValue::*;
        vec![
            ("heap_allocated", Megabytes(self.heap_allocated)),
            ("heap_active", Megabytes(self.heap_active)),
            ("heap_resident", Megabytes(self.heap_resident)),
            ("heap_mapped", Megabytes(self.heap_mapped)),
            ("heap_retained", Megabytes(self.heap_retained)),
            ("arenas", Count(self.arenas)),
            ("rss", Megabytes(self.rss)),
            ("virtual_memory", Megabytes(self.virtual_memory)),
            ("peak_rss", Megabytes(self.peak_rss)),
            ("data_segment", Megabytes(self.data_segment)),
            ("swap", Megabytes(self.swap)),
            ("system_total", Megabytes(self.system_total)),
            ("system_available", Megabytes(self.system_available)),
            ("system_used", Megabytes(self.system_used)),
            ("threads", Count(self.threads)),
            ("open_files", Count(self.open_files)),
            ("scrubs_freed_memory", Flag(self.scrubs_freed_memory)),
        ]
    }
}

impl std::fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .fields()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// How the clone attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CloneOutcome {
    Succeeded,
    Failed { message: String },
}

impl CloneOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CloneOutcome::Succeeded)
    }
}

/// Everything a single harness run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub repo_url: String,
    pub destination: String,
    /// Strategy name (e.g., "libgit2", "git-cli")
    pub strategy: String,
    pub outcome: CloneOutcome,
    /// Wall-clock time spent in the clone call
    #[serde(rename = "clone_duration_ms", with = "millis_serde")]
    pub clone_duration: Duration,
    pub started_at: DateTime<Utc>,
    pub before: MemorySnapshot,
    pub after: MemorySnapshot,
    #[serde(rename = "final")]
    pub settled: MemorySnapshot,
}

impl RunReport {
    /// Snapshots in the order they were taken
    pub fn snapshots(&self) -> [(SamplePoint, &MemorySnapshot); 3] {
        [
            (SamplePoint::Before, &self.before),
            (SamplePoint::After, &self.after),
            (SamplePoint::Final, &self.settled),
        ]
    }
}

// Re-export important items
pub use clone::{CloneStrategy, GitCliStrategy, LibGit2Strategy, StrategyKind};
pub use error::{CloneError, PrepareError};
pub use harness::{Delay, Harness, HarnessConfig, TokioDelay, SETTLE_DELAY};
pub use reporter::{OutputFormat, Reporter};
pub use sampler::{MemorySampler, ProcessSampler, RawCounters};

/// Millisecond serde support for Duration
mod millis_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
