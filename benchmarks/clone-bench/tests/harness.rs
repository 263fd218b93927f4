//! End-to-end harness scenarios with fake samplers and strategies

use async_trait::async_trait;
use clone_bench::{
    CloneError, CloneStrategy, Delay, Harness, HarnessConfig, LibGit2Strategy, MemorySampler,
    MemorySnapshot, RawCounters, SamplePoint, TokioDelay, SETTLE_DELAY,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared log of what happened, in order
#[derive(Clone, Default)]
struct Timeline {
    events: Arc<Mutex<Vec<String>>>,
}

impl Timeline {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

struct FakeSampler {
    timeline: Timeline,
    calls: u64,
}

impl MemorySampler for FakeSampler {
    fn sample(&mut self) -> MemorySnapshot {
        self.calls += 1;
        self.timeline.push(format!("sample {}", self.calls));
        RawCounters {
            rss: self.calls * 10 * 1024 * 1024,
            heap_allocated: self.calls * 1024 * 1024,
            threads: 1,
            ..Default::default()
        }
        .into_snapshot()
    }
}

#[derive(Debug, Clone)]
struct CloneCall {
    repo_url: String,
    dir: PathBuf,
    dir_existed: bool,
}

/// Strategy that records its calls and optionally takes a while
struct RecordingStrategy {
    timeline: Timeline,
    calls: Arc<Mutex<Vec<CloneCall>>>,
    latency: Duration,
    fail: bool,
}

#[async_trait]
impl CloneStrategy for RecordingStrategy {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn clone_shallow(&self, repo_url: &str, dir: &Path) -> Result<(), CloneError> {
        self.timeline.push("clone");
        self.calls.lock().unwrap().push(CloneCall {
            repo_url: repo_url.to_string(),
            dir: dir.to_path_buf(),
            dir_existed: dir.exists(),
        });
        tokio::time::sleep(self.latency).await;
        if self.fail {
            Err(CloneError::NoDefaultBranch)
        } else {
            Ok(())
        }
    }
}

struct TimelineDelay {
    timeline: Timeline,
}

#[async_trait]
impl Delay for TimelineDelay {
    async fn sleep(&self, duration: Duration) {
        self.timeline.push(format!("sleep {}s", duration.as_secs()));
    }
}

fn recording_strategy(
    timeline: &Timeline,
    latency: Duration,
    fail: bool,
) -> (Box<RecordingStrategy>, Arc<Mutex<Vec<CloneCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let strategy = Box::new(RecordingStrategy {
        timeline: timeline.clone(),
        calls: calls.clone(),
        latency,
        fail,
    });
    (strategy, calls)
}

#[tokio::test]
async fn test_prepared_destination_is_removed_before_clone() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("out");
    std::fs::create_dir_all(dest.join("src")).unwrap();
    std::fs::write(dest.join("src/lib.rs"), "// stale checkout").unwrap();

    let timeline = Timeline::default();
    let (strategy, calls) = recording_strategy(&timeline, Duration::ZERO, false);
    let mut harness = Harness::new(
        HarnessConfig::default(),
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    let report = harness.run("https://example.com/repo.git", &dest).await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].repo_url, "https://example.com/repo.git");
    assert_eq!(calls[0].dir, dest);
    assert!(!calls[0].dir_existed);

    assert_eq!(
        timeline.events(),
        vec!["sample 1", "clone", "sample 2", "sleep 10s", "sample 3"]
    );

    assert!(report.outcome.is_success());
    assert_eq!(report.before.rss, 10.0);
    assert_eq!(report.after.rss, 20.0);
    assert_eq!(report.settled.rss, 30.0);
    for (_, snapshot) in report.snapshots() {
        assert_eq!(snapshot.fields().len(), 17);
    }
}

#[tokio::test]
async fn test_without_prepare_destination_is_left_alone() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("out");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("keep.txt"), "keep").unwrap();

    let timeline = Timeline::default();
    let (strategy, calls) = recording_strategy(&timeline, Duration::ZERO, false);
    let mut harness = Harness::new(
        HarnessConfig {
            prepare: false,
            ..Default::default()
        },
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    harness.run("https://example.com/repo.git", &dest).await;

    assert!(calls.lock().unwrap()[0].dir_existed);
    assert!(dest.join("keep.txt").exists());
}

#[tokio::test]
async fn test_clone_duration_covers_strategy_latency() {
    let timeline = Timeline::default();
    let latency = Duration::from_millis(50);
    let (strategy, _) = recording_strategy(&timeline, latency, false);
    let mut harness = Harness::new(
        HarnessConfig {
            prepare: false,
            ..Default::default()
        },
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    let report = harness.run("https://example.com/repo.git", Path::new("out")).await;

    assert!(report.clone_duration >= latency);
}

#[tokio::test(start_paused = true)]
async fn test_final_sample_waits_settle_interval() {
    let timeline = Timeline::default();
    let (strategy, _) = recording_strategy(&timeline, Duration::from_secs(3), false);
    let mut harness = Harness::new(
        HarnessConfig {
            prepare: false,
            ..Default::default()
        },
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TokioDelay,
    );

    let started = tokio::time::Instant::now();
    let report = harness.run("https://example.com/repo.git", Path::new("out")).await;

    assert!(report.clone_duration >= Duration::from_secs(3));
    assert!(report.clone_duration < Duration::from_secs(4));
    assert!(started.elapsed() >= Duration::from_secs(3) + SETTLE_DELAY);
    assert!(report.settled.captured_at >= report.after.captured_at);
}

#[tokio::test]
async fn test_failed_clone_reports_all_snapshots() {
    let timeline = Timeline::default();
    let (strategy, _) = recording_strategy(&timeline, Duration::ZERO, true);
    let mut harness = Harness::new(
        HarnessConfig {
            prepare: false,
            ..Default::default()
        },
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    let report = harness.run("not-a-url", Path::new("out")).await;

    assert!(!report.outcome.is_success());
    assert_eq!(
        report
            .snapshots()
            .iter()
            .map(|(point, _)| *point)
            .collect::<Vec<_>>(),
        vec![SamplePoint::Before, SamplePoint::After, SamplePoint::Final]
    );
    assert_eq!(timeline.events().len(), 5);
}

#[tokio::test]
async fn test_prepare_failure_does_not_abort_run() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("file");
    std::fs::write(&file, "not a directory").unwrap();
    let dest = file.join("child");

    let timeline = Timeline::default();
    let (strategy, calls) = recording_strategy(&timeline, Duration::ZERO, false);
    let mut harness = Harness::new(
        HarnessConfig::default(),
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        strategy,
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    let report = harness.run("https://example.com/repo.git", &dest).await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].dir, dest);
    assert_eq!(
        timeline.events(),
        vec!["sample 1", "clone", "sample 2", "sleep 10s", "sample 3"]
    );
    assert_eq!(report.snapshots().len(), 3);
    assert!(file.is_file());
}

#[tokio::test]
async fn test_libgit2_failure_against_missing_remote() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("missing.git");
    let dest = temp.path().join("out");

    let timeline = Timeline::default();
    let mut harness = Harness::new(
        HarnessConfig::default(),
        FakeSampler {
            timeline: timeline.clone(),
            calls: 0,
        },
        Box::new(LibGit2Strategy::new()),
        TimelineDelay {
            timeline: timeline.clone(),
        },
    );

    let report = harness.run(&missing.to_string_lossy(), &dest).await;

    assert_eq!(report.strategy, "libgit2");
    assert!(!report.outcome.is_success());
    assert_eq!(
        timeline.events(),
        vec!["sample 1", "sample 2", "sleep 10s", "sample 3"]
    );
}
