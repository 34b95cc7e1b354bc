use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::time::sleep;

use super::*;

const DURATIONS: [(&str, u64); 5] = [
    ("analysis", 3000),
    ("structure", 2500),
    ("drafting", 4000),
    ("validation", 2000),
    ("review", 1500),
];

fn stages() -> Vec<StageSeed> {
    DURATIONS
        .iter()
        .map(|&(id, duration_ms)| StageSeed {
            id: id.to_owned(),
            title: format!("{id} title"),
            description: format!("{id} description"),
            duration_ms,
            detail_lines: vec![format!("{id} detail one"), format!("{id} detail two")],
        })
        .collect()
}

fn no_gap() -> RunnerConfig {
    RunnerConfig::default().with_stage_gap(Duration::ZERO)
}

fn counting_runner(config: RunnerConfig) -> (ProgressRunner, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let runner = ProgressRunner::new(stages(), config).with_on_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (runner, calls)
}

/// Let the scheduler task observe timers that fired at the current instant.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn statuses(state: &RunState) -> Vec<StageStatus> {
    state.stages().iter().map(|stage| stage.status).collect()
}

fn rank(status: StageStatus) -> u8 {
    match status {
        StageStatus::Pending => 0,
        StageStatus::Processing => 1,
        StageStatus::Completed | StageStatus::Error => 2,
    }
}

// =============================================================================
// SCHEDULE
// =============================================================================

fn window(schedule: &Schedule, position: usize) -> (Duration, Duration) {
    let stage = &schedule.stages[position];
    (stage.start, stage.end)
}

#[test]
fn schedule_places_gap_after_every_stage() {
    let schedule = Schedule::plan(&stages(), &RunnerConfig::default());
    assert_eq!(schedule.len(), 5);
    assert_eq!(window(&schedule, 0), (Duration::ZERO, Duration::from_millis(3000)));
    assert_eq!(window(&schedule, 1), (Duration::from_millis(3500), Duration::from_millis(6000)));
    assert_eq!(window(&schedule, 4), (Duration::from_millis(13_500), Duration::from_millis(15_000)));
    assert_eq!(schedule.total(), Duration::from_millis(15_500));
}

#[test]
fn schedule_without_gap_totals_stage_durations() {
    let schedule = Schedule::plan(&stages(), &no_gap());
    assert_eq!(schedule.total(), Duration::from_millis(13_000));
}

#[test]
fn schedule_applies_time_scale() {
    let config = no_gap().with_time_scale(0.5);
    let schedule = Schedule::plan(&stages(), &config);
    assert_eq!(schedule.total(), Duration::from_millis(6500));
}

#[test]
fn schedule_saturates_on_oversized_durations() {
    let mut seeds = stages();
    for seed in &mut seeds {
        seed.duration_ms = u64::MAX;
    }
    let config = RunnerConfig::default().with_time_scale(1e20);

    let schedule = Schedule::plan(&seeds, &config);
    assert_eq!(schedule.total(), Duration::MAX);
    assert_eq!(window(&schedule, 4).1, Duration::MAX);
}

#[test]
fn new_runner_is_idle_with_pending_stages() {
    let runner = ProgressRunner::new(stages(), RunnerConfig::default());
    let snapshot = runner.snapshot();
    assert_eq!(snapshot.phase(), RunPhase::Idle);
    assert_eq!(snapshot.stages().count(StageStatus::Pending), 5);
    assert!(runner.progress_percent().abs() < f64::EPSILON);
    assert_eq!(runner.total_label(), "15s");
}

// =============================================================================
// RUN LIFECYCLE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn five_stages_complete_at_thirteen_seconds_without_gap() {
    let (mut runner, calls) = counting_runner(no_gap());
    assert!(matches!(runner.start(), StartOutcome::Started(_)));

    sleep(Duration::from_millis(13_000)).await;
    settle().await;

    let snapshot = runner.snapshot();
    assert!(snapshot.stages().all_completed());
    assert_eq!(snapshot.phase(), RunPhase::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn default_gap_completes_after_trailing_pause() {
    let (mut runner, calls) = counting_runner(RunnerConfig::default());
    runner.start();

    sleep(Duration::from_millis(14_999)).await;
    settle().await;
    assert_eq!(runner.phase(), RunPhase::Running);
    assert_eq!(runner.stage_status("review"), Some(StageStatus::Processing));

    // Last stage done at 15s; the run waits out one more pause.
    sleep(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(runner.stage_status("review"), Some(StageStatus::Completed));
    assert_eq!(runner.phase(), RunPhase::Running);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(499)).await;
    settle().await;
    assert_eq!(runner.phase(), RunPhase::Running);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(runner.phase(), RunPhase::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(runner.elapsed(), Duration::from_millis(15_500));
}

#[tokio::test(start_paused = true)]
async fn first_stage_processes_immediately_on_start() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default());
    runner.start();

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.stages().processing().map(|s| s.id.as_str()), Some("analysis"));
    assert_eq!(snapshot.stages().count(StageStatus::Pending), 4);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_stage_processes_and_statuses_never_regress() {
    let (mut runner, _calls) = counting_runner(RunnerConfig::default());
    runner.start();

    let mut last_rank: HashMap<String, u8> = HashMap::new();
    let mut last_progress = 0.0_f64;

    for _ in 0..200 {
        let snapshot = runner.snapshot();
        assert!(snapshot.stages().count(StageStatus::Processing) <= 1);

        for stage in snapshot.stages().iter() {
            let current = rank(stage.status);
            let previous = last_rank.insert(stage.id.clone(), current).unwrap_or(0);
            assert!(current >= previous, "stage {} regressed", stage.id);
        }

        let progress = runner.progress_percent();
        assert!(progress >= last_progress, "progress went backwards: {last_progress} -> {progress}");
        last_progress = progress;

        if snapshot.phase() == RunPhase::Completed {
            break;
        }
        sleep(Duration::from_millis(250)).await;
        settle().await;
    }

    assert_eq!(runner.phase(), RunPhase::Completed);
    assert!((runner.progress_percent() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn history_records_each_stage_in_order() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default());
    runner.start();
    assert_eq!(runner.wait().await, RunPhase::Completed);

    let snapshot = runner.snapshot();
    let history = snapshot.history();
    assert_eq!(history.len(), 10);

    for (position, pair) in history.chunks(2).enumerate() {
        let (id, _) = DURATIONS[position];
        assert_eq!(pair[0].stage_id, id);
        assert_eq!((pair[0].from, pair[0].to), (StageStatus::Pending, StageStatus::Processing));
        assert_eq!(pair[1].stage_id, id);
        assert_eq!((pair[1].from, pair[1].to), (StageStatus::Processing, StageStatus::Completed));
    }

    assert_eq!(history[2].at, Duration::from_millis(3500));
    assert_eq!(history[9].at, Duration::from_millis(15_000));
    assert_eq!(runner.elapsed(), Duration::from_millis(15_500));
}

#[tokio::test(start_paused = true)]
async fn progress_tracks_planned_run_length() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default());
    runner.start();

    sleep(Duration::from_millis(7750)).await;
    settle().await;
    assert!((runner.progress_percent() - 50.0).abs() < 1e-9);
    assert_eq!(runner.elapsed_label(), "7s");
    assert_eq!(runner.total_label(), "15s");
}

#[tokio::test(start_paused = true)]
async fn visible_details_follow_active_then_just_completed_stage() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default());
    runner.start();
    assert_eq!(runner.snapshot().visible_details()[0], "analysis detail one");

    // Inside the gap after analysis: nothing processing, analysis just finished.
    sleep(Duration::from_millis(3200)).await;
    settle().await;
    let snapshot = runner.snapshot();
    assert!(snapshot.stages().processing().is_none());
    assert_eq!(snapshot.current_step(), 1);
    assert_eq!(snapshot.visible_details()[0], "analysis detail one");

    sleep(Duration::from_millis(400)).await;
    settle().await;
    assert_eq!(runner.snapshot().visible_details()[0], "structure detail one");
}

// =============================================================================
// START / RESTART / CANCEL
// =============================================================================

#[tokio::test(start_paused = true)]
async fn start_while_running_is_a_no_op() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default());
    let StartOutcome::Started(run_id) = runner.start() else {
        panic!("first start should launch a run");
    };

    sleep(Duration::from_millis(4000)).await;
    settle().await;
    let before = runner.snapshot();

    assert_eq!(runner.start(), StartOutcome::AlreadyRunning(run_id));
    let after = runner.snapshot();
    assert_eq!(after.run_id(), Some(run_id));
    assert_eq!(after.history().len(), before.history().len());
    assert_eq!(runner.stage_status("analysis"), Some(StageStatus::Completed));
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_run_and_fires_once() {
    let (mut runner, calls) = counting_runner(RunnerConfig::default());
    let StartOutcome::Started(first) = runner.start() else {
        panic!("first start should launch a run");
    };

    sleep(Duration::from_millis(8000)).await;
    settle().await;

    let second = runner.restart();
    assert_ne!(first, second);
    let snapshot = runner.snapshot();
    assert_eq!(snapshot.run_id(), Some(second));
    assert_eq!(snapshot.stages().processing().map(|s| s.id.as_str()), Some("analysis"));
    assert_eq!(snapshot.stages().count(StageStatus::Completed), 0);

    assert_eq!(runner.wait().await, RunPhase::Completed);
    sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn each_start_fires_completion_once() {
    let (mut runner, calls) = counting_runner(no_gap());

    runner.start();
    assert_eq!(runner.wait().await, RunPhase::Completed);
    assert!(matches!(runner.start(), StartOutcome::Started(_)));
    assert_eq!(runner.wait().await, RunPhase::Completed);
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_freezes_state_and_skips_completion() {
    let (mut runner, calls) = counting_runner(RunnerConfig::default());
    runner.start();

    sleep(Duration::from_millis(4000)).await;
    settle().await;
    assert!(runner.cancel());

    let frozen = runner.snapshot();
    let frozen_progress = runner.progress_percent();
    assert_eq!(frozen.phase(), RunPhase::Cancelled);

    sleep(Duration::from_secs(30)).await;
    settle().await;

    let later = runner.snapshot();
    assert_eq!(later.history(), frozen.history());
    assert_eq!(statuses(&later), statuses(&frozen));
    assert!((runner.progress_percent() - frozen_progress).abs() < f64::EPSILON);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!runner.cancel());
}

#[tokio::test(start_paused = true)]
async fn dropping_runner_stops_outstanding_timers() {
    let (mut runner, calls) = counting_runner(RunnerConfig::default());
    runner.start();
    let rx = runner.subscribe();

    sleep(Duration::from_millis(1000)).await;
    settle().await;
    drop(runner);

    sleep(Duration::from_secs(30)).await;
    settle().await;

    let state = rx.borrow();
    assert_eq!(state.phase(), RunPhase::Cancelled);
    assert_eq!(state.stages().count(StageStatus::Completed), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_plan_completes_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut runner = ProgressRunner::new(Vec::new(), RunnerConfig::default()).with_on_complete(move |report| {
        assert_eq!(report.stages, 0);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    runner.start();
    assert_eq!(runner.wait().await, RunPhase::Completed);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!((runner.progress_percent() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn refused_transition_fails_the_run() {
    let (mut runner, calls) = counting_runner(RunnerConfig::default());
    runner.start();

    // Inside the gap after analysis, knock the table back to all pending so
    // structure can no longer start.
    sleep(Duration::from_millis(3200)).await;
    settle().await;
    runner.state.send_modify(|state| state.stages.reset());

    assert_eq!(runner.wait().await, RunPhase::Failed);
    let elapsed = runner.elapsed();
    assert_eq!(elapsed, Duration::from_millis(3500));
    assert_eq!(runner.stage_status("structure"), Some(StageStatus::Error));

    let snapshot = runner.snapshot();
    let last = snapshot.history().last().cloned();
    assert_eq!(
        last.map(|t| (t.stage_id, t.from, t.to)),
        Some(("structure".to_owned(), StageStatus::Pending, StageStatus::Error))
    );

    sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(runner.elapsed(), elapsed);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!runner.cancel());
}

#[tokio::test(start_paused = true)]
async fn huge_time_scale_plans_without_panicking() {
    let mut runner = ProgressRunner::new(stages(), RunnerConfig::default().with_time_scale(1e20));
    runner.start();

    sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(runner.phase(), RunPhase::Running);
    assert_eq!(runner.stage_status("analysis"), Some(StageStatus::Processing));
    assert!(runner.cancel());
}
