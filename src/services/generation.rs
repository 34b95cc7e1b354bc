//! Generation service — staged progress runner for simulated draft generation.
//!
//! DESIGN
//! ======
//! `start()` plans the run as a list of absolute deadlines measured from the
//! run's start instant and spawns one scheduler task that walks that list.
//! The task is the only writer of `RunState` once the run is under way; the
//! state is published through a `watch` channel so a view can borrow the
//! latest snapshot or await changes.
//!
//! Deadlines are absolute, so a late wake-up never shifts later stages and
//! paused-clock tests land on exact instants. The pause follows every stage,
//! the last one included; the run completes when that final pause elapses.
//!
//! CANCELLATION
//! ============
//! `cancel()` aborts the task and marks the run cancelled. Every mutation
//! goes through `send_if_modified` guarded by the run id and phase, so a task
//! caught mid-poll by `abort()` still cannot touch a cancelled or newer run.
//! Dropping the runner cancels it.
//!
//! `start()` while a run is in flight is a no-op that reports the active run.
//! `restart()` is the explicit cancel-and-start.
//!
//! FAILURE
//! =======
//! If the stage table refuses a scheduled transition, the stage is forced to
//! `Error` and the run ends `Failed`. Waiters are released; the completion
//! hook is not called.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::state::{StageSeed, StageStatus, StageTable};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Uuid),
    /// A run was already in flight; nothing changed.
    AlreadyRunning(Uuid),
}

/// One applied stage status change, stamped with run-relative time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stage_id: String,
    pub from: StageStatus,
    pub to: StageStatus,
    pub at: Duration,
}

/// Handed to the completion hook when a run finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stages: usize,
    pub elapsed: Duration,
    pub planned: Duration,
}

pub type CompletionHook = Arc<dyn Fn(&RunReport) + Send + Sync>;

// =============================================================================
// SCHEDULE
// =============================================================================

#[derive(Debug, Clone)]
struct ScheduledStage {
    id: String,
    start: Duration,
    end: Duration,
}

/// Stage start/end offsets for one run. Each stage is followed by the gap;
/// `total` is the end of the last stage plus its gap.
#[derive(Debug, Clone)]
pub struct Schedule {
    stages: Vec<ScheduledStage>,
    total: Duration,
}

impl Schedule {
    #[must_use]
    pub fn plan(seeds: &[StageSeed], config: &RunnerConfig) -> Self {
        let gap = config.stage_gap();
        let mut cursor = Duration::ZERO;
        let mut stages = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let start = cursor;
            cursor = cursor.saturating_add(config.scale(seed.duration()));
            stages.push(ScheduledStage { id: seed.id.clone(), start, end: cursor });
            cursor = cursor.saturating_add(gap);
        }

        Self { stages, total: cursor }
    }

    /// Planned wall-clock length of the whole run.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// =============================================================================
// RUN STATE
// =============================================================================

#[derive(Debug, Clone)]
pub struct RunState {
    run_id: Option<Uuid>,
    phase: RunPhase,
    stages: StageTable,
    /// Number of stages completed in the current run.
    current_step: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    planned: Duration,
    history: Vec<Transition>,
}

impl RunState {
    fn new(stages: StageTable, planned: Duration) -> Self {
        Self {
            run_id: None,
            phase: RunPhase::Idle,
            stages,
            current_step: 0,
            started_at: None,
            finished_at: None,
            planned,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn planned(&self) -> Duration {
        self.planned
    }

    #[must_use]
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    /// Time since start, frozen once the run leaves the running phase.
    #[must_use]
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self
                .finished_at
                .unwrap_or(now)
                .saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    /// Elapsed share of the planned run length, capped at 100.
    #[must_use]
    pub fn progress_percent_at(&self, now: Instant) -> f64 {
        if self.phase == RunPhase::Completed {
            return 100.0;
        }
        if self.planned.is_zero() {
            return 0.0;
        }
        let ratio = self.elapsed_at(now).as_secs_f64() / self.planned.as_secs_f64();
        (ratio * 100.0).min(100.0)
    }

    /// Detail lines for the processing stage, or for the stage that just
    /// completed when nothing is processing.
    #[must_use]
    pub fn visible_details(&self) -> &[String] {
        if let Some(stage) = self.stages.processing() {
            return &stage.detail_lines;
        }
        self.current_step
            .checked_sub(1)
            .and_then(|position| self.stages.at(position))
            .filter(|stage| stage.status == StageStatus::Completed)
            .map(|stage| stage.detail_lines.as_slice())
            .unwrap_or(&[])
    }

    fn owned_by(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id) && self.phase == RunPhase::Running
    }

    fn begin(&mut self, run_id: Uuid, started_at: Instant, planned: Duration) {
        self.run_id = Some(run_id);
        self.phase = RunPhase::Running;
        self.stages.reset();
        self.current_step = 0;
        self.started_at = Some(started_at);
        self.finished_at = None;
        self.planned = planned;
        self.history.clear();
    }

    fn record(&mut self, stage_id: &str, to: StageStatus, now: Instant) -> bool {
        match self.stages.transition(stage_id, to) {
            Ok(from) => {
                if to == StageStatus::Completed {
                    self.current_step = self.stages.count(StageStatus::Completed);
                }
                let at = self.elapsed_at(now);
                self.history.push(Transition { stage_id: stage_id.to_owned(), from, to, at });
                true
            }
            Err(e) => {
                warn!(error = %e, "generation: refused stage transition");
                false
            }
        }
    }

    fn fail(&mut self, stage_id: &str, now: Instant) {
        if let Some(from) = self.stages.mark_error(stage_id) {
            let at = self.elapsed_at(now);
            self.history.push(Transition { stage_id: stage_id.to_owned(), from, to: StageStatus::Error, at });
        }
        self.finish(RunPhase::Failed, now);
    }

    fn finish(&mut self, phase: RunPhase, now: Instant) {
        self.phase = phase;
        self.finished_at = Some(now);
    }
}

// =============================================================================
// RUNNER
// =============================================================================

pub struct ProgressRunner {
    seeds: Vec<StageSeed>,
    config: RunnerConfig,
    state: Arc<watch::Sender<RunState>>,
    task: Option<JoinHandle<()>>,
    on_complete: Option<CompletionHook>,
}

impl ProgressRunner {
    /// Stages with a repeated id are dropped; the first occurrence is kept.
    #[must_use]
    pub fn new(seeds: Vec<StageSeed>, config: RunnerConfig) -> Self {
        let mut seen = HashSet::new();
        let seeds: Vec<StageSeed> = seeds
            .into_iter()
            .filter(|seed| {
                let fresh = seen.insert(seed.id.clone());
                if !fresh {
                    warn!(stage = %seed.id, "generation: duplicate stage id dropped");
                }
                fresh
            })
            .collect();
        let planned = Schedule::plan(&seeds, &config).total();
        let (state, _) = watch::channel(RunState::new(StageTable::from_seeds(&seeds), planned));
        Self { seeds, config, state: Arc::new(state), task: None, on_complete: None }
    }

    /// Install the hook invoked once at the end of every completed run.
    #[must_use]
    pub fn with_on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RunReport) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Begin a run unless one is already in flight. Must be called from
    /// within a Tokio runtime.
    pub fn start(&mut self) -> StartOutcome {
        if let Some(run_id) = self.active_run() {
            debug!(%run_id, "generation: start ignored, run in flight");
            return StartOutcome::AlreadyRunning(run_id);
        }
        StartOutcome::Started(self.launch())
    }

    /// Cancel any run in flight and start a fresh one.
    pub fn restart(&mut self) -> Uuid {
        self.cancel();
        self.launch()
    }

    /// Stop the run in flight. Returns `false` when nothing was running.
    pub fn cancel(&mut self) -> bool {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let now = Instant::now();
        let mut cancelled = None;
        self.state.send_if_modified(|state| {
            if state.phase != RunPhase::Running {
                return false;
            }
            state.finish(RunPhase::Cancelled, now);
            cancelled = state.run_id;
            true
        });

        match cancelled {
            Some(run_id) => {
                info!(%run_id, "generation: run cancelled");
                true
            }
            None => false,
        }
    }

    /// Wait until the current run is no longer running and return its phase.
    pub async fn wait(&self) -> RunPhase {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| state.phase != RunPhase::Running).await {
            Ok(state) => state.phase,
            Err(_) => RunPhase::Cancelled,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> RunState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.state.borrow().phase
    }

    #[must_use]
    pub fn stage_status(&self, stage_id: &str) -> Option<StageStatus> {
        self.state.borrow().stages.status(stage_id)
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.state
            .borrow()
            .progress_percent_at(Instant::now())
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state.borrow().elapsed_at(Instant::now())
    }

    /// Elapsed time as whole seconds, e.g. `"7s"`.
    #[must_use]
    pub fn elapsed_label(&self) -> String {
        format_seconds(self.elapsed())
    }

    /// Planned run length as whole seconds, e.g. `"15s"`.
    #[must_use]
    pub fn total_label(&self) -> String {
        format_seconds(self.state.borrow().planned)
    }

    fn active_run(&self) -> Option<Uuid> {
        let state = self.state.borrow();
        if state.phase == RunPhase::Running { state.run_id } else { None }
    }

    fn launch(&mut self) -> Uuid {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        let schedule = Schedule::plan(&self.seeds, &self.config);
        let planned = schedule.total();

        // The first stage enters processing as part of start.
        self.state.send_modify(|state| {
            state.begin(run_id, started_at, planned);
            if let Some(first) = schedule.stages.first() {
                state.record(&first.id, StageStatus::Processing, started_at);
            }
        });

        info!(%run_id, stages = schedule.len(), planned_ms = planned.as_millis(), "generation: run started");

        let task = tokio::spawn(drive(Arc::clone(&self.state), schedule, run_id, started_at, self.on_complete.clone()));
        self.task = Some(task);
        run_id
    }
}

impl Drop for ProgressRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// SCHEDULER LOOP
// =============================================================================

/// Stand-in for offsets that run past the clock's range.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Applied,
    /// The run was cancelled or replaced.
    Superseded,
    /// The stage table refused the transition; the run is now failed.
    Refused,
}

async fn drive(
    state: Arc<watch::Sender<RunState>>,
    schedule: Schedule,
    run_id: Uuid,
    started_at: Instant,
    on_complete: Option<CompletionHook>,
) {
    for (position, stage) in schedule.stages.iter().enumerate() {
        if position > 0 {
            sleep_until(deadline(started_at, stage.start)).await;
            if advance(&state, run_id, &stage.id, StageStatus::Processing) != Step::Applied {
                return;
            }
            debug!(%run_id, stage = %stage.id, "generation: stage processing");
        }

        sleep_until(deadline(started_at, stage.end)).await;
        if advance(&state, run_id, &stage.id, StageStatus::Completed) != Step::Applied {
            return;
        }
        info!(%run_id, stage = %stage.id, "generation: stage completed");
    }

    sleep_until(deadline(started_at, schedule.total)).await;
    let now = Instant::now();
    let mut report = None;
    apply(&state, run_id, |s| {
        s.finish(RunPhase::Completed, now);
        report = Some(RunReport {
            run_id,
            stages: s.stages.len(),
            elapsed: s.elapsed_at(now),
            planned: s.planned,
        });
        true
    });

    let Some(report) = report else {
        return;
    };
    info!(%run_id, elapsed_ms = report.elapsed.as_millis(), "generation: run complete");
    if let Some(hook) = on_complete {
        hook(&report);
    }
}

/// Apply one scheduled transition for `run_id`. A refused transition fails
/// the run.
fn advance(state: &watch::Sender<RunState>, run_id: Uuid, stage_id: &str, to: StageStatus) -> Step {
    let now = Instant::now();
    let mut step = Step::Superseded;
    state.send_if_modified(|s| {
        if !s.owned_by(run_id) {
            return false;
        }
        if s.record(stage_id, to, now) {
            step = Step::Applied;
        } else {
            s.fail(stage_id, now);
            step = Step::Refused;
        }
        true
    });

    if step == Step::Refused {
        warn!(%run_id, stage = stage_id, "generation: run failed");
    }
    step
}

/// Mutate the run state only while `run_id` still owns a running run.
fn apply<F>(state: &watch::Sender<RunState>, run_id: Uuid, mutate: F) -> bool
where
    F: FnOnce(&mut RunState) -> bool,
{
    state.send_if_modified(|s| s.owned_by(run_id) && mutate(s))
}

fn deadline(started_at: Instant, offset: Duration) -> Instant {
    started_at
        .checked_add(offset)
        .unwrap_or_else(|| started_at + FAR_FUTURE)
}

fn format_seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
