//! Generation stages and the indexed stage table.
//!
//! DESIGN
//! ======
//! `StageTable` keeps stages in plan order and maps stage id to position so
//! status updates happen in place. The table owns the transition rules:
//! pending -> processing -> completed, strictly left to right, one stage
//! processing at a time. `transition` reaches `Error` from processing only;
//! `mark_error` forces it when a run fails on a refused transition.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl StageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether a stage in this status may move to `next`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing) | (Self::Processing, Self::Completed | Self::Error)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SEED + STAGE
// =============================================================================

/// Static definition of one generation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSeed {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(alias = "durationMs")]
    pub duration_ms: u64,
    #[serde(default, alias = "detailLines", alias = "details")]
    pub detail_lines: Vec<String>,
}

impl StageSeed {
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// A stage as tracked during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_ms: u64,
    pub detail_lines: Vec<String>,
    pub status: StageStatus,
}

impl From<&StageSeed> for Stage {
    fn from(seed: &StageSeed) -> Self {
        Self {
            id: seed.id.clone(),
            title: seed.title.clone(),
            description: seed.description.clone(),
            duration_ms: seed.duration_ms,
            detail_lines: seed.detail_lines.clone(),
            status: StageStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageTransitionError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("illegal transition for stage {id}: {from} -> {to}")]
    Illegal { id: String, from: StageStatus, to: StageStatus },
    #[error("stage {id} cannot start before {blocking} completes")]
    OutOfOrder { id: String, blocking: String },
}

// =============================================================================
// TABLE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StageTable {
    stages: Vec<Stage>,
    index: HashMap<String, usize>,
}

impl StageTable {
    /// Build a table from seeds. The first occurrence of a duplicated id wins
    /// the index slot.
    #[must_use]
    pub fn from_seeds(seeds: &[StageSeed]) -> Self {
        let stages: Vec<Stage> = seeds.iter().map(Stage::from).collect();
        let mut index = HashMap::with_capacity(stages.len());
        for (position, stage) in stages.iter().enumerate() {
            index.entry(stage.id.clone()).or_insert(position);
        }
        Self { stages, index }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Stage> {
        self.index.get(id).map(|&position| &self.stages[position])
    }

    #[must_use]
    pub fn at(&self, position: usize) -> Option<&Stage> {
        self.stages.get(position)
    }

    #[must_use]
    pub fn status(&self, id: &str) -> Option<StageStatus> {
        self.get(id).map(|stage| stage.status)
    }

    /// The stage currently processing, if any.
    #[must_use]
    pub fn processing(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.status == StageStatus::Processing)
    }

    #[must_use]
    pub fn count(&self, status: StageStatus) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.status == status)
            .count()
    }

    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.stages
            .iter()
            .all(|stage| stage.status == StageStatus::Completed)
    }

    /// Move every stage back to pending.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.status = StageStatus::Pending;
        }
    }

    /// Force a stage into `Error`, returning its previous status. Unknown ids
    /// and stages already in a terminal status are left alone.
    pub fn mark_error(&mut self, id: &str) -> Option<StageStatus> {
        let &position = self.index.get(id)?;
        let stage = &mut self.stages[position];
        if stage.status.is_terminal() {
            return None;
        }
        let previous = stage.status;
        stage.status = StageStatus::Error;
        Some(previous)
    }

    /// Apply a status transition in place, returning the previous status.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown ids, transitions the status rules forbid,
    /// or a stage starting while an earlier stage is not yet completed.
    pub fn transition(&mut self, id: &str, next: StageStatus) -> Result<StageStatus, StageTransitionError> {
        let Some(&position) = self.index.get(id) else {
            return Err(StageTransitionError::UnknownStage(id.to_owned()));
        };

        let current = self.stages[position].status;
        if !current.can_advance_to(next) {
            return Err(StageTransitionError::Illegal { id: id.to_owned(), from: current, to: next });
        }

        if next == StageStatus::Processing {
            if let Some(blocking) = self.stages[..position]
                .iter()
                .find(|stage| stage.status != StageStatus::Completed)
            {
                return Err(StageTransitionError::OutOfOrder { id: id.to_owned(), blocking: blocking.id.clone() });
            }
        }

        self.stages[position].status = next;
        Ok(current)
    }
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod tests;
