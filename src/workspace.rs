//! Drafting workspace — the view that hosts generation and review.
//!
//! DESIGN
//! ======
//! One workspace owns one `ProgressRunner` and one `ReviewBoard`, both built
//! fresh from seed data. The runner's completion hook flips the active tab
//! to suggestions. Dropping the workspace drops the runner, which cancels
//! any outstanding stage timers.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::config::RunnerConfig;
use crate::seed::SeedSet;
use crate::services::generation::{ProgressRunner, StartOutcome};
use crate::services::review::ReviewBoard;
use crate::services::session::{AuthError, Session, UserRole};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkspaceTab {
    #[default]
    Generator,
    Suggestions,
    Document,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace access denied: {0}")]
    Forbidden(#[from] AuthError),
}

pub struct DraftingWorkspace {
    client_name: String,
    reviewer: String,
    tab: Arc<Mutex<WorkspaceTab>>,
    runner: ProgressRunner,
    board: ReviewBoard,
}

impl DraftingWorkspace {
    /// Open a workspace for `client_name`. Only solicitors may open one.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for any other role.
    pub fn open(
        session: &Session,
        seeds: SeedSet,
        config: RunnerConfig,
        client_name: impl Into<String>,
    ) -> Result<Self, WorkspaceError> {
        session.require_role(UserRole::Solicitor)?;

        let client_name = client_name.into();
        let tab = Arc::new(Mutex::new(WorkspaceTab::Generator));
        let hook_tab = Arc::clone(&tab);
        let runner = ProgressRunner::new(seeds.stages, config).with_on_complete(move |report| {
            *hook_tab.lock().unwrap_or_else(PoisonError::into_inner) = WorkspaceTab::Suggestions;
            info!(run_id = %report.run_id, "workspace: generation complete, showing suggestions");
        });

        info!(client = %client_name, reviewer = %session.user().name, "workspace: opened");
        Ok(Self {
            client_name,
            reviewer: session.user().name.clone(),
            tab,
            runner,
            board: ReviewBoard::new(seeds.suggestions),
        })
    }

    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    #[must_use]
    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    #[must_use]
    pub fn active_tab(&self) -> WorkspaceTab {
        *self.tab.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_tab(&mut self, tab: WorkspaceTab) {
        *self.tab.lock().unwrap_or_else(PoisonError::into_inner) = tab;
    }

    /// Show the generator and start a run. A run already in flight is left
    /// alone.
    pub fn generate(&mut self) -> StartOutcome {
        self.select_tab(WorkspaceTab::Generator);
        self.runner.start()
    }

    #[must_use]
    pub fn runner(&self) -> &ProgressRunner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut ProgressRunner {
        &mut self.runner
    }

    #[must_use]
    pub fn board(&self) -> &ReviewBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut ReviewBoard {
        &mut self.board
    }
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
