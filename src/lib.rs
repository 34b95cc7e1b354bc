//! Staged draft generation and suggestion review for a will-drafting workflow.

pub mod config;
pub mod seed;
pub mod services;
pub mod state;
pub mod workspace;

pub use config::RunnerConfig;
pub use seed::{SeedError, SeedSet};
pub use services::generation::{ProgressRunner, RunPhase, RunReport, RunState, StartOutcome};
pub use services::review::ReviewBoard;
pub use services::session::{AuthError, Directory, Session, User, UserRole};
pub use workspace::{DraftingWorkspace, WorkspaceError, WorkspaceTab};
