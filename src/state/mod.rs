//! Domain state shared by the generation and review services.
//!
//! DESIGN
//! ======
//! Plain data types plus the stage table's transition rules. Nothing here
//! touches the clock or spawns tasks; the services own behavior over time.

pub mod stage;
pub mod suggestion;

pub use stage::{Stage, StageSeed, StageStatus, StageTable, StageTransitionError};
pub use suggestion::{AcceptedEdit, Category, Decision, Impact, ReviewSummary, Severity, Suggestion};
