//! Domain services used by the drafting workspace.
//!
//! ARCHITECTURE
//! ============
//! Service modules own behavior (timing, decisions, access) so the workspace
//! can stay focused on wiring them together for one view.

pub mod generation;
pub mod review;
pub mod session;
