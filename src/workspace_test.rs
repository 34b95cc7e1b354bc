use std::time::Duration;

use super::*;
use crate::services::generation::RunPhase;
use crate::services::session::Directory;
use crate::state::ReviewSummary;

fn solicitor() -> Session {
    Session::login(&Directory::demo(), "solicitor@demo.com", "demo").unwrap()
}

#[test]
fn non_solicitors_are_turned_away() {
    let session = Session::login(&Directory::demo(), "client@demo.com", "demo").unwrap();
    let err = DraftingWorkspace::open(&session, SeedSet::builtin(), RunnerConfig::default(), "Sarah Thompson")
        .err()
        .expect("client role should be refused");
    assert!(matches!(
        err,
        WorkspaceError::Forbidden(AuthError::Forbidden { required: UserRole::Solicitor, actual: UserRole::Client })
    ));
}

#[test]
fn opens_on_generator_tab_with_seeded_board() {
    let workspace =
        DraftingWorkspace::open(&solicitor(), SeedSet::builtin(), RunnerConfig::default(), "Sarah Thompson").unwrap();
    assert_eq!(workspace.active_tab(), WorkspaceTab::Generator);
    assert_eq!(workspace.reviewer(), "Michael Chen");
    assert_eq!(workspace.client_name(), "Sarah Thompson");
    assert_eq!(workspace.board().summary(), ReviewSummary { accepted: 1, rejected: 0, pending: 3 });
    assert_eq!(workspace.runner().phase(), RunPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn completion_switches_to_suggestions() {
    let mut workspace =
        DraftingWorkspace::open(&solicitor(), SeedSet::builtin(), RunnerConfig::default(), "Sarah Thompson").unwrap();
    workspace.select_tab(WorkspaceTab::Document);

    workspace.generate();
    assert_eq!(workspace.active_tab(), WorkspaceTab::Generator);

    assert_eq!(workspace.runner().wait().await, RunPhase::Completed);
    tokio::task::yield_now().await;
    assert_eq!(workspace.active_tab(), WorkspaceTab::Suggestions);

    workspace.board_mut().accept("ai-1");
    workspace.board_mut().accept("ai-3");
    assert_eq!(workspace.board().summary(), ReviewSummary { accepted: 3, rejected: 0, pending: 1 });
}

#[tokio::test(start_paused = true)]
async fn dropping_workspace_cancels_generation() {
    let mut workspace =
        DraftingWorkspace::open(&solicitor(), SeedSet::builtin(), RunnerConfig::default(), "Sarah Thompson").unwrap();
    workspace.generate();
    let rx = workspace.runner().subscribe();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    drop(workspace);
    tokio::time::sleep(Duration::from_secs(30)).await;

    let state = rx.borrow();
    assert_eq!(state.phase(), RunPhase::Cancelled);
    assert!(!state.stages().all_completed());
}
