//! Enumerations for TUI state management.

/// Which screen receives keys. Derived from the controller plus the App's own
/// overlays.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    TaskList,
    TaskDetail,
    Form,
    ProgressEditor,
    Search,
    Help,
}
