/// User actions that can be performed in the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move selection up
    MoveUp,
    /// Move selection down
    MoveDown,
    /// Move selection up by a page
    PageUp,
    /// Move selection down by a page
    PageDown,
    /// Go to first title
    GoToFirst,
    /// Go to last title
    GoToLast,
    /// Switch to next page
    NextPage,
    /// Switch to previous page
    PrevPage,
    /// Launch the selected title
    Launch,
    /// Start a new scan pass
    Rescan,
    /// Show help overlay
    ShowHelp,
    /// Hide help overlay
    HideHelp,
    /// Quit the application
    Quit,
    /// No action (for tick events)
    Tick,
}
