mod action;
mod launch;
mod state;

pub use action::Action;
pub use launch::Launcher;
pub use state::{AppMode, AppState};
