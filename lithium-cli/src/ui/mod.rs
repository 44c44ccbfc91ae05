mod detail;
mod footer;
mod header;
mod help;
mod layout;
mod progress;
mod theme;
mod thumbnail;
mod title_list;

pub use detail::DetailView;
pub use footer::{CacheStats, Footer};
pub use header::{Header, PageTabs};
pub use help::HelpView;
pub use layout::AppLayout;
pub use progress::ProgressView;
pub use theme::Theme;
pub use title_list::{ThumbState, TitleList};
