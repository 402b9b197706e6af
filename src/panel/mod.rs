//! Diagnostic cache panel
//!
//! A read-only reporting client of the cache store's introspection, plus
//! manual eviction of one key or of the whole cache. Used by the `info`
//! command and the interactive `panel` terminal UI.

pub mod report;
pub mod state;
pub mod ui;

pub use report::{display_name, format_age, format_size, CacheReport, KeyReport};
pub use state::{PanelApp, PendingAction};
pub use ui::render as render_panel;
