//! Diagnostic panel state and keyboard handling
//!
//! Holds the report for the watched keys, the current selection and any
//! pending confirmation, and applies removals to the cache store.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use tracing::info;

use super::report::{CacheReport, KeyReport};
use crate::cache::{CacheConfig, CacheStore, CacheSummary};

/// How often the panel re-reads the store on its own
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A destructive action waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Remove the entry for one key
    Remove(String),
    /// Remove every entry under the cache prefix
    ClearAll,
}

/// State of the interactive cache panel
pub struct PanelApp {
    store: CacheStore,
    keys: Vec<String>,
    /// Introspection results for the watched keys
    pub report: CacheReport,
    /// Stored entries written within the chart TTL
    pub recent: CacheSummary,
    /// When the store was last read
    pub last_refresh: Instant,
    /// Index of the highlighted row
    pub selected_index: usize,
    /// Action awaiting a yes/no answer
    pub pending: Option<PendingAction>,
    /// Outcome of the last action, shown in the footer
    pub status: Option<String>,
    /// Flag indicating the panel should close
    pub should_quit: bool,
}

impl PanelApp {
    /// Creates a panel watching `keys`
    pub fn new(store: CacheStore, keys: Vec<String>) -> Self {
        let report = CacheReport::collect(&store, keys.iter().cloned());
        let recent = recent_summary(&store);
        Self {
            store,
            keys,
            report,
            recent,
            last_refresh: Instant::now(),
            selected_index: 0,
            pending: None,
            status: None,
            should_quit: false,
        }
    }

    /// Re-reads every watched key from the store
    pub fn refresh(&mut self) {
        self.report = CacheReport::collect(&self.store, self.keys.iter().cloned());
        self.recent = recent_summary(&self.store);
        self.last_refresh = Instant::now();
    }

    /// Refreshes once [`AUTO_REFRESH_INTERVAL`] has passed since the last read
    ///
    /// Returns whether a refresh happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_refresh) < AUTO_REFRESH_INTERVAL {
            return false;
        }
        self.refresh();
        true
    }

    /// Row under the cursor
    pub fn selected(&self) -> Option<&KeyReport> {
        self.report.entries().get(self.selected_index)
    }

    /// Handles keyboard input
    ///
    /// - `q` or `Esc`: Quit (or cancel a pending confirmation)
    /// - `Up`/`k`, `Down`/`j`: Move the selection, wrapping around
    /// - `d`/`Delete`: Ask to clear the selected key
    /// - `c`: Ask to clear all cached data
    /// - `y`/`Enter`, `n`: Answer a pending confirmation
    /// - `r`: Reload the report
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if self.pending.is_some() {
            match key_event.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm(),
                KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
                    self.pending = None;
                }
                _ => {}
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection_up();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection_down();
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let selected = self.selected().map(|s| (s.key.clone(), s.info.exists));
                match selected {
                    Some((key, true)) => self.pending = Some(PendingAction::Remove(key)),
                    Some((_, false)) => self.status = Some("Not cached".to_string()),
                    None => {}
                }
            }
            KeyCode::Char('c') => {
                self.pending = Some(PendingAction::ClearAll);
            }
            KeyCode::Char('r') => {
                self.refresh();
                self.status = Some("Reloaded".to_string());
            }
            _ => {}
        }
    }

    fn confirm(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };

        match action {
            PendingAction::Remove(key) => {
                if self.store.remove(&key) {
                    info!(key = %key, "cache entry cleared");
                    self.report.mark_removed(&key);
                    self.recent = recent_summary(&self.store);
                    self.status = Some(format!("Cleared {}", key));
                } else {
                    self.status = Some(format!("Failed to clear {}", key));
                }
            }
            PendingAction::ClearAll => {
                if self.store.clear() {
                    info!("cache cleared");
                    self.report.mark_all_removed();
                    self.recent = CacheSummary::default();
                    self.status = Some("Cleared all cached data".to_string());
                } else {
                    self.status = Some("Failed to clear cache".to_string());
                }
            }
        }
    }

    fn move_selection_up(&mut self) {
        let count = self.report.len();
        if count == 0 {
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = count - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    fn move_selection_down(&mut self) {
        let count = self.report.len();
        if count == 0 {
            return;
        }
        self.selected_index = (self.selected_index + 1) % count;
    }
}

fn recent_summary(store: &CacheStore) -> CacheSummary {
    store.summary(CacheConfig::charts().duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStorage, Storage};
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    /// Helper to create a KeyEvent for testing
    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn create_test_panel() -> (PanelApp, CacheStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CacheStore::new(storage.clone());
        store.set("a", &1, None);
        store.set("b", &2, None);
        let panel = PanelApp::new(
            store.clone(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );
        (panel, store, storage)
    }

    #[test]
    fn test_initial_report() {
        let (panel, _store, _storage) = create_test_panel();
        assert_eq!(panel.report.len(), 3);
        assert_eq!(panel.report.cached_count(), 2);
        assert_eq!(panel.selected_index, 0);
        assert!(panel.pending.is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let (mut panel, _store, _storage) = create_test_panel();

        panel.handle_key(key_event(KeyCode::Up));
        assert_eq!(panel.selected_index, 2);

        panel.handle_key(key_event(KeyCode::Char('j')));
        assert_eq!(panel.selected_index, 0);

        panel.handle_key(key_event(KeyCode::Down));
        assert_eq!(panel.selected_index, 1);

        panel.handle_key(key_event(KeyCode::Char('k')));
        assert_eq!(panel.selected_index, 0);
    }

    #[test]
    fn test_remove_requires_confirmation() {
        let (mut panel, store, _storage) = create_test_panel();

        panel.handle_key(key_event(KeyCode::Char('d')));
        assert_eq!(panel.pending, Some(PendingAction::Remove("a".to_string())));
        assert!(store.cache_info("a").exists);

        panel.handle_key(key_event(KeyCode::Char('y')));
        assert!(panel.pending.is_none());
        assert!(!store.cache_info("a").exists);
        assert_eq!(panel.report.cached_count(), 1);
        assert_eq!(panel.status.as_deref(), Some("Cleared a"));
    }

    #[test]
    fn test_cancelled_remove_keeps_entry() {
        let (mut panel, store, _storage) = create_test_panel();

        panel.handle_key(key_event(KeyCode::Char('d')));
        panel.handle_key(key_event(KeyCode::Char('n')));

        assert!(panel.pending.is_none());
        assert!(store.cache_info("a").exists);
        assert!(!panel.should_quit);
    }

    #[test]
    fn test_remove_on_missing_key_does_not_prompt() {
        let (mut panel, _store, _storage) = create_test_panel();
        panel.selected_index = 2;

        panel.handle_key(key_event(KeyCode::Char('d')));

        assert!(panel.pending.is_none());
        assert_eq!(panel.status.as_deref(), Some("Not cached"));
    }

    #[test]
    fn test_clear_all_leaves_foreign_keys() {
        let (mut panel, store, storage) = create_test_panel();
        storage.set_item("unrelated", "keep").unwrap();

        panel.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(panel.pending, Some(PendingAction::ClearAll));
        panel.handle_key(key_event(KeyCode::Enter));

        assert_eq!(panel.report.cached_count(), 0);
        assert!(!store.cache_info("b").exists);
        assert_eq!(storage.get_item("unrelated").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_refresh_picks_up_external_writes() {
        let (mut panel, store, _storage) = create_test_panel();
        store.set("c", &3, None);
        assert_eq!(panel.report.cached_count(), 2);

        panel.handle_key(key_event(KeyCode::Char('r')));
        assert_eq!(panel.report.cached_count(), 3);
    }

    #[test]
    fn test_q_quits() {
        let (mut panel, _store, _storage) = create_test_panel();
        panel.handle_key(key_event(KeyCode::Char('q')));
        assert!(panel.should_quit);
    }

    #[test]
    fn test_esc_cancels_pending_instead_of_quitting() {
        let (mut panel, _store, _storage) = create_test_panel();
        panel.handle_key(key_event(KeyCode::Char('c')));
        panel.handle_key(key_event(KeyCode::Esc));

        assert!(panel.pending.is_none());
        assert!(!panel.should_quit);
    }

    #[test]
    fn test_failed_clear_reports_status() {
        let store = CacheStore::new(Arc::new(MemoryStorage::unavailable()));
        let mut panel = PanelApp::new(store, vec!["a".to_string()]);

        panel.handle_key(key_event(KeyCode::Char('c')));
        panel.handle_key(key_event(KeyCode::Char('y')));

        assert_eq!(panel.status.as_deref(), Some("Failed to clear cache"));
    }

    #[test]
    fn test_empty_key_list_navigation_is_noop() {
        let store = CacheStore::new(Arc::new(MemoryStorage::new()));
        let mut panel = PanelApp::new(store, Vec::new());

        panel.handle_key(key_event(KeyCode::Down));
        panel.handle_key(key_event(KeyCode::Up));
        panel.handle_key(key_event(KeyCode::Char('d')));

        assert_eq!(panel.selected_index, 0);
        assert!(panel.pending.is_none());
    }

    #[test]
    fn test_tick_refreshes_after_interval() {
        let (mut panel, store, _storage) = create_test_panel();
        store.set("c", &3, None);
        let start = panel.last_refresh;

        assert!(!panel.tick(start + Duration::from_secs(5)));
        assert_eq!(panel.report.cached_count(), 2);

        assert!(panel.tick(start + AUTO_REFRESH_INTERVAL));
        assert_eq!(panel.report.cached_count(), 3);
        assert_eq!(panel.recent.count, 3);
    }

    #[test]
    fn test_recent_summary_tracks_removals() {
        let (mut panel, _store, _storage) = create_test_panel();
        assert_eq!(panel.recent.count, 2);

        panel.handle_key(key_event(KeyCode::Char('d')));
        panel.handle_key(key_event(KeyCode::Char('y')));
        assert_eq!(panel.recent.count, 1);

        panel.handle_key(key_event(KeyCode::Char('c')));
        panel.handle_key(key_event(KeyCode::Char('y')));
        assert_eq!(panel.recent.count, 0);
    }
}
