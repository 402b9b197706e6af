//! Cache panel rendering
//!
//! Renders the summary line, one row per watched key and, when an action is
//! pending, a centered confirmation overlay.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::report::{display_name, format_age, format_size, KeyReport};
use super::state::{PanelApp, PendingAction};

/// Renders the cache panel
pub fn render(frame: &mut Frame, app: &PanelApp) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    render_summary(frame, app, chunks[0]);
    render_entries(frame, app, chunks[1]);
    render_footer(frame, app, chunks[2]);

    if let Some(action) = &app.pending {
        render_confirmation(frame, action);
    }
}

fn render_summary(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let report = &app.report;
    let line = Line::from(vec![
        Span::raw(format!(
            "Cached items: {}/{}",
            report.cached_count(),
            report.len()
        )),
        Span::raw("   "),
        Span::raw(format!(
            "Total size: {}",
            format_size(Some(report.total_size()))
        )),
        Span::raw("   "),
        Span::styled(
            format!("Recent (6h): {}", app.recent.count),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let block = Block::default()
        .title(" Cache Manager ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_entries(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let mut lines = Vec::new();

    if app.report.is_empty() {
        lines.push(Line::from(Span::styled(
            "No cache keys to show",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (i, entry) in app.report.entries().iter().enumerate() {
        lines.extend(entry_lines(entry, i == app.selected_index));
    }

    // Keep the selected row on screen; each entry takes two lines
    let visible = area.height.saturating_sub(2) as usize;
    let selected_bottom = (app.selected_index + 1) * 2;
    let scroll = selected_bottom.saturating_sub(visible) as u16;

    let block = Block::default().title(" Keys ").borders(Borders::ALL);
    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));

    frame.render_widget(paragraph, area);
}

fn entry_lines(entry: &KeyReport, selected: bool) -> Vec<Line<'static>> {
    let marker = if selected { "> " } else { "  " };
    let name_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let detail = if entry.info.exists {
        Span::styled(
            format!(
                "    Age: {} • Size: {}",
                format_age(entry.info.age),
                format_size(entry.info.size)
            ),
            Style::default().fg(Color::Gray),
        )
    } else {
        Span::styled("    Not cached", Style::default().fg(Color::DarkGray))
    };

    vec![
        Line::from(vec![
            Span::styled(marker, name_style),
            Span::styled(display_name(&entry.key), name_style),
        ]),
        Line::from(detail),
    ]
}

fn render_footer(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let hints = Line::from(vec![
        hint("↑/↓", "select"),
        hint("d", "clear key"),
        hint("c", "clear all"),
        hint("r", "reload"),
        hint("q", "quit"),
    ]);

    let mut lines = vec![hints];
    if let Some(status) = &app.status {
        lines.insert(
            0,
            Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Green),
            )),
        );
    }

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
    frame.render_widget(paragraph, area);
}

fn hint(key: &str, description: &str) -> Span<'static> {
    Span::styled(
        format!("{} {}  ", key, description),
        Style::default().fg(Color::DarkGray),
    )
}

fn render_confirmation(frame: &mut Frame, action: &PendingAction) {
    let prompt = match action {
        PendingAction::Remove(key) => format!("Clear cache for \"{}\"?", key),
        PendingAction::ClearAll => {
            "Clear all cached data? Fresh data will be fetched on next load.".to_string()
        }
    };

    let area = centered_rect(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(prompt),
        Line::from(""),
        Line::from(Span::styled(
            "y to confirm, n to cancel",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

/// Helper function to create a centered rect
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryStorage};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn create_test_panel() -> PanelApp {
        let store = CacheStore::new(Arc::new(MemoryStorage::new()));
        store.set("/drag_vs_hr_granularity=month", &vec![1, 2, 3], None);
        PanelApp::new(
            store,
            vec![
                "/drag_vs_hr_granularity=month".to_string(),
                "/expected_vs_actual_distance".to_string(),
            ],
        )
    }

    fn rendered(app: &PanelApp) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal
            .draw(|frame| {
                render(frame, app);
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_render_shows_summary_and_rows() {
        let content = rendered(&create_test_panel());

        assert!(content.contains("Cache Manager"), "Should render title");
        assert!(content.contains("Cached items: 1/2"), "Should render counts");
        assert!(content.contains("drag vs hr granularity=month"));
        assert!(content.contains("Not cached"), "Missing key should be marked");
        assert!(content.contains("Age: 0m"));
        assert!(content.contains("Recent (6h): 1"));
    }

    #[test]
    fn test_render_confirmation_overlay() {
        let mut app = create_test_panel();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));

        let content = rendered(&app);

        assert!(content.contains("Confirm"), "Should render confirmation box");
        assert!(content.contains("y to confirm"));
    }

    #[test]
    fn test_render_empty_key_list() {
        let store = CacheStore::new(Arc::new(MemoryStorage::new()));
        let app = PanelApp::new(store, Vec::new());

        let content = rendered(&app);

        assert!(content.contains("No cache keys to show"));
        assert!(content.contains("Cached items: 0/0"));
    }
}
