//! Search overlay (Ctrl+K): chatrooms by name, and the open chatroom's
//! loaded messages by text.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::input::LineInput;
use crate::models::Message;
use crate::registry::ChatroomRegistry;

/// Longest snippet shown for a matching message.
const SNIPPET_CHARS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchResultKind {
    /// A chatroom, by id.
    Chatroom(String),
    /// A message, by index into the visible window.
    Message(usize),
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    pub kind: SearchResultKind,
    pub label: String,
    /// The text that matched, or a hint.
    pub context: String,
}

#[derive(Default)]
pub struct SearchState {
    pub active: bool,
    pub input: LineInput,
    pub results: Vec<SearchResult>,
    pub selected: usize,
}

impl SearchState {
    pub fn activate(&mut self) {
        self.reset();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.reset();
        self.active = false;
    }

    fn reset(&mut self) {
        self.input.clear();
        self.results.clear();
        self.selected = 0;
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
        }
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.get(self.selected)
    }

    /// Recompute results. Called whenever the query changes.
    pub fn update_results(&mut self, registry: &ChatroomRegistry, messages: &[Message]) {
        self.results.clear();
        self.selected = 0;

        let query = self.input.text().trim().to_lowercase();
        if query.is_empty() {
            return;
        }

        self.results
            .extend(registry.search(&query).into_iter().map(|room| SearchResult {
                kind: SearchResultKind::Chatroom(room.id.clone()),
                label: room.name.clone(),
                context: "Chatroom".to_string(),
            }));

        for (idx, msg) in messages.iter().enumerate() {
            let Some(text) = msg.as_text() else {
                continue;
            };
            if !text.to_lowercase().contains(&query) {
                continue;
            }
            let first_line = text.lines().next().unwrap_or("");
            let mut snippet: String = first_line.chars().take(SNIPPET_CHARS).collect();
            if snippet.len() < first_line.len() {
                snippet.push_str("...");
            }
            self.results.push(SearchResult {
                kind: SearchResultKind::Message(idx),
                label: msg.sender.display_name().to_string(),
                context: snippet,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const MAX_VISIBLE_RESULTS: usize = 10;

/// Border + input + border.
const SEARCH_BAR_HEIGHT: u16 = 3;

/// Draw the overlay below the header: the input bar and a results dropdown.
pub fn render_search_overlay(frame: &mut Frame, state: &SearchState) {
    if !state.active {
        return;
    }

    let area = frame.area();
    let results_height = if state.input.is_empty() {
        0
    } else if state.results.is_empty() {
        3
    } else {
        state.results.len().min(MAX_VISIBLE_RESULTS) as u16 + 2
    };

    // Leave the header and status bar visible.
    let overlay_height = (SEARCH_BAR_HEIGHT + results_height).min(area.height.saturating_sub(2));
    if overlay_height == 0 {
        return;
    }
    let overlay_area = Rect::new(area.x, area.y + 1, area.width, overlay_height);
    frame.render_widget(Clear, overlay_area);

    let bar_area = Rect::new(
        overlay_area.x,
        overlay_area.y,
        overlay_area.width,
        SEARCH_BAR_HEIGHT.min(overlay_area.height),
    );
    render_search_bar(bar_area, frame, state);

    if results_height > 0 && overlay_area.height > SEARCH_BAR_HEIGHT {
        let results_area = Rect::new(
            overlay_area.x + 1,
            overlay_area.y + SEARCH_BAR_HEIGHT,
            overlay_area.width.saturating_sub(2),
            overlay_area.height - SEARCH_BAR_HEIGHT,
        );
        render_results_dropdown(results_area, frame.buffer_mut(), state);
    }
}

fn render_search_bar(area: Rect, frame: &mut Frame, state: &SearchState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(Span::styled(
            " Search (Esc to close) ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if state.input.is_empty() {
        let placeholder: String = " Search chatrooms and messages..."
            .chars()
            .take(inner.width as usize)
            .collect();
        Paragraph::new(Line::from(Span::styled(
            placeholder,
            Style::default().fg(Color::DarkGray),
        )))
        .render(inner, frame.buffer_mut());
        frame.set_cursor_position((inner.x + 1, inner.y));
        return;
    }

    let (visible, cursor) = state.input.viewport((inner.width as usize).saturating_sub(2));
    Paragraph::new(Line::from(Span::styled(
        format!(" {}", visible),
        Style::default().fg(Color::White),
    )))
    .render(inner, frame.buffer_mut());
    frame.set_cursor_position((inner.x + 1 + cursor as u16, inner.y));
}

fn render_results_dropdown(area: Rect, buf: &mut Buffer, state: &SearchState) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if state.results.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            " No results found",
            Style::default().fg(Color::DarkGray),
        )))
        .render(inner, buf);
        return;
    }

    let visible_count = state.results.len().min(inner.height as usize);
    let offset = (state.selected + 1).saturating_sub(visible_count);

    for (row, idx) in (offset..state.results.len()).take(visible_count).enumerate() {
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        render_result_row(row_area, buf, &state.results[idx], idx == state.selected);
    }
}

fn render_result_row(area: Rect, buf: &mut Buffer, result: &SearchResult, selected: bool) {
    let w = area.width as usize;
    let bg = if selected { Color::DarkGray } else { Color::Reset };

    let icon = match result.kind {
        SearchResultKind::Chatroom(_) => "#",
        SearchResultKind::Message(_) => ">",
    };
    let icon_style = Style::default()
        .fg(Color::Cyan)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let label_style = if selected {
        Style::default()
            .fg(Color::White)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).bg(bg)
    };
    let context_style = Style::default().fg(Color::DarkGray).bg(bg);

    // " # Label - context"
    let prefix = format!(" {} ", icon);
    let separator = " - ";
    let used = prefix.len() + result.label.width() + separator.len();
    let context: String = result.context.chars().take(w.saturating_sub(used)).collect();
    let pad = w.saturating_sub(used + context.width());

    let line = Line::from(vec![
        Span::styled(prefix, icon_style),
        Span::styled(result.label.clone(), label_style),
        Span::styled(separator, context_style),
        Span::styled(context, context_style),
        Span::styled(" ".repeat(pad), Style::default().bg(bg)),
    ]);
    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Sender;
    use crate::store::MemoryStore;

    fn registry() -> ChatroomRegistry {
        let mut registry = ChatroomRegistry::load(Arc::new(MemoryStore::new())).unwrap();
        registry.create("Travel plans").unwrap();
        registry.create("Recipes").unwrap();
        registry
    }

    fn messages() -> Vec<Message> {
        vec![
            Message::text("10".to_string(), "Planning a trip to Rome", Sender::User),
            Message::image("11".to_string(), "data:image/png;base64,AA==", Sender::User),
            Message::text("11_ai".to_string(), "Nice image!", Sender::Agent),
        ]
    }

    fn search(state: &mut SearchState, registry: &ChatroomRegistry, query: &str) {
        state.activate();
        for c in query.chars() {
            state.input.insert_char(c);
        }
        state.update_results(registry, &messages());
    }

    #[test]
    fn test_empty_query_has_no_results() {
        let mut state = SearchState::default();
        search(&mut state, &registry(), "   ");
        assert!(state.results.is_empty());
    }

    #[test]
    fn test_matches_rooms_and_messages() {
        let registry = registry();
        let travel = registry.list()[0].id.clone();
        let mut state = SearchState::default();
        search(&mut state, &registry, "PLAN");
        let kinds: Vec<_> = state.results.iter().map(|r| r.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                SearchResultKind::Chatroom(travel),
                SearchResultKind::Message(0)
            ]
        );
        assert_eq!(state.results[0].label, "Travel plans");
        assert_eq!(state.results[1].label, "You");
    }

    #[test]
    fn test_image_messages_are_skipped() {
        let mut state = SearchState::default();
        search(&mut state, &registry(), "image");
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].kind, SearchResultKind::Message(2));
    }

    #[test]
    fn test_navigation_and_deactivate() {
        let mut state = SearchState::default();
        search(&mut state, &registry(), "e");
        assert!(state.results.len() > 1);
        state.select_next();
        assert_eq!(state.selected, 1);
        state.select_previous();
        state.select_previous();
        assert_eq!(state.selected, 0);

        state.deactivate();
        assert!(!state.active);
        assert!(state.input.is_empty());
        assert!(state.selected_result().is_none());
    }
}
