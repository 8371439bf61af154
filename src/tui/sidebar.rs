//! Sidebar widget: the chatroom list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::Chatroom;

/// Sidebar state: a snapshot of the registry plus navigation.
#[derive(Default)]
pub struct SidebarState {
    pub rooms: Vec<Chatroom>,
    /// Index into `rooms`.
    pub selected: usize,
    /// Id of the chatroom shown in the messages pane.
    pub open_room: Option<String>,
}

impl SidebarState {
    /// Replace the list after the registry changed, keeping the selection on
    /// the same chatroom when it still exists.
    pub fn update_rooms(&mut self, rooms: Vec<Chatroom>) {
        let selected_id = self.selected_room().map(|r| r.id.clone());
        self.rooms = rooms;
        if let Some(id) = selected_id {
            if let Some(pos) = self.rooms.iter().position(|r| r.id == id) {
                self.selected = pos;
            }
        }
        self.clamp_selection();
    }

    pub fn selected_room(&self) -> Option<&Chatroom> {
        self.rooms.get(self.selected)
    }

    pub fn select_id(&mut self, id: &str) {
        if let Some(pos) = self.rooms.iter().position(|r| r.id == id) {
            self.selected = pos;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.rooms.len() {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rooms.len().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(area: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
    let (border_style, border_type) = if focused {
        (Style::default().fg(Color::Yellow), BorderType::Double)
    } else {
        (Style::default().fg(Color::DarkGray), BorderType::Plain)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header = if focused { ">> CHATROOMS" } else { "   CHATROOMS" };
    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    Paragraph::new(Line::from(Span::styled(
        header,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )))
    .render(header_area, buf);

    let list_height = inner.height.saturating_sub(1) as usize;
    if list_height == 0 {
        return;
    }

    if state.rooms.is_empty() {
        let hint_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        Paragraph::new(Line::from(Span::styled(
            " (none) n: new",
            Style::default().fg(Color::DarkGray),
        )))
        .render(hint_area, buf);
        return;
    }

    let offset = scroll_offset(state.selected, list_height, state.rooms.len());
    for (row, idx) in (offset..state.rooms.len()).take(list_height).enumerate() {
        let room = &state.rooms[idx];
        let row_area = Rect::new(inner.x, inner.y + 1 + row as u16, inner.width, 1);
        let is_open = state.open_room.as_deref() == Some(room.id.as_str());
        render_row(row_area, buf, &room.name, idx == state.selected, is_open);
    }
}

/// Keep the selected row on screen.
fn scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    selected
        .saturating_sub(height - 1)
        .min(total.saturating_sub(height))
}

fn render_row(area: Rect, buf: &mut Buffer, name: &str, selected: bool, is_open: bool) {
    let style = if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if is_open {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    };

    let marker = if is_open { " > " } else { "   " };
    let width = area.width as usize;
    let name_width = width.saturating_sub(marker.len());
    let mut label: String = name.chars().take(name_width).collect();
    if name.chars().count() > name_width && name_width > 3 {
        label = name.chars().take(name_width - 3).collect::<String>() + "...";
    }
    let pad = name_width.saturating_sub(unicode_width::UnicodeWidthStr::width(label.as_str()));

    let line = Line::from(vec![
        Span::styled(marker, style.fg(Color::Cyan)),
        Span::styled(label, style),
        Span::styled(" ".repeat(pad), style),
    ]);
    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, name: &str) -> Chatroom {
        Chatroom {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_navigation_bounds() {
        let mut state = SidebarState::default();
        state.move_down();
        assert_eq!(state.selected, 0);

        state.update_rooms(vec![room("1", "a"), room("2", "b")]);
        state.move_down();
        state.move_down();
        assert_eq!(state.selected, 1);
        state.move_up();
        state.move_up();
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_update_keeps_selection_on_same_room() {
        let mut state = SidebarState::default();
        state.update_rooms(vec![room("1", "a"), room("2", "b"), room("3", "c")]);
        state.select_id("3");

        // Room 1 deleted: selection follows room 3.
        state.update_rooms(vec![room("2", "b"), room("3", "c")]);
        assert_eq!(state.selected_room().unwrap().id, "3");

        // Selected room deleted: clamp.
        state.update_rooms(vec![room("2", "b")]);
        assert_eq!(state.selected_room().unwrap().id, "2");

        state.update_rooms(Vec::new());
        assert!(state.selected_room().is_none());
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(2, 5, 3), 0);
        assert_eq!(scroll_offset(4, 5, 10), 0);
        assert_eq!(scroll_offset(7, 5, 10), 3);
        assert_eq!(scroll_offset(9, 5, 10), 5);
    }
}
