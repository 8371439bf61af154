//! Messages pane: the open chatroom's visible window as message cards.

use std::cell::Cell;

use chrono::{Local, TimeZone};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::feed::image::describe_data_uri;
use crate::models::{Message, MessageBody, Sender};

/// Selection and scroll state for the messages pane.
#[derive(Default)]
pub struct MessagesState {
    /// Index into the visible messages.
    pub selected: usize,
    /// Scroll offset in rendered lines. Updated during render so the
    /// viewport only moves when the selection leaves it.
    scroll: Cell<usize>,
}

impl MessagesState {
    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move down, stopping at the last of `count` messages.
    pub fn select_next(&mut self, count: usize) {
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_last(&mut self, count: usize) {
        self.selected = count.saturating_sub(1);
    }

    /// An older page was prepended: keep the same message selected.
    pub fn shift_for_revealed(&mut self, revealed: usize) {
        self.selected += revealed;
        self.scroll.set(0);
    }

    pub fn reset(&mut self) {
        self.selected = 0;
        self.scroll.set(0);
    }
}

/// What the pane shows, borrowed from the open feed.
pub struct MessagesView<'a> {
    pub header: &'a str,
    pub messages: &'a [Message],
    /// Messages in history that are not in the window yet.
    pub hidden: usize,
    pub loading: bool,
    pub loading_older: bool,
    pub agent_typing: bool,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &MessagesState,
    view: Option<&MessagesView>,
    focused: bool,
) {
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

    let Some(view) = view else {
        render_placeholder(inner, buf, "Select a chatroom, or press n to create one.");
        return;
    };

    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_room_header(header_area, buf, view.header);

    let messages_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if messages_area.height == 0 {
        return;
    }

    if view.loading {
        render_placeholder(messages_area, buf, "Loading messages...");
        return;
    }

    let (all_lines, ranges, top) = build_lines(view, state.selected, messages_area.width as usize);
    let total_lines = all_lines.len();
    let visible_height = messages_area.height as usize;

    let mut scroll = compute_auto_scroll(
        state.scroll.get(),
        state.selected,
        &ranges,
        visible_height,
        total_lines,
    );
    // Selecting the newest message follows the tail, typing indicator included.
    if state.selected + 1 >= ranges.len() {
        scroll = total_lines.saturating_sub(visible_height);
    }
    // Selecting the oldest message shows the banner above it.
    if state.selected == 0 {
        scroll = scroll.min(top);
    }
    state.scroll.set(scroll);

    for (row, line_idx) in (scroll..total_lines).take(visible_height).enumerate() {
        let line_area = Rect::new(
            messages_area.x,
            messages_area.y + row as u16,
            messages_area.width,
            1,
        );
        Paragraph::new(all_lines[line_idx].clone()).render(line_area, buf);
    }

    if total_lines > visible_height {
        let indicator_x = messages_area.x + messages_area.width.saturating_sub(1);
        if scroll > 0 {
            let cell = &mut buf[(indicator_x, messages_area.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if scroll + visible_height < total_lines {
            let bottom_y = messages_area.y + messages_area.height.saturating_sub(1);
            let cell = &mut buf[(indicator_x, bottom_y)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

fn render_room_header(area: Rect, buf: &mut Buffer, header: &str) {
    let line = Line::from(Span::styled(
        format!(" {} ", header),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_placeholder(area: Rect, buf: &mut Buffer, text: &str) {
    if area.height == 0 {
        return;
    }
    let row = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
    Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(ratatui::layout::Alignment::Center)
    .render(row, buf);
}

/// Flatten the window into lines. Returns the lines, each message's line
/// range, and the number of banner lines above the first card.
fn build_lines(
    view: &MessagesView,
    selected: usize,
    width: usize,
) -> (Vec<Line<'static>>, Vec<(usize, usize)>, usize) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut ranges = Vec::with_capacity(view.messages.len());
    let dim = Style::default().fg(Color::DarkGray);

    if view.loading_older {
        lines.push(Line::from(Span::styled(
            " Loading older messages...".to_string(),
            Style::default().fg(Color::Cyan),
        )));
        lines.push(Line::from(""));
    } else if view.hidden > 0 {
        lines.push(Line::from(Span::styled(
            format!(" ^ {} older messages (Up at the top to load)", view.hidden),
            dim,
        )));
        lines.push(Line::from(""));
    }
    let top = lines.len();

    if view.messages.is_empty() && !view.agent_typing {
        lines.push(Line::from(Span::styled(
            " No messages yet. Say hello!".to_string(),
            dim,
        )));
    }

    for (idx, msg) in view.messages.iter().enumerate() {
        let start = lines.len();
        render_message_card(&mut lines, msg, width, idx == selected);
        lines.push(Line::from(""));
        ranges.push((start, lines.len()));
    }

    if view.agent_typing {
        lines.push(Line::from(Span::styled(
            format!(" {} is typing...", Sender::Agent.display_name()),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    (lines, ranges, top)
}

fn render_message_card(
    lines: &mut Vec<Line<'static>>,
    msg: &Message,
    width: usize,
    is_selected: bool,
) {
    let card_inner_width = width.saturating_sub(2);
    if card_inner_width < 10 {
        return;
    }

    let border_style = if is_selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let sender_color = match msg.sender {
        Sender::User => Color::Cyan,
        Sender::Agent => Color::Magenta,
    };
    let sender_style = Style::default()
        .fg(sender_color)
        .add_modifier(Modifier::BOLD);

    let rule = format!("+-{}-+", "-".repeat(card_inner_width.saturating_sub(2)));
    lines.push(Line::from(Span::styled(rule.clone(), border_style)));

    // "| You                     14:02 |"
    let sender = msg.sender.display_name();
    let timestamp = timestamp_label(&msg.id);
    let pad = card_inner_width
        .saturating_sub(sender.width() + 1)
        .saturating_sub(timestamp.width() + 1)
        .saturating_sub(2);
    lines.push(Line::from(vec![
        Span::styled("| ".to_string(), border_style),
        Span::styled(format!(" {}", sender), sender_style),
        Span::raw(" ".repeat(pad)),
        Span::styled(format!("{} ", timestamp), Style::default().fg(Color::DarkGray)),
        Span::styled("|".to_string(), border_style),
    ]));

    let content_width = card_inner_width.saturating_sub(2);
    let (body, body_style) = match &msg.body {
        MessageBody::Text(text) => (wrap_text(text, content_width), Style::default()),
        MessageBody::Image(uri) => (
            wrap_text(&format!("[image] {}", describe_data_uri(uri)), content_width),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::DIM),
        ),
    };
    for line in body {
        let pad = content_width.saturating_sub(line.width());
        lines.push(Line::from(vec![
            Span::styled("| ".to_string(), border_style),
            Span::styled(line, body_style),
            Span::raw(" ".repeat(pad)),
            Span::styled(" |".to_string(), border_style),
        ]));
    }

    lines.push(Line::from(Span::styled(rule, border_style)));
}

/// Local wall-clock time from the epoch-millis prefix of a message id.
fn timestamp_label(id: &str) -> String {
    let digits: String = id.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Word-wrap by display width. Explicit newlines are kept; words longer than
/// a line are split.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.width() <= max_width {
            result.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            let needed = if current.is_empty() {
                word.width()
            } else {
                current.width() + 1 + word.width()
            };
            if needed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                let char_width = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
                if current.width() + char_width > max_width {
                    result.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

/// Scroll offset that keeps the selected message visible.
fn compute_auto_scroll(
    current_scroll: usize,
    selected: usize,
    ranges: &[(usize, usize)],
    visible_height: usize,
    total_lines: usize,
) -> usize {
    if ranges.is_empty() || total_lines <= visible_height {
        return 0;
    }
    let Some(&(sel_start, sel_end)) = ranges.get(selected) else {
        return current_scroll;
    };

    let mut scroll = current_scroll;
    if sel_end.saturating_sub(sel_start) >= visible_height {
        scroll = sel_start;
    } else {
        if sel_start < scroll {
            scroll = sel_start;
        }
        if sel_end > scroll + visible_height {
            scroll = sel_end.saturating_sub(visible_height);
        }
    }

    scroll.min(total_lines.saturating_sub(visible_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(messages: &[Message]) -> MessagesView<'_> {
        MessagesView {
            header: "Room",
            messages,
            hidden: 0,
            loading: false,
            loading_older: false,
            agent_typing: false,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
        assert!(wrap_text("text", 0).is_empty());
    }

    #[test]
    fn test_timestamp_label() {
        assert_eq!(timestamp_label("not-a-time"), "");
        let label = timestamp_label("1718000000000_ai");
        assert_eq!(label.len(), 5);
        assert_eq!(&label[2..3], ":");
    }

    #[test]
    fn test_auto_scroll_follows_selection() {
        let ranges = vec![(0, 5), (5, 10), (10, 15), (15, 20)];
        assert_eq!(compute_auto_scroll(0, 0, &ranges, 8, 20), 0);
        assert_eq!(compute_auto_scroll(0, 2, &ranges, 8, 20), 7);
        assert_eq!(compute_auto_scroll(7, 1, &ranges, 8, 20), 5);
        assert_eq!(compute_auto_scroll(0, 3, &ranges, 8, 20), 12);
        // Everything fits.
        assert_eq!(compute_auto_scroll(4, 3, &ranges, 30, 20), 0);
    }

    #[test]
    fn test_cards_show_sender_and_image_label() {
        let messages = vec![
            Message::text("1718000000000".to_string(), "hi", Sender::User),
            Message::image("1718000000001".to_string(), "data:image/png;base64,AA==", Sender::User),
            Message::text("1718000000001_ai".to_string(), "Nice image!", Sender::Agent),
        ];
        let (lines, ranges, top) = build_lines(&view(&messages), 0, 40);
        assert_eq!(top, 0);
        assert_eq!(ranges.len(), 3);

        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert!(text[1].contains("You"));
        assert!(text.iter().any(|l| l.contains("[image] image/png, 1 B")));
        assert!(text.iter().any(|l| l.contains("Gemini")));
    }

    #[test]
    fn test_banners_and_typing_indicator() {
        let messages = vec![Message::text("1".to_string(), "hi", Sender::User)];
        let mut v = view(&messages);
        v.hidden = 20;
        v.agent_typing = true;
        let (lines, _, top) = build_lines(&v, 0, 40);
        assert_eq!(top, 2);
        assert!(line_text(&lines[0]).contains("20 older messages"));
        assert!(line_text(lines.last().unwrap()).contains("Gemini is typing..."));

        v.loading_older = true;
        let (lines, _, _) = build_lines(&v, 0, 40);
        assert!(line_text(&lines[0]).contains("Loading older messages"));
    }

    #[test]
    fn test_empty_room_hint() {
        let (lines, ranges, _) = build_lines(&view(&[]), 0, 40);
        assert!(ranges.is_empty());
        assert!(line_text(&lines[0]).contains("No messages yet"));
    }

    #[test]
    fn test_selection_moves() {
        let mut state = MessagesState::default();
        state.select_next(3);
        state.select_next(3);
        state.select_next(3);
        assert_eq!(state.selected, 2);
        state.shift_for_revealed(20);
        assert_eq!(state.selected, 22);
        state.select_last(0);
        assert_eq!(state.selected, 0);
    }
}
