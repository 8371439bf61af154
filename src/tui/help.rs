//! Help popup: keyboard shortcuts by category.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const POPUP_WIDTH: u16 = 80;
const POPUP_HEIGHT: u16 = 24;

struct Category {
    title: &'static str,
    /// (key, description)
    shortcuts: &'static [(&'static str, &'static str)],
}

const NAVIGATION: Category = Category {
    title: "NAVIGATION",
    shortcuts: &[
        ("Tab", "Cycle focus forward"),
        ("Shift+Tab", "Cycle focus backward"),
        ("Up/Down", "Move within pane"),
        ("Up at top", "Load older messages"),
        ("End", "Jump to newest message"),
        ("Ctrl+K", "Search"),
    ],
};

const CHATROOMS: Category = Category {
    title: "CHATROOMS",
    shortcuts: &[
        ("Enter", "Open chatroom"),
        ("n / Ctrl+N", "New chatroom"),
        ("d", "Delete chatroom (confirm)"),
    ],
};

const MESSAGING: Category = Category {
    title: "MESSAGING",
    shortcuts: &[
        ("Enter", "Send message"),
        ("Ctrl+P", "Attach image"),
        ("Ctrl+U", "Clear compose box"),
        ("y", "Copy selected message"),
        ("Esc", "Cancel / Close popup"),
    ],
};

const MISC: Category = Category {
    title: "MISC",
    shortcuts: &[
        ("Ctrl+D", "Toggle debug log"),
        ("PgUp/PgDn", "Scroll debug log"),
        ("q / Ctrl+C", "Quit"),
        ("?", "Toggle this help"),
    ],
};

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();
    let popup_w = POPUP_WIDTH.min(area.width.saturating_sub(2));
    let popup_h = POPUP_HEIGHT.min(area.height.saturating_sub(2));
    let popup_area = centered_rect(popup_w, popup_h, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(
                " HELP ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("(? to close) ", Style::default().fg(Color::Gray)),
        ]))
        .title_bottom(Line::from(Span::styled(
            " Press any key to close ",
            Style::default().fg(Color::Gray),
        )));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let [left_col, right_col] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(inner);

    frame.render_widget(
        Paragraph::new(build_column_lines(&[&NAVIGATION, &CHATROOMS])),
        inset(left_col),
    );
    frame.render_widget(
        Paragraph::new(build_column_lines(&[&MESSAGING, &MISC])),
        inset(right_col),
    );
}

fn build_column_lines(categories: &[&Category]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (i, cat) in categories.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            cat.title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            "\u{2500}".repeat(34),
            Style::default().fg(Color::DarkGray),
        )));
        for (key, desc) in cat.shortcuts {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<12}", key), Style::default().fg(Color::Yellow)),
                Span::styled(*desc, Style::default().fg(Color::Gray)),
            ]));
        }
    }

    lines
}

/// A sub-rect of the given size centered in `area`.
pub(super) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn inset(area: Rect) -> Rect {
    Rect::new(
        area.x + 1,
        area.y + 1,
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(80, 24, area), Rect::new(10, 8, 80, 24));
        // Clamped to a small terminal.
        let small = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(80, 24, small), Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn test_columns_list_every_shortcut() {
        let lines = build_column_lines(&[&MESSAGING, &MISC]);
        // Title + rule per category, one blank separator.
        let expected = MESSAGING.shortcuts.len() + MISC.shortcuts.len() + 2 * 2 + 1;
        assert_eq!(lines.len(), expected);
    }
}
