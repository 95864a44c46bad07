//! Shared helpers for pane rendering

use crate::client::format::CYCLE_GLYPH;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::ListItem,
};

pub(super) fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Clamp `offset` and keep the rows that fit in `area` (borders excluded)
pub(super) fn visible_window<'a>(
    items: Vec<ListItem<'a>>,
    area: Rect,
    offset: &mut usize,
) -> Vec<ListItem<'a>> {
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if items.len() > visible_height {
        *offset = (*offset).min(items.len() - visible_height);
    } else {
        *offset = 0;
    }
    items
        .into_iter()
        .skip(*offset)
        .take(visible_height)
        .collect()
}

/// Rectangle of `percent_x` by `percent_y` centered in `area`
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}

/// Color a formatted value (simple token scan)
pub(super) fn highlight_value_string(s: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut token = String::new();
    let mut in_string: Option<char> = None;

    for c in s.chars() {
        if let Some(quote) = in_string {
            token.push(c);
            if c == quote {
                spans.push(style_token(&std::mem::take(&mut token)));
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                if !token.is_empty() {
                    spans.push(style_token(&std::mem::take(&mut token)));
                }
                token.push(c);
                in_string = Some(c);
            }
            '[' | ']' | '{' | '}' | '(' | ')' | ',' | ':' | ' ' => {
                if !token.is_empty() {
                    spans.push(style_token(&std::mem::take(&mut token)));
                }
                spans.push(Span::styled(c.to_string(), Style::default().fg(DEFAULT_THEME.fg)));
            }
            _ => token.push(c),
        }
    }
    if !token.is_empty() {
        spans.push(style_token(&token));
    }
    spans
}

fn style_token(token: &str) -> Span<'static> {
    let color = if token.starts_with('\'') || token.starts_with('"') {
        DEFAULT_THEME.string
    } else if token == CYCLE_GLYPH {
        DEFAULT_THEME.back_edge
    } else if matches!(token, "None" | "True" | "False")
        || token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | 'e' | '+'))
    {
        DEFAULT_THEME.number
    } else {
        DEFAULT_THEME.fg
    };
    Span::styled(token.to_string(), Style::default().fg(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_keep_delimiters() {
        let spans = highlight_value_string("['a, b', 3]");
        let texts: Vec<_> = spans.iter().map(|s| s.content.to_string()).collect();
        assert!(texts.contains(&"'a, b'".to_string()));
        let number = spans.iter().find(|s| s.content == "3").unwrap();
        assert_eq!(number.style.fg, Some(DEFAULT_THEME.number));
    }

    #[test]
    fn test_visible_window_clamps() {
        let items: Vec<ListItem> = (0..10).map(|i| ListItem::new(i.to_string())).collect();
        let mut offset = 50;
        let shown = visible_window(items, Rect::new(0, 0, 10, 6), &mut offset);
        assert_eq!(shown.len(), 4);
        assert_eq!(offset, 6);
    }
}
