//! Source pane with syntax highlighting and the current-line marker
//!
//! Highlighting is a character scanner, not a lexer: it knows keywords,
//! `#` comments, quoted strings and numbers, which is enough for short
//! scripts.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYWORDS: &[&str] = &[
    "def", "class", "return", "if", "elif", "else", "while", "for", "in", "not", "and", "or",
    "is", "break", "continue", "pass", "import", "from", "as", "lambda", "raise", "assert",
    "del", "global", "nonlocal", "try", "except", "finally", "with", "yield",
];

const CONSTANTS: &[&str] = &["None", "True", "False", "self"];

fn word_style(word: &str, is_call: bool) -> Style {
    if KEYWORDS.contains(&word) {
        Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD)
    } else if CONSTANTS.contains(&word) || word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Style::default().fg(DEFAULT_THEME.number)
    } else if is_call {
        Style::default().fg(DEFAULT_THEME.function)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    }
}

fn highlight_source_line(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut word = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    let flush = |word: &mut String, spans: &mut Vec<Span<'static>>, is_call: bool| {
        if !word.is_empty() {
            let style = word_style(word, is_call);
            spans.push(Span::styled(std::mem::take(word), style));
        }
    };

    while i < chars.len() {
        let c = chars[i];

        if c == '#' {
            flush(&mut word, &mut spans, false);
            let rest: String = chars[i..].iter().collect();
            spans.push(Span::styled(rest, Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '"' || c == '\'' {
            flush(&mut word, &mut spans, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != c {
                end += if chars[end] == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let text: String = chars[i..end].iter().collect();
            spans.push(Span::styled(text, Style::default().fg(DEFAULT_THEME.string)));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush(&mut word, &mut spans, c == '(');
            let style = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        word.push(c);
        i += 1;
    }
    flush(&mut word, &mut spans, false);

    Line::from(spans)
}

/// Scroll state for the source pane
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to; `None` until first render
    pub target_line_row: Option<usize>,
}

/// How the current line is marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMark {
    Current,
    /// The run stopped here waiting for input
    Input,
    /// The run raised after this line
    Error,
}

/// Render the source pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source: &str,
    current_line: usize,
    mark: LineMark,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Source ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    // Keep the current line at the pinned row
    if current_line > 0 && current_line <= total_lines {
        scroll_state.offset = (current_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let (mark_fg, mark_bg) = match mark {
        LineMark::Current => (DEFAULT_THEME.secondary, DEFAULT_THEME.current_line_bg),
        LineMark::Input => (DEFAULT_THEME.secondary, DEFAULT_THEME.secondary),
        LineMark::Error => (DEFAULT_THEME.error, DEFAULT_THEME.error),
    };

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let mut content = highlight_source_line(line);
            let number_style = if line_num == current_line {
                let full_bar = mark != LineMark::Current;
                for span in &mut content.spans {
                    span.style = if full_bar {
                        Style::default()
                            .bg(mark_bg)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        span.style.patch(Style::default().bg(mark_bg))
                    };
                }
                Style::default().fg(mark_fg).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut spans = vec![Span::styled(format!("{:4} ", line_num), number_style)];
            spans.extend(content.spans);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_comment_and_string_spans() {
        let line = highlight_source_line("x = 'a#b'  # note");
        let spans = texts(&line);
        assert!(spans.contains(&"'a#b'".to_string()));
        assert_eq!(spans.last().map(String::as_str), Some("# note"));
    }

    #[test]
    fn test_keyword_style() {
        let line = highlight_source_line("def f():");
        assert_eq!(line.spans[0].content, "def");
        assert_eq!(line.spans[0].style.fg, Some(DEFAULT_THEME.keyword));
        let call = line.spans.iter().find(|s| s.content == "f").unwrap();
        assert_eq!(call.style.fg, Some(DEFAULT_THEME.function));
    }
}
