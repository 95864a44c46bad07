//! Program output pane, doubling as the input line when a run is waiting
//! for `input()`

use crate::snapshot::OutputBuffer;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Data needed to render the output pane
pub struct OutputRenderData<'a> {
    pub stdout: &'a str,
    /// Text typed so far, when the pane is taking input
    pub input: Option<&'a str>,
    /// Error that ended the run, shown on the last step
    pub error: Option<&'a str>,
}

/// Render the output pane
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    data: OutputRenderData,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused || data.input.is_some() {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };
    let title = if data.input.is_some() {
        " Output (waiting for input) "
    } else {
        " Output "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut items: Vec<ListItem> = OutputBuffer::lines(data.stdout)
        .into_iter()
        .map(|line| ListItem::new(line).style(Style::default().fg(DEFAULT_THEME.fg)))
        .collect();
    if let Some(error) = data.error {
        items.push(
            ListItem::new(error.to_string()).style(
                Style::default()
                    .fg(DEFAULT_THEME.error)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    }
    if let Some(input) = data.input {
        items.push(ListItem::new(Line::from(vec![
            Span::styled("› ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(input.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
            Span::styled("█", Style::default().fg(DEFAULT_THEME.secondary)),
        ])));
    }

    if items.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let total_items = items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();
    let list = List::new(visible).block(block.padding(Padding::new(1, 0, 0, 0)));
    frame.render_widget(list, area);
}
