//! Flat variable inspector
//!
//! One row per visible binding: name, type label and the one-line value.
//! Every binding shows here, including scalars and values the structures
//! view can't draw.

use super::utils::{border_style, highlight_value_string, visible_window};
use crate::client::format::format_value;
use crate::snapshot::Step;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the variables pane
pub struct VariablesScrollState {
    pub offset: usize,
}

/// Data needed to render the variables pane
pub struct VariablesRenderData<'a> {
    pub step: Option<&'a Step>,
    /// Names in display order
    pub names: &'a [&'a str],
    pub selected: Option<&'a str>,
}

/// Render the variables pane
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    data: VariablesRenderData,
    is_focused: bool,
    scroll_state: &mut VariablesScrollState,
) {
    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let mut items = Vec::new();
    if let Some(step) = data.step {
        for name in data.names {
            let Some(binding) = step.variables.get(*name) else {
                continue;
            };
            let is_selected = data.selected == Some(*name);
            let marker = if is_selected { "▸ " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(DEFAULT_THEME.secondary)),
                Span::styled(
                    name.to_string(),
                    Style::default()
                        .fg(DEFAULT_THEME.function)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(": {}", binding.type_name),
                    Style::default().fg(DEFAULT_THEME.type_name),
                ),
                Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
            ];
            spans.extend(highlight_value_string(&format_value(&binding.value)));

            let mut line = Line::from(spans);
            if is_selected {
                line = line.style(Style::default().bg(DEFAULT_THEME.current_line_bg));
            }
            items.push(ListItem::new(line));
        }
    }
    if items.is_empty() {
        items.push(ListItem::new("(no variables)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }

    let visible = visible_window(items, area, &mut scroll_state.offset);
    frame.render_widget(List::new(visible).block(block), area);
}
