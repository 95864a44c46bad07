//! Graph popup: nodes on a circle, edges as straight lines
//!
//! Positions come from [`circular_layout`] on a fixed 400x300 canvas, so the
//! same graph is always drawn the same way.

use super::utils::centered_rect;
use crate::client::structures::{circular_layout, GraphView};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line as TextLine, Span},
    widgets::{
        canvas::{Canvas, Circle, Line},
        Block, Borders, Clear, Paragraph,
    },
    Frame,
};

const CANVAS_WIDTH: f64 = 400.0;
const CANVAS_HEIGHT: f64 = 300.0;
const NODE_RADIUS: f64 = 12.0;

/// Render the graph popup over `area`; `None` shows a hint instead
pub fn render_graph_popup(frame: &mut Frame, area: Rect, name: &str, graph: Option<&GraphView>) {
    let popup = centered_rect(80, 80, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(format!(" Graph: {} (g/Esc to close) ", name))
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(DEFAULT_THEME.border_focused)
                .add_modifier(Modifier::BOLD),
        );

    let Some(graph) = graph else {
        let hint = Paragraph::new("Select a graph-shaped variable to see its layout.")
            .style(Style::default().fg(DEFAULT_THEME.comment))
            .block(block);
        frame.render_widget(hint, popup);
        return;
    };

    // Canvas y grows upward; the layout's grows downward
    let points: Vec<(f64, f64)> = circular_layout(graph.nodes.len(), CANVAS_WIDTH, CANVAS_HEIGHT)
        .into_iter()
        .map(|(x, y)| (x, CANVAS_HEIGHT - y))
        .collect();

    let canvas = Canvas::default()
        .block(block)
        .x_bounds([0.0, CANVAS_WIDTH])
        .y_bounds([0.0, CANVAS_HEIGHT])
        .paint(|ctx| {
            for edge in &graph.edges {
                let (Some(from), Some(to)) = (graph.index_of(&edge.from), graph.index_of(&edge.to))
                else {
                    continue;
                };
                let color = if edge.back {
                    DEFAULT_THEME.back_edge
                } else {
                    DEFAULT_THEME.comment
                };
                let ((x1, y1), (x2, y2)) = (points[from], points[to]);
                ctx.draw(&Line::new(x1, y1, x2, y2, color));
            }
            ctx.layer();
            for (node, &(x, y)) in graph.nodes.iter().zip(&points) {
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: NODE_RADIUS,
                    color: DEFAULT_THEME.primary,
                });
                ctx.print(
                    x - NODE_RADIUS / 2.0,
                    y,
                    TextLine::from(Span::styled(
                        node.label.clone(),
                        Style::default()
                            .fg(DEFAULT_THEME.function)
                            .add_modifier(Modifier::BOLD),
                    )),
                );
            }
        });
    frame.render_widget(canvas, popup);
}
