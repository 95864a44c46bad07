//! Structures pane: classified variables drawn as arrays, lists, trees,
//! graphs and maps
//!
//! Array cells carry three marks: changed since the previous step (yellow
//! background), read this step (blue) and written this step (red, wins over
//! read). Graphs are summarized here as edge lists; the full circular layout
//! lives in the graph popup.

use super::utils::{border_style, visible_window};
use crate::client::format::CYCLE_GLYPH;
use crate::client::structures::{GraphView, LinkedListView, ListEnd, TreeNode};
use crate::client::{ArrayCell, ArrayView, Structure, VariableView};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the structures pane
pub struct StructuresScrollState {
    pub offset: usize,
}

/// Data needed to render the structures pane
pub struct StructuresRenderData<'a> {
    pub views: &'a [VariableView<'a>],
    pub selected: Option<&'a str>,
    /// Draw numeric arrays as bars
    pub show_bars: bool,
}

const BAR_WIDTH: f64 = 24.0;

fn cell_style(cell: &ArrayCell) -> Style {
    let mut style = Style::default().fg(DEFAULT_THEME.fg);
    if cell.read {
        style = style.fg(DEFAULT_THEME.read).add_modifier(Modifier::BOLD);
    }
    if cell.write {
        style = style.fg(DEFAULT_THEME.write).add_modifier(Modifier::BOLD);
    }
    if cell.changed {
        style = style.bg(DEFAULT_THEME.changed).fg(Color::Black);
    }
    style
}

fn access_glyph(cell: &ArrayCell) -> &'static str {
    match (cell.read, cell.write) {
        (_, true) => "w",
        (true, false) => "r",
        _ => " ",
    }
}

fn array_lines(array: &ArrayView, show_bars: bool) -> Vec<Line<'static>> {
    let comment = Style::default().fg(DEFAULT_THEME.comment);
    let (open, close) = array.kind.caps();

    if let (true, Some(bars)) = (show_bars, array.bars.as_ref()) {
        return array
            .cells
            .iter()
            .zip(bars)
            .enumerate()
            .map(|(i, (cell, height))| {
                let width = ((height / 100.0) * BAR_WIDTH).round().max(1.0) as usize;
                Line::from(vec![
                    Span::styled(format!("  {:>3} ", i), comment),
                    Span::styled("█".repeat(width), cell_style(cell).bg(Color::Reset)),
                    Span::styled(format!(" {}", cell.text), cell_style(cell)),
                ])
            })
            .collect();
    }

    if array.cells.is_empty() {
        return vec![Line::from(Span::styled(format!("  {}{}", open, close), comment))];
    }

    let mut values = vec![Span::styled(format!("  {} ", open), comment)];
    let mut indices = vec![Span::raw(" ".repeat(open.chars().count() + 3))];
    let mut glyphs = indices.clone();
    for (i, cell) in array.cells.iter().enumerate() {
        let width = cell.text.chars().count().max(i.to_string().len());
        values.push(Span::styled(format!("{:^width$}", cell.text), cell_style(cell)));
        values.push(Span::styled(" │ ", comment));
        indices.push(Span::styled(format!("{:^width$}   ", i), comment));
        glyphs.push(Span::styled(
            format!("{:^width$}   ", access_glyph(cell)),
            cell_style(cell).bg(Color::Reset),
        ));
    }
    values.pop();
    values.push(Span::styled(format!(" {}", close), comment));

    let mut lines = vec![Line::from(values), Line::from(indices)];
    if array.cells.iter().any(|c| c.read || c.write) {
        lines.push(Line::from(glyphs));
    }
    lines
}

fn linked_list_lines(list: &LinkedListView) -> Vec<Line<'static>> {
    let arrow = Span::styled(" → ", Style::default().fg(DEFAULT_THEME.comment));
    let mut spans = vec![Span::raw("  ")];
    for node in &list.nodes {
        spans.push(Span::styled(
            format!("[{}]", node.label),
            Style::default().fg(DEFAULT_THEME.primary),
        ));
        spans.push(arrow.clone());
    }
    spans.push(match &list.end {
        ListEnd::Null => Span::styled("None", Style::default().fg(DEFAULT_THEME.number)),
        ListEnd::Cycle { .. } => {
            Span::styled(CYCLE_GLYPH, Style::default().fg(DEFAULT_THEME.back_edge))
        }
        ListEnd::Value(text) => Span::styled(text.clone(), Style::default().fg(DEFAULT_THEME.fg)),
    });
    vec![Line::from(spans)]
}

/// Outline rows for a tree, one node per row
pub(super) fn tree_lines(root: &TreeNode) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    push_tree(root, "  ", "", &mut out);
    out
}

fn push_tree(node: &TreeNode, prefix: &str, branch: &str, out: &mut Vec<Line<'static>>) {
    let comment = Style::default().fg(DEFAULT_THEME.comment);
    let label = match node {
        TreeNode::Node { label, .. } => {
            Span::styled(format!("({})", label), Style::default().fg(DEFAULT_THEME.primary))
        }
        TreeNode::Empty => Span::styled("∅", comment),
        TreeNode::Cycle { .. } => Span::styled(CYCLE_GLYPH, Style::default().fg(DEFAULT_THEME.back_edge)),
        TreeNode::Leaf(text) => Span::styled(text.clone(), Style::default().fg(DEFAULT_THEME.fg)),
    };
    out.push(Line::from(vec![
        Span::styled(format!("{}{}", prefix, branch), comment),
        label,
    ]));

    if let TreeNode::Node { children, .. } = node {
        let child_prefix = match branch {
            "├─ " => format!("{}│  ", prefix),
            "└─ " => format!("{}   ", prefix),
            _ => prefix.to_string(),
        };
        for (i, child) in children.iter().enumerate() {
            let branch = if i + 1 == children.len() { "└─ " } else { "├─ " };
            push_tree(child, &child_prefix, branch, out);
        }
    }
}

fn graph_lines(graph: &GraphView) -> Vec<Line<'static>> {
    let comment = Style::default().fg(DEFAULT_THEME.comment);
    let label_of = |id: &str| {
        graph
            .index_of(id)
            .map(|i| graph.nodes[i].label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "  {} nodes, {} edges (g: layout)",
            graph.nodes.len(),
            graph.edges.len()
        ),
        comment,
    ))];
    for edge in &graph.edges {
        let (glyph, color) = if edge.back {
            (" ↺ ", DEFAULT_THEME.back_edge)
        } else {
            (" → ", DEFAULT_THEME.comment)
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(label_of(&edge.from), Style::default().fg(DEFAULT_THEME.primary)),
            Span::styled(glyph, Style::default().fg(color)),
            Span::styled(label_of(&edge.to), Style::default().fg(DEFAULT_THEME.primary)),
        ]));
    }
    lines
}

fn map_lines(rows: &[(String, String)]) -> Vec<Line<'static>> {
    if rows.is_empty() {
        return vec![Line::from(Span::styled("  {}", Style::default().fg(DEFAULT_THEME.comment)))];
    }
    rows.iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(format!("  {}", key), Style::default().fg(DEFAULT_THEME.secondary)),
                Span::styled(" │ ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(value.clone(), Style::default().fg(DEFAULT_THEME.fg)),
            ])
        })
        .collect()
}

/// Render the structures pane
pub fn render_structures_pane(
    frame: &mut Frame,
    area: Rect,
    data: StructuresRenderData,
    is_focused: bool,
    scroll_state: &mut StructuresScrollState,
) {
    let block = Block::default()
        .title(" Structures ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let mut items = Vec::new();
    for view in data.views {
        let is_selected = data.selected == Some(view.name);
        let header = Line::from(vec![
            Span::styled(
                if is_selected { "▸ " } else { "  " },
                Style::default().fg(DEFAULT_THEME.secondary),
            ),
            Span::styled(
                view.name.to_string(),
                Style::default()
                    .fg(DEFAULT_THEME.function)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", view.shape.label()),
                Style::default().fg(DEFAULT_THEME.type_name),
            ),
        ]);
        items.push(ListItem::new(header));

        let body = match &view.structure {
            Structure::Array(array) => array_lines(array, data.show_bars),
            Structure::LinkedList(list) => linked_list_lines(list),
            Structure::Tree(tree) => tree_lines(tree),
            Structure::Graph(graph) => graph_lines(graph),
            Structure::Map(rows) => map_lines(rows),
        };
        items.extend(body.into_iter().map(ListItem::new));
        items.push(ListItem::new(""));
    }
    if items.is_empty() {
        items.push(
            ListItem::new("(no data structures)").style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }

    let visible = visible_window(items, area, &mut scroll_state.offset);
    frame.render_widget(List::new(visible).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ArrayKind;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_tree_outline() {
        let tree = TreeNode::Node {
            id: "1".into(),
            label: "5".into(),
            children: vec![
                TreeNode::Node {
                    id: "2".into(),
                    label: "3".into(),
                    children: Vec::new(),
                },
                TreeNode::Empty,
            ],
        };
        let rows: Vec<String> = tree_lines(&tree).iter().map(text).collect();
        assert_eq!(rows, vec!["  (5)", "  ├─ (3)", "  └─ ∅"]);
    }

    #[test]
    fn test_array_row() {
        let cell = |text: &str, changed| ArrayCell {
            text: text.into(),
            changed,
            read: false,
            write: false,
        };
        let array = ArrayView {
            kind: ArrayKind::List,
            cells: vec![cell("1", false), cell("5", true)],
            bars: Some(vec![20.0, 100.0]),
        };
        let lines = array_lines(&array, false);
        assert_eq!(lines.len(), 2);
        assert_eq!(text(&lines[0]), "  [ 1 │ 5 ]");
        let changed = lines[0].spans.iter().find(|s| s.content == "5").unwrap();
        assert_eq!(changed.style.bg, Some(DEFAULT_THEME.changed));

        let bars = array_lines(&array, true);
        assert_eq!(bars.len(), 2);
        assert!(text(&bars[1]).contains(&"█".repeat(24)));
    }
}
