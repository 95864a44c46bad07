//! Main TUI application state and logic

use crate::client::{self, structures::GraphView, Structure, VariableOrder, VariableView};
use crate::snapshot::{Step, Trace};
use crate::transport::{run_code, Sandbox, TraceRequest};
use crate::ui::panes::{
    self, LineMark, OutputRenderData, SourceScrollState, StatusRenderData, StructuresRenderData,
    StructuresScrollState, VariablesRenderData, VariablesScrollState,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn graph_of(view: &VariableView<'_>) -> Option<(String, GraphView)> {
    match &view.structure {
        Structure::Graph(graph) => Some((view.name.to_string(), graph.clone())),
        _ => None,
    }
}

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Output,
    Inspector,
}

impl FocusedPane {
    /// Move focus to the next pane (source -> output -> inspector)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Inspector,
            FocusedPane::Inspector => FocusedPane::Source,
        }
    }
}

/// What the right-hand pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorView {
    Variables,
    Structures,
}

/// A run in flight on a background thread
struct PendingRun {
    receiver: Receiver<Trace>,
    /// Step to open once the trace arrives
    position: usize,
}

/// The main application state
pub struct App {
    /// The script being traced
    pub source: String,

    /// Request that produced `trace`; resuming extends its inputs
    pub request: TraceRequest,

    sandbox: Arc<dyn Sandbox + Send + Sync>,

    pending: Option<PendingRun>,

    pub trace: Trace,

    /// Index of the step on screen
    pub position: usize,

    pub order: VariableOrder,

    /// Variable the inspector cursor is on
    pub selected: Option<String>,

    pub focused_pane: FocusedPane,
    pub view: InspectorView,
    pub show_bars: bool,
    pub show_graph: bool,

    /// Text typed while the run waits for input
    pub input_buffer: String,

    source_scroll: SourceScrollState,
    output_scroll: usize,
    variables_scroll: VariablesScrollState,
    structures_scroll: StructuresScrollState,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    last_space_press: Instant,
}

impl App {
    /// Start running `request` through `sandbox`; the first step opens once
    /// the trace arrives
    pub fn new(
        source: String,
        request: TraceRequest,
        sandbox: Box<dyn Sandbox + Send + Sync>,
    ) -> Self {
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        let mut app = App {
            source,
            request,
            sandbox: Arc::from(sandbox),
            pending: None,
            trace: Trace::default(),
            position: 0,
            order: VariableOrder::new(),
            selected: None,
            focused_pane: FocusedPane::Source,
            view: InspectorView::Structures,
            show_bars: false,
            show_graph: false,
            input_buffer: String::new(),
            source_scroll: SourceScrollState {
                offset: 0,
                target_line_row: None,
            },
            output_scroll: 0,
            variables_scroll: VariablesScrollState { offset: 0 },
            structures_scroll: StructuresScrollState { offset: 0 },
            should_quit: false,
            status_message: String::new(),
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: long_ago,
        };
        app.rerun(0);
        app
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(600) {
                if self.position + 1 < self.trace.steps.len() {
                    self.go_to(self.position + 1);
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }

            self.poll_run();
        }

        Ok(())
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.trace.steps.get(self.position)
    }

    fn at_last_step(&self) -> bool {
        self.position + 1 >= self.trace.steps.len()
    }

    /// Whether keystrokes go to the input line
    pub fn is_taking_input(&self) -> bool {
        self.trace.needs_input && !self.is_running()
    }

    /// Whether a run is still in flight
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Start re-running the current request in the background; step
    /// `position` (clamped) opens when it finishes. A newer run replaces
    /// one still in flight.
    fn rerun(&mut self, position: usize) {
        self.is_playing = false;
        let (sender, receiver) = mpsc::channel();
        let sandbox = Arc::clone(&self.sandbox);
        let request = self.request.clone();
        let spawned = thread::Builder::new()
            .name("stepscope-run".into())
            .spawn(move || {
                let trace = run_code(sandbox.as_ref(), &request);
                // The app may have quit or started a newer run
                let _ = sender.send(trace);
            });
        match spawned {
            Ok(_) => {
                self.pending = Some(PendingRun { receiver, position });
                self.status_message = "Running...".to_string();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to start run");
                self.pending = None;
                self.status_message = format!("Error: could not start run: {}", e);
            }
        }
    }

    /// Apply the in-flight run's trace if it has arrived
    fn poll_run(&mut self) {
        let Some(pending) = &self.pending else {
            return;
        };
        match pending.receiver.try_recv() {
            Ok(trace) => {
                let position = pending.position;
                self.pending = None;
                self.show_trace(trace, position);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.status_message = "Error: run ended without a trace".to_string();
            }
        }
    }

    /// Replace the trace and show step `position` (clamped). A run waiting
    /// for input opens at its last step.
    fn show_trace(&mut self, trace: Trace, position: usize) {
        self.trace = trace;
        self.order.clear();
        let last = self.trace.steps.len().saturating_sub(1);
        let target = if self.trace.needs_input {
            last
        } else {
            position.min(last)
        };
        self.go_to(target);
        self.status_message = if let Some(error) = &self.trace.error {
            error.clone()
        } else if self.trace.needs_input {
            "Waiting for input: type a value and press Enter (Esc quits)".to_string()
        } else {
            format!("Traced {} step(s)", self.trace.steps.len())
        };
    }

    /// Append the typed value to the inputs and replay the run
    fn submit_input(&mut self) {
        let value = std::mem::take(&mut self.input_buffer);
        tracing::info!(inputs = self.request.inputs.len() + 1, "resuming with input");
        self.request = self.request.resumed(value);
        let resume_at = self.trace.steps.len();
        self.rerun(resume_at);
    }

    fn go_to(&mut self, position: usize) {
        self.position = position;
        self.output_scroll = usize::MAX;
        if let Some(step) = self.trace.steps.get(position) {
            self.order.observe(step);
            let names = self.order.visible(step);
            let keep = self
                .selected
                .as_deref()
                .is_some_and(|name| names.contains(&name));
            if !keep {
                self.selected = names.first().map(|n| n.to_string());
            }
        }
    }

    fn move_selection(&mut self, offset: isize) {
        let Some(step) = self.trace.steps.get(self.position) else {
            return;
        };
        let names = self.order.visible(step);
        let current = self
            .selected
            .as_deref()
            .and_then(|s| names.iter().position(|n| *n == s))
            .unwrap_or(0);
        if let Some(name) = current
            .checked_add_signed(offset)
            .and_then(|i| names.get(i))
        {
            self.selected = Some(name.to_string());
        }
    }

    fn shift_selected(&mut self, offset: isize) {
        let (Some(name), Some(step)) = (self.selected.clone(), self.trace.steps.get(self.position))
        else {
            return;
        };
        if self.order.shift(&name, step, offset) {
            self.status_message = format!("Moved {}", name);
        }
    }

    /// Graph of the selected variable, or else the first graph on screen
    fn graph_target(&self) -> Option<(String, GraphView)> {
        let views = client::reconstruct(&self.trace.steps, self.position, &self.order);
        views
            .iter()
            .filter(|v| self.selected.as_deref() == Some(v.name))
            .find_map(graph_of)
            .or_else(|| views.iter().find_map(graph_of))
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        let step = self.trace.steps.get(self.position);
        let at_end = self.position + 1 >= self.trace.steps.len();
        let mark = if at_end && self.trace.error.is_some() {
            LineMark::Error
        } else if at_end && self.trace.needs_input {
            LineMark::Input
        } else {
            LineMark::Current
        };

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source,
            step.map_or(0, |s| s.line),
            mark,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_output_pane(
            frame,
            left_rows[1],
            OutputRenderData {
                stdout: step.map_or("", |s| s.stdout.as_str()),
                input: self
                    .trace
                    .needs_input
                    .then_some(self.input_buffer.as_str()),
                error: self.trace.error.as_deref().filter(|_| at_end),
            },
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        let inspector_focused = self.focused_pane == FocusedPane::Inspector;
        match self.view {
            InspectorView::Variables => {
                let names = step.map(|s| self.order.visible(s)).unwrap_or_default();
                panes::render_variables_pane(
                    frame,
                    columns[1],
                    VariablesRenderData {
                        step,
                        names: &names,
                        selected: self.selected.as_deref(),
                    },
                    inspector_focused,
                    &mut self.variables_scroll,
                );
            }
            InspectorView::Structures => {
                let views = client::reconstruct(&self.trace.steps, self.position, &self.order);
                panes::render_structures_pane(
                    frame,
                    columns[1],
                    StructuresRenderData {
                        views: &views,
                        selected: self.selected.as_deref(),
                        show_bars: self.show_bars,
                    },
                    inspector_focused,
                    &mut self.structures_scroll,
                );
            }
        }

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                current_step: self.position,
                total_steps: self.trace.steps.len(),
                has_error: self.trace.error.is_some(),
                needs_input: self.trace.needs_input,
                is_playing: self.is_playing,
            },
        );

        if self.show_graph {
            let target = self.graph_target();
            let name = target.as_ref().map_or("-", |(name, _)| name.as_str());
            panes::render_graph_popup(frame, size, name, target.as_ref().map(|(_, g)| g));
        }
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.show_graph && matches!(key.code, KeyCode::Esc | KeyCode::Char('g')) {
            self.show_graph = false;
            return;
        }
        if self.is_running() {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
                self.should_quit = true;
            }
            return;
        }
        if self.is_taking_input() && self.handle_input_key(key) {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            // Number keys step forward N times
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let last = self.trace.steps.len().saturating_sub(1);
                let target = (self.position + n).min(last);
                let stepped = target - self.position.min(target);
                self.go_to(target);
                self.status_message = format!("Stepped forward {} step(s)", stepped);
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_sub(1);
                }
                FocusedPane::Inspector => self.move_selection(-1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_add(1);
                }
                FocusedPane::Inspector => self.move_selection(1),
            },
            KeyCode::PageUp => {
                self.structures_scroll.offset = self.structures_scroll.offset.saturating_sub(5);
                self.variables_scroll.offset = self.variables_scroll.offset.saturating_sub(5);
            }
            KeyCode::PageDown => {
                self.structures_scroll.offset = self.structures_scroll.offset.saturating_add(5);
                self.variables_scroll.offset = self.variables_scroll.offset.saturating_add(5);
            }
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    self.status_message = if self.is_playing {
                        "Playing...".to_string()
                    } else {
                        "Paused".to_string()
                    };
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.go_to(self.trace.steps.len().saturating_sub(1));
                self.status_message = "Jumped to end".to_string();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.go_to(0);
                self.status_message = "Jumped to start".to_string();
            }
            KeyCode::Char('v') => {
                self.view = match self.view {
                    InspectorView::Variables => InspectorView::Structures,
                    InspectorView::Structures => InspectorView::Variables,
                };
            }
            KeyCode::Char('g') => {
                self.show_graph = true;
            }
            KeyCode::Char('b') => {
                self.show_bars = !self.show_bars;
                self.status_message = if self.show_bars {
                    "Bar chart on".to_string()
                } else {
                    "Bar chart off".to_string()
                };
            }
            KeyCode::Char('[') => self.shift_selected(-1),
            KeyCode::Char(']') => self.shift_selected(1),
            KeyCode::Char('r') => {
                self.request.inputs.clear();
                self.input_buffer.clear();
                self.rerun(0);
            }
            _ => {}
        }
    }

    /// Keys consumed by the input line; returns false for keys it leaves to
    /// the normal bindings
    fn handle_input_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                true
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
                true
            }
            KeyCode::Enter => {
                self.submit_input();
                true
            }
            _ => false,
        }
    }

    fn step_forward(&mut self) {
        if self.at_last_step() {
            self.status_message = "Cannot step forward: at the last step".to_string();
        } else {
            self.go_to(self.position + 1);
            self.status_message = "Stepped forward".to_string();
        }
    }

    fn step_backward(&mut self) {
        if self.position == 0 {
            self.status_message = "Cannot step backward: at the first step".to_string();
        } else {
            self.go_to(self.position - 1);
            self.status_message = "Stepped backward".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepBudget;
    use crate::transport::InProcessSandbox;

    /// Poll until the in-flight run lands, as the event loop would
    fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while app.is_running() {
            assert!(Instant::now() < deadline, "run never finished");
            app.poll_run();
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn app(source: &str) -> App {
        let request = TraceRequest::new(source, StepBudget::default(), Vec::new());
        let mut app = App::new(source.to_string(), request, Box::new(InProcessSandbox::default()));
        settle(&mut app);
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::from(code));
    }

    #[test]
    fn test_run_lands_through_polling() {
        let source = "a = 1\nb = 2\n";
        let request = TraceRequest::new(source, StepBudget::default(), Vec::new());
        let mut app = App::new(source.to_string(), request, Box::new(InProcessSandbox::default()));
        assert!(app.is_running());
        assert!(app.trace.steps.is_empty());
        assert_eq!(app.status_message, "Running...");

        // Keys other than quit wait for the run
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.position, 0);

        settle(&mut app);
        assert_eq!(app.trace.steps.len(), 3);
        assert_eq!(app.status_message, "Traced 3 step(s)");
    }

    #[test]
    fn test_quit_works_while_running() {
        let request = TraceRequest::new("x = 1\n", StepBudget::default(), Vec::new());
        let mut app = App::new("x = 1\n".to_string(), request, Box::new(InProcessSandbox::default()));
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_navigation() {
        let mut app = app("a = 1\nb = 2\nc = 3\n");
        assert_eq!(app.position, 0);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.current_step().map(|s| s.line), Some(3));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.current_step().map(|s| s.explanation.as_str()), Some(Step::FINISHED));
        press(&mut app, KeyCode::Right);
        assert!(app.status_message.starts_with("Cannot step forward"));
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.position, 0);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.position, 0);
    }

    #[test]
    fn test_input_resubmits_with_value() {
        let mut app = app("print('x?')\nx = input()\nprint(x * 2)\n");
        assert!(app.is_taking_input());
        for c in "ab".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(!app.is_taking_input());
        settle(&mut app);

        assert!(!app.trace.needs_input);
        assert_eq!(app.request.inputs, vec!["ab"]);
        let last = app.trace.steps.last().unwrap();
        assert_eq!(last.stdout, "x?\nabab\n");
        assert!(app.input_buffer.is_empty());
    }

    #[test]
    fn test_reorder_keys_and_view_toggle() {
        let mut app = app("a = 1\nb = 2\nc = 3\n");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.selected.as_deref(), Some("a"));
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.order.names(), ["b", "a", "c"]);

        assert_eq!(app.view, InspectorView::Structures);
        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.view, InspectorView::Variables);
    }

    #[test]
    fn test_error_is_reported() {
        let app = app("x = 1\ny = x / 0\n");
        assert_eq!(
            app.trace.error.as_deref(),
            Some("Error: ZeroDivisionError: division by zero")
        );
        assert_eq!(app.status_message, "Error: ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_graph_target_prefers_selection() {
        let mut app = app("g = {'A': ['B'], 'B': ['A']}\nh = {'X': []}\nz = 0\n");
        press(&mut app, KeyCode::Enter);
        app.selected = Some("h".to_string());
        let (name, graph) = app.graph_target().unwrap();
        assert_eq!(name, "h");
        assert_eq!(graph.nodes.len(), 1);
    }
}
