//! Step tracer
//!
//! [`StepTracer`] is the [`LineHook`] used for real runs. At each statement
//! boundary it records a [`Step`] until the step budget is reached; the
//! boundary after that halts the script quietly, so a trace never holds more
//! than `step_budget` steps and a runaway loop simply ends early.
//!
//! [`trace_program`] drives one complete run: parse, rewrite list displays,
//! execute under the tracer, and turn the outcome into a [`RawTrace`]:
//!
//! | outcome              | steps                         | `needs_input` |
//! |----------------------|-------------------------------|---------------|
//! | completed            | boundaries + finished step    | false         |
//! | budget spent         | exactly `step_budget`         | false         |
//! | `input()` starved    | boundaries so far             | true          |
//! | error (incl. syntax) | boundaries + one error step   | false         |
//!
//! The finished step is only added while the budget has room for it.

use indexmap::IndexMap;

use super::serializer::Serializer;
use super::{RawTrace, Step, VariableBinding};
use crate::config::{TracerConfig, VariableFilter};
use crate::interpreter::{FrameView, HookControl, InputQueue, Interpreter, LineHook, RuntimeError};
use crate::memory::heap::HeapData;
use crate::memory::value::Value;
use crate::parser::parse_program;
use crate::parser::rewrite::track_list_literals;

/// Records one [`Step`] per statement boundary
#[derive(Debug)]
pub struct StepTracer {
    budget: usize,
    max_depth: usize,
    filter: VariableFilter,
    steps: Vec<Step>,
}

impl StepTracer {
    pub fn new(config: &TracerConfig) -> Self {
        StepTracer {
            budget: config.step_budget.get(),
            max_depth: config.max_depth,
            filter: config.filter.clone(),
            steps: Vec::new(),
        }
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    fn has_room(&self) -> bool {
        self.steps.len() < self.budget
    }

    fn capture(&self, view: &FrameView<'_>, explanation: String) -> Step {
        let serializer = Serializer::new(view.heap, self.max_depth);
        let mut variables = IndexMap::new();
        for (name, value) in view.scope.vars().iter() {
            if self.filter.hides(name) || view.heap.is_callable_or_type(value) {
                continue;
            }
            let id = match value {
                Value::Ref(id) if matches!(view.heap.get(*id), Some(HeapData::List(_))) => {
                    Some(id.to_string())
                }
                _ => None,
            };
            variables.insert(
                name.clone(),
                VariableBinding {
                    type_name: view.heap.type_name(value),
                    value: serializer.serialize(value),
                    id,
                },
            );
        }

        Step {
            line: view.line,
            stdout: view.stdout.to_string(),
            variables,
            accesses: view.accesses.drain(),
            explanation,
        }
    }
}

impl LineHook for StepTracer {
    fn on_line(&mut self, view: &FrameView<'_>) -> HookControl {
        if !self.has_room() {
            return HookControl::Halt;
        }
        let step = self.capture(view, format!("Line {}", view.line));
        tracing::debug!(
            step = self.steps.len(),
            line = step.line,
            variables = step.variables.len(),
            accesses = step.accesses.len(),
            "captured step"
        );
        self.steps.push(step);
        HookControl::Continue
    }

    fn on_finish(&mut self, view: &FrameView<'_>) {
        if self.has_room() {
            let step = self.capture(view, Step::FINISHED.to_string());
            self.steps.push(step);
        }
    }
}

/// The synthetic step that carries an uncaught error
pub fn error_step(error: &RuntimeError, stdout: &str) -> Step {
    Step {
        line: 0,
        stdout: stdout.to_string(),
        variables: IndexMap::new(),
        accesses: Vec::new(),
        explanation: format!("Error: {}", error),
    }
}

/// Run `source` under the tracer, feeding `inputs` to `input()` in order
pub fn trace_program(source: &str, inputs: &[String], config: &TracerConfig) -> RawTrace {
    let program = match parse_program(source) {
        Ok(program) => track_list_literals(program),
        Err(err) => {
            let error = RuntimeError::from(err);
            tracing::info!(%error, "script failed to parse");
            return RawTrace {
                steps: vec![error_step(&error, "")],
                needs_input: false,
            };
        }
    };

    let queue = InputQueue::new(inputs.iter().cloned());
    let mut interpreter = Interpreter::new(StepTracer::new(config), queue, config.limits());
    let outcome = interpreter.run(&program);

    let mut needs_input = false;
    let mut failure = None;
    match outcome {
        Ok(()) => interpreter.finish(),
        Err(RuntimeError::NeedsInput { .. }) => needs_input = true,
        Err(RuntimeError::Halted) => {
            tracing::info!(budget = config.step_budget.get(), "step budget reached");
        }
        Err(error) => failure = Some(error_step(&error, interpreter.stdout())),
    }

    let mut steps = interpreter.into_hook().into_steps();
    if let Some(step) = failure {
        tracing::info!(explanation = %step.explanation, "script raised");
        steps.push(step);
    }
    tracing::info!(steps = steps.len(), needs_input, "trace complete");
    RawTrace { steps, needs_input }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepBudget;
    use crate::snapshot::{AccessKind, SerializedValue};

    fn trace(source: &str) -> RawTrace {
        trace_program(source, &[], &TracerConfig::default())
    }

    #[test]
    fn test_steps_and_finish() {
        let raw = trace("x = 1\ny = x + 1\n");
        let explanations: Vec<_> = raw.steps.iter().map(|s| s.explanation.as_str()).collect();
        assert_eq!(explanations, vec!["Line 1", "Line 2", "Execution Finished"]);

        // Each boundary sees the state before its line runs
        assert!(raw.steps[0].variables.is_empty());
        assert_eq!(raw.steps[1].variables["x"].value, SerializedValue::Int(1));
        let last = raw.steps.last().unwrap();
        assert_eq!(last.line, 2);
        assert_eq!(last.variables["y"].value, SerializedValue::Int(2));
        assert!(!raw.needs_input);
    }

    #[test]
    fn test_callables_and_hidden_names_are_skipped() {
        let raw = trace("import math\ndef f():\n    pass\nclass C:\n    pass\n__secret = 1\nc = C()\n");
        let last = raw.steps.last().unwrap();
        let names: Vec<_> = last.variables.keys().cloned().collect();
        assert_eq!(names, vec!["c"]);
        assert_eq!(last.variables["c"].type_name, "C");
    }

    #[test]
    fn test_lists_carry_ids_and_accesses() {
        let raw = trace("a = [1, 2, 3]\nb = a[-1]\nc = 0\n");
        let binding = &raw.steps[1].variables["a"];
        assert_eq!(binding.type_name, "list");
        let id = binding.id.clone().unwrap();

        // Accesses made by line 2 appear on the next step only
        assert!(raw.steps[1].accesses.is_empty());
        let accesses = &raw.steps[2].accesses;
        assert_eq!(accesses.len(), 1);
        assert_eq!(accesses[0].kind, AccessKind::Read);
        assert_eq!(accesses[0].container_id, id);
        assert_eq!(accesses[0].index, 2);
        assert!(raw.steps[3].accesses.is_empty());
    }

    #[test]
    fn test_budget_truncates_exactly() {
        let config = TracerConfig {
            step_budget: StepBudget::new(10),
            ..TracerConfig::default()
        };
        let raw = trace_program("i = 0\nwhile True:\n    i += 1\n", &[], &config);
        assert_eq!(raw.steps.len(), 10);
        assert!(raw.steps.iter().all(|s| !s.is_error()));
    }

    #[test]
    fn test_error_step() {
        let raw = trace("print('hi')\nx = 1 / 0\n");
        let last = raw.steps.last().unwrap();
        assert_eq!(last.line, 0);
        assert_eq!(last.explanation, "Error: ZeroDivisionError: division by zero");
        assert_eq!(last.stdout, "hi\n");
        assert!(last.variables.is_empty());
    }

    #[test]
    fn test_syntax_error_step() {
        let raw = trace("x = (1 +\n");
        assert_eq!(raw.steps.len(), 1);
        assert!(raw.steps[0].explanation.starts_with("Error: SyntaxError"));
    }

    #[test]
    fn test_needs_input_has_no_finished_step() {
        let raw = trace("print('name?')\nname = input()\nprint(name)\n");
        assert!(raw.needs_input);
        assert_eq!(raw.steps.len(), 2);
        assert!(raw.steps.iter().all(|s| s.explanation != Step::FINISHED));
    }

    #[test]
    fn test_function_frame_shows_locals() {
        let raw = trace("g = 5\ndef f(a):\n    b = a * 2\n    return b\nf(3)\n");
        let inside = raw.steps.iter().find(|s| s.line == 4).unwrap();
        let names: Vec<_> = inside.variables.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
