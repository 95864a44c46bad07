// End-to-end tests: script source in, client-facing trace out

use serde_json::json;
use stepscope::config::{StepBudget, TracerConfig};
use stepscope::snapshot::{AccessKind, SerializedValue, Step, Trace};
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};

fn trace_with_budget(source: &str, budget: i64) -> Trace {
    let request = TraceRequest::new(source, StepBudget::new(budget), Vec::new());
    run_code(&InProcessSandbox::default(), &request)
}

fn trace(source: &str) -> Trace {
    trace_with_budget(source, 1000)
}

fn count_cyclic(value: &SerializedValue) -> usize {
    match value {
        SerializedValue::Cyclic { .. } => 1,
        other => {
            let nested: usize = other
                .collection_items()
                .map(|items| items.iter().map(count_cyclic).sum())
                .unwrap_or(0);
            let fields: usize = other
                .fields()
                .map(|map| map.values().map(count_cyclic).sum())
                .unwrap_or(0);
            nested + fields
        }
    }
}

#[test]
fn test_completed_run_ends_with_finished_step() {
    let result = trace("total = 0\nfor i in range(3):\n    total += i\nprint(total)\n");
    assert_eq!(result.error, None);
    assert!(!result.needs_input);
    let last = result.steps.last().expect("steps");
    assert_eq!(last.explanation, Step::FINISHED);
    assert_eq!(last.stdout, "3\n");
    assert_eq!(last.variables["total"].value, SerializedValue::Int(3));
}

#[test]
fn test_runaway_loop_is_truncated_to_budget() {
    for budget in [10, 25, 100] {
        let result = trace_with_budget("n = 0\nwhile True:\n    n += 1\n", budget);
        assert_eq!(result.steps.len(), budget as usize);
        assert_eq!(result.error, None);
        assert!(!result.needs_input);
    }
}

#[test]
fn test_budget_below_minimum_is_clamped() {
    let result = trace_with_budget("while True:\n    pass\n", 2);
    assert_eq!(result.steps.len(), StepBudget::MIN);
}

#[test]
fn test_guest_error_becomes_trace_error() {
    let result = trace("items = [1, 2]\nprint('before')\nx = items[7]\n");
    assert_eq!(
        result.error.as_deref(),
        Some("Error: IndexError: list index out of range")
    );
    assert!(result.steps.iter().all(|s| !s.is_error()));
    assert_eq!(result.steps.last().map(|s| s.line), Some(3));
}

#[test]
fn test_syntax_error_is_a_guest_error() {
    let result = trace("def broken(:\n    pass\n");
    assert!(result.steps.is_empty());
    let error = result.error.expect("error");
    assert!(error.starts_with("Error: SyntaxError"), "{}", error);
}

#[test]
fn test_oversized_expressions_are_syntax_errors() {
    let sources = [
        format!("x = 1{}\n", " + 1".repeat(100_000)),
        format!("x = {}1{}\n", "(".repeat(10_000), ")".repeat(10_000)),
        format!("x = {}True\n", "not ".repeat(10_000)),
        format!("x = {}1\n", "-".repeat(10_000)),
        format!("x = [{}]\n", "[".repeat(5_000) + &"]".repeat(5_000)),
    ];
    for source in &sources {
        let result = trace(source);
        assert!(result.steps.is_empty());
        let error = result.error.expect("error");
        assert!(
            error.starts_with("Error: SyntaxError: too many nested expressions"),
            "{}",
            error
        );
    }
}

#[test]
fn test_negative_index_access_is_normalized() {
    let result = trace("a = [10, 20, 30, 40, 50]\nx = a[-1]\ndone = True\n");
    let step = result
        .steps
        .iter()
        .find(|s| !s.accesses.is_empty())
        .expect("a step with accesses");
    assert_eq!(step.accesses.len(), 1);
    assert_eq!(step.accesses[0].kind, AccessKind::Read);
    assert_eq!(step.accesses[0].index, 4);
    assert_eq!(
        Some(&step.accesses[0].container_id),
        step.variables["a"].id.as_ref()
    );
}

#[test]
fn test_self_reference_yields_one_marker() {
    let source = "\
class Node:
    def __init__(self):
        self.next = None
n = Node()
n.next = n
done = 1
";
    let result = trace(source);
    let last = result.steps.last().expect("steps");
    assert_eq!(count_cyclic(&last.variables["n"].value), 1);
}

#[test]
fn test_shared_object_is_expanded_on_both_paths() {
    let source = "\
class Leaf:
    def __init__(self, v):
        self.v = v
shared = Leaf(1)
pair = (shared, shared)
done = 1
";
    let result = trace(source);
    let last = result.steps.last().expect("steps");
    match &last.variables["pair"].value {
        SerializedValue::Tuple(items) => {
            assert_eq!(items.len(), 2);
            assert!(items.iter().all(|i| matches!(i, SerializedValue::Object { .. })));
            assert_eq!(items[0], items[1]);
        }
        other => panic!("Expected tuple, got {:?}", other),
    }
}

#[test]
fn test_trace_wire_shape() {
    let result = trace("xs = [1, 2]\n");
    let document = serde_json::to_value(&result).expect("serialize");
    let last = &document["steps"][1];
    assert_eq!(last["explanation"], json!("Execution Finished"));
    assert_eq!(last["variables"]["xs"]["type"], json!("list"));
    assert_eq!(last["variables"]["xs"]["value"]["__type__"], json!("list"));
    assert_eq!(last["variables"]["xs"]["value"]["items"], json!([1, 2]));
    assert!(document.get("error").is_none());
    assert!(document.get("needsInput").is_none());
}

#[test]
fn test_config_filter_applies_to_runs() {
    let config = TracerConfig::from_toml_str("[filter]\nhidden_prefixes = [\"tmp_\"]\n").expect("config");
    let request = TraceRequest::new("tmp_x = 1\nkeep = 2\n", config.step_budget, Vec::new());
    let result = run_code(&InProcessSandbox::new(config), &request);
    let last = result.steps.last().expect("steps");
    assert!(!last.variables.contains_key("tmp_x"));
    assert!(last.variables.contains_key("keep"));
}
