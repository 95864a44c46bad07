use std::fs;
use std::path::Path;

use stepscope::client::{classify, Shape};
use stepscope::config::StepBudget;
use stepscope::snapshot::{Step, Trace};
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};

fn run_demo(name: &str, inputs: &[&str]) -> Trace {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read demo file");
    let inputs = inputs.iter().map(|s| s.to_string()).collect();
    let request = TraceRequest::new(source, StepBudget::new(5000), inputs);
    run_code(&InProcessSandbox::default(), &request)
}

fn finished(trace: &Trace) -> &Step {
    assert_eq!(trace.error, None);
    assert!(!trace.needs_input);
    let last = trace.steps.last().expect("Demo produced no steps");
    assert_eq!(last.explanation, Step::FINISHED);
    last
}

#[test]
fn test_linked_list_demo() {
    let trace = run_demo("linked_list.py", &[]);
    let last = finished(&trace);
    assert_eq!(last.stdout, "[3, 2, 1]\n");
    assert_eq!(classify(&last.variables["head"].value), Shape::LinkedNode);
}

#[test]
fn test_bst_demo() {
    let trace = run_demo("bst.py", &[]);
    let last = finished(&trace);
    assert_eq!(last.stdout, "[1, 3, 4, 5, 8, 9]\n");
    assert_eq!(classify(&last.variables["root"].value), Shape::BinaryTree);
}

#[test]
fn test_graph_bfs_demo() {
    let trace = run_demo("graph_bfs.py", &[]);
    let last = finished(&trace);
    assert_eq!(last.stdout, "A -> B -> C -> D -> E\n");
    assert_eq!(classify(&last.variables["graph"].value), Shape::Graph);
    assert_eq!(classify(&last.variables["queue"].value), Shape::Deque);
}

#[test]
fn test_bubble_sort_demo() {
    let trace = run_demo("bubble_sort.py", &[]);
    let last = finished(&trace);
    assert_eq!(last.stdout, "[1, 2, 4, 5, 8]\n");
    // Every swap writes two cells of `data`
    let writes: usize = trace
        .steps
        .iter()
        .flat_map(|s| &s.accesses)
        .filter(|a| a.kind == stepscope::snapshot::AccessKind::Write)
        .count();
    assert!(writes > 0 && writes % 2 == 0, "writes = {}", writes);
}

#[test]
fn test_greeting_demo_waits_then_finishes() {
    let waiting = run_demo("greeting.py", &["Ada"]);
    assert!(waiting.needs_input);
    assert_eq!(waiting.error, None);

    let trace = run_demo("greeting.py", &["Ada", "2"]);
    let last = finished(&trace);
    assert_eq!(last.stdout, "Hello, Ada! (1)\nHello, Ada! (2)\n");
}
