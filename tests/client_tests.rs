// Structure reconstruction over real traces

use stepscope::client::structures::ListEnd;
use stepscope::client::{reconstruct, Shape, Structure, VariableOrder};
use stepscope::config::StepBudget;
use stepscope::snapshot::{Step, Trace};
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};

fn trace(source: &str) -> Trace {
    let request = TraceRequest::new(source, StepBudget::default(), Vec::new());
    let result = run_code(&InProcessSandbox::default(), &request);
    assert_eq!(result.error, None, "script failed");
    result
}

fn order_through(steps: &[Step], index: usize) -> VariableOrder {
    let mut order = VariableOrder::new();
    for step in &steps[..=index] {
        order.observe(step);
    }
    order
}

#[test]
fn test_linked_list_from_trace() {
    let source = "\
class Node:
    def __init__(self, val):
        self.val = val
        self.next = None
head = Node(1)
head.next = Node(2)
head.next.next = Node(3)
";
    let result = trace(source);
    let last = result.steps.len() - 1;
    let order = order_through(&result.steps, last);
    let views = reconstruct(&result.steps, last, &order);

    let head = views.iter().find(|v| v.name == "head").expect("head view");
    assert_eq!(head.shape, Shape::LinkedNode);
    match &head.structure {
        Structure::LinkedList(list) => {
            let labels: Vec<&str> = list.nodes.iter().map(|n| n.label.as_str()).collect();
            assert_eq!(labels, vec!["1", "2", "3"]);
            assert_eq!(list.end, ListEnd::Null);
        }
        other => panic!("Expected linked list, got {:?}", other),
    }
}

#[test]
fn test_adjacency_mapping_becomes_graph() {
    let result = trace("g = {'A': ['B', 'C'], 'B': ['C'], 'C': ['A']}\n");
    let last = result.steps.len() - 1;
    let order = order_through(&result.steps, last);
    let views = reconstruct(&result.steps, last, &order);

    let g = views.iter().find(|v| v.name == "g").expect("graph view");
    assert_eq!(g.shape, Shape::Graph);
    match &g.structure {
        Structure::Graph(view) => {
            assert_eq!(view.nodes.len(), 3);
            assert_eq!(view.edges.len(), 4);
        }
        other => panic!("Expected graph, got {:?}", other),
    }
}

#[test]
fn test_changed_cell_is_marked() {
    let result = trace("arr = [1, 2, 3]\narr[1] = 5\ndone = 1\n");
    let index = result
        .steps
        .iter()
        .position(|s| s.line == 3)
        .expect("step before line 3");
    let order = order_through(&result.steps, index);
    let views = reconstruct(&result.steps, index, &order);

    let arr = views.iter().find(|v| v.name == "arr").expect("array view");
    match &arr.structure {
        Structure::Array(view) => {
            let changed: Vec<bool> = view.cells.iter().map(|c| c.changed).collect();
            assert_eq!(changed, vec![false, true, false]);
            assert!(view.cells[1].write);
            assert!(!view.cells[0].write);
            assert_eq!(view.cells[1].text, "5");
            assert!(view.bars.is_some());
        }
        other => panic!("Expected array, got {:?}", other),
    }
}

#[test]
fn test_scalars_have_no_structure() {
    let result = trace("n = 3\nname = 'x'\n");
    let last = result.steps.len() - 1;
    let order = order_through(&result.steps, last);
    assert!(reconstruct(&result.steps, last, &order).is_empty());
    assert_eq!(order.visible(&result.steps[last]), vec!["n", "name"]);
}
