// Rings of any length serialize with exactly one back-reference

use proptest::prelude::*;
use stepscope::config::StepBudget;
use stepscope::snapshot::SerializedValue;
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};

fn ring_source(n: usize) -> String {
    format!(
        "\
class Node:
    def __init__(self, val):
        self.val = val
        self.next = None
head = Node(0)
cur = head
for i in range(1, {n}):
    cur.next = Node(i)
    cur = cur.next
cur.next = head
done = 1
"
    )
}

fn count_cyclic(value: &SerializedValue) -> usize {
    match value {
        SerializedValue::Cyclic { .. } => 1,
        other => {
            let items: usize = other
                .collection_items()
                .map(|items| items.iter().map(count_cyclic).sum())
                .unwrap_or(0);
            let fields: usize = other
                .fields()
                .map(|map| map.values().map(count_cyclic).sum())
                .unwrap_or(0);
            items + fields
        }
    }
}

fn ring_length(value: &SerializedValue) -> usize {
    let mut length = 0;
    let mut current = value;
    while let SerializedValue::Object { data, .. } = current {
        length += 1;
        match data.get("next") {
            Some(next) => current = next,
            None => break,
        }
    }
    length
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ring_has_one_back_reference(n in 1usize..=9) {
        let request = TraceRequest::new(ring_source(n), StepBudget::new(1000), Vec::new());
        let result = run_code(&InProcessSandbox::default(), &request);
        prop_assert_eq!(result.error, None);

        let last = result.steps.last().expect("steps");
        let head = &last.variables["head"].value;
        prop_assert_eq!(count_cyclic(head), 1);
        prop_assert_eq!(ring_length(head), n);
    }
}
