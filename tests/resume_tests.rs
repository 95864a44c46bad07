// Input suspension and resume-by-replay

use stepscope::config::StepBudget;
use stepscope::snapshot::Step;
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};

const ADDER: &str = "\
total = 0
print('first?')
a = int(input())
total += a
print('second?')
b = int(input())
total += b
print(total)
";

#[test]
fn test_suspends_without_inputs() {
    let request = TraceRequest::new(ADDER, StepBudget::default(), Vec::new());
    let result = run_code(&InProcessSandbox::default(), &request);
    assert!(result.needs_input);
    assert_eq!(result.error, None);
    assert_eq!(result.steps.last().map(|s| s.line), Some(3));
    assert_eq!(result.steps.last().map(|s| s.stdout.as_str()), Some("first?\n"));
}

#[test]
fn test_replay_reproduces_prior_steps() {
    let sandbox = InProcessSandbox::default();
    let first = TraceRequest::new(ADDER, StepBudget::default(), Vec::new());
    let suspended = run_code(&sandbox, &first);

    let second = first.resumed("5");
    let resumed = run_code(&sandbox, &second);
    assert!(resumed.needs_input);
    assert!(resumed.steps.len() > suspended.steps.len());
    assert_eq!(resumed.steps[..suspended.steps.len()], suspended.steps[..]);

    let done = run_code(&sandbox, &second.resumed("7"));
    assert!(!done.needs_input);
    assert_eq!(done.error, None);
    assert_eq!(done.steps[..resumed.steps.len()], resumed.steps[..]);
    let last = done.steps.last().expect("steps");
    assert_eq!(last.explanation, Step::FINISHED);
    assert_eq!(last.stdout, "first?\nsecond?\n12\n");
}

#[test]
fn test_object_ids_are_stable_across_replays() {
    let source = "xs = [1]\nname = input()\nxs.append(name)\n";
    let sandbox = InProcessSandbox::default();
    let request = TraceRequest::new(source, StepBudget::default(), Vec::new());
    let suspended = run_code(&sandbox, &request);
    let resumed = run_code(&sandbox, &request.resumed("z"));

    let id_before = suspended.steps.last().and_then(|s| s.variables["xs"].id.clone());
    let id_after = resumed.steps.last().and_then(|s| s.variables["xs"].id.clone());
    assert!(id_before.is_some());
    assert_eq!(id_before, id_after);
}

#[test]
fn test_extra_inputs_are_ignored() {
    let request = TraceRequest::new(
        "x = input()\nprint(x)\n",
        StepBudget::default(),
        vec!["a".into(), "b".into()],
    );
    let result = run_code(&InProcessSandbox::default(), &request);
    assert!(!result.needs_input);
    assert_eq!(result.steps.last().map(|s| s.stdout.as_str()), Some("a\n"));
}
