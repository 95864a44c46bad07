use super::*;
use crate::memory::format::py_repr;
use crate::memory::value::Value;
use crate::parser::parse_program;
use crate::parser::rewrite::track_list_literals;

fn interpreter_with(source: &str, inputs: &[&str], limits: Limits) -> (Interpreter<()>, Result<(), RuntimeError>) {
    let program = track_list_literals(parse_program(source).expect("parse"));
    let queue = InputQueue::new(inputs.iter().map(|s| s.to_string()));
    let mut interp = Interpreter::new((), queue, limits);
    let result = interp.run(&program);
    (interp, result)
}

fn run(source: &str) -> Interpreter<()> {
    let (interp, result) = interpreter_with(source, &[], Limits::default());
    result.expect("program should run");
    interp
}

fn output(source: &str) -> String {
    run(source).stdout().to_string()
}

fn error(source: &str) -> String {
    let (_, result) = interpreter_with(source, &[], Limits::default());
    result.expect_err("program should fail").to_string()
}

fn global_repr(interp: &Interpreter<()>, name: &str) -> String {
    let value = interp.global(name).unwrap_or(Value::None);
    py_repr(&interp.heap, &value)
}

#[test]
fn test_arithmetic_and_print() {
    assert_eq!(output("print(1 + 2 * 3, 7 // 2, -7 // 2, 7 % -3)"), "7 3 -4 -2\n");
    assert_eq!(output("print(1 / 2, 2 ** 10, 10 / 5)"), "0.5 1024 2.0\n");
    assert_eq!(output("print('a', 'b', sep='-', end='!')"), "a-b!");
}

#[test]
fn test_globals_after_run() {
    let interp = run("x = 5\ny = [1, 2, 3]\nz = {'a': (1, 2)}\n");
    assert_eq!(interp.global("x"), Some(Value::Int(5)));
    assert_eq!(global_repr(&interp, "y"), "[1, 2, 3]");
    assert_eq!(global_repr(&interp, "z"), "{'a': (1, 2)}");
}

#[test]
fn test_control_flow() {
    let source = "\
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 7:
        break
    total += i
n = 0
while n < 3:
    n += 1
print(total, n)
";
    assert_eq!(output(source), "16 3\n");
}

#[test]
fn test_functions_defaults_and_keywords() {
    let source = "\
def greet(name, greeting='hello'):
    return greeting + ', ' + name

print(greet('ann'))
print(greet('bob', greeting='hi'))
";
    assert_eq!(output(source), "hello, ann\nhi, bob\n");
}

#[test]
fn test_missing_argument_message() {
    let source = "def f(a, b):\n    return a\nf(1)\n";
    assert_eq!(
        error(source),
        "TypeError: f() missing 1 required positional argument: 'b'"
    );
}

#[test]
fn test_recursion() {
    let source = "\
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)
print(fact(10))
";
    assert_eq!(output(source), "3628800\n");
}

#[test]
fn test_recursion_limit() {
    let limits = Limits {
        max_call_depth: 40,
        ..Limits::default()
    };
    let (_, result) = interpreter_with("def f(n):\n    return f(n + 1)\nf(0)\n", &[], limits);
    assert!(matches!(result, Err(RuntimeError::RecursionLimit { .. })));
}

#[test]
fn test_eval_depth_is_capped() {
    let program = parse_program("x = 1\n").expect("parse");
    let mut interp = Interpreter::new((), InputQueue::new(Vec::new()), Limits::default());
    interp.eval_depth = crate::interpreter::constants::MAX_EVAL_DEPTH;
    let result = interp.run(&program);
    assert!(matches!(result, Err(RuntimeError::RecursionLimit { .. })));
    assert_eq!(interp.eval_depth, crate::interpreter::constants::MAX_EVAL_DEPTH);
}

#[test]
fn test_closures_and_lambda() {
    let source = "\
def make_adder(k):
    def add(x):
        return x + k
    return add

add3 = make_adder(3)
square = lambda v: v * v
print(add3(4), square(5))
";
    assert_eq!(output(source), "7 25\n");
}

#[test]
fn test_classes_and_inheritance() {
    let source = "\
class Animal:
    def __init__(self, name):
        self.name = name
    def speak(self):
        return self.name + ' makes a sound'

class Dog(Animal):
    def __init__(self, name):
        super().__init__(name)
        self.tricks = []
    def speak(self):
        return super().speak() + ' (woof)'

d = Dog('rex')
d.tricks.append('sit')
print(d.speak(), d.tricks, isinstance(d, Animal))
";
    assert_eq!(output(source), "rex makes a sound (woof) ['sit'] True\n");
}

#[test]
fn test_dunder_methods() {
    let source = "\
class Vec:
    def __init__(self, x, y):
        self.x = x
        self.y = y
    def __add__(self, other):
        return Vec(self.x + other.x, self.y + other.y)
    def __eq__(self, other):
        return self.x == other.x and self.y == other.y
    def __repr__(self):
        return f'Vec({self.x}, {self.y})'

v = Vec(1, 2) + Vec(3, 4)
print(v, v == Vec(4, 6))
";
    assert_eq!(output(source), "Vec(4, 6) True\n");
}

#[test]
fn test_list_methods() {
    let source = "\
a = [3, 1, 2]
a.append(5)
a.insert(0, 9)
a.sort()
b = a.copy()
b.reverse()
print(a, b, a.pop(), a.index(2), a.count(1))
";
    // `a.pop()` runs before print renders `a`
    assert_eq!(output(source), "[1, 2, 3, 5] [9, 5, 3, 2, 1] 9 1 1\n");
}

#[test]
fn test_sort_with_key_and_reverse() {
    let source = "\
words = ['pear', 'fig', 'banana']
words.sort(key=len, reverse=True)
print(words, sorted([3, 1, 2]))
";
    assert_eq!(output(source), "['banana', 'pear', 'fig'] [1, 2, 3]\n");
}

#[test]
fn test_dict_methods() {
    let source = "\
d = {'a': 1}
d['b'] = 2
d.setdefault('c', 3)
print(d.get('z', 0), d.keys(), d.values(), d.pop('a'), d)
";
    assert_eq!(output(source), "0 ['a', 'b', 'c'] [1, 2, 3] 1 {'b': 2, 'c': 3}\n");
}

#[test]
fn test_key_error_uses_repr() {
    assert_eq!(error("d = {}\nd['x']\n"), "KeyError: 'x'");
}

#[test]
fn test_string_methods() {
    let source = "\
s = '  Hello, World  '
t = s.strip()
print(t.lower(), t.split(', '), '-'.join(['a', 'b']), t.find('World'), t.replace('l', 'L'))
";
    assert_eq!(
        output(source),
        "hello, world ['Hello', 'World'] a-b 7 HeLLo, WorLd\n"
    );
}

#[test]
fn test_slicing() {
    let source = "\
a = [0, 1, 2, 3, 4, 5]
print(a[1:4], a[::-2], a[-2:], 'abcdef'[::2])
a[1:3] = [9]
del a[0]
print(a)
";
    assert_eq!(output(source), "[1, 2, 3] [5, 3, 1] [4, 5] ace\n[9, 3, 4, 5]\n");
}

#[test]
fn test_comprehensions() {
    let source = "\
squares = [x * x for x in range(5) if x % 2 == 0]
index = {w: len(w) for w in ['ab', 'c']}
print(squares, index)
";
    assert_eq!(output(source), "[0, 4, 16] {'ab': 2, 'c': 1}\n");
}

#[test]
fn test_tuple_unpacking() {
    let source = "\
a, b = 1, 2
a, b = b, a
for i, (x, y) in enumerate([(1, 2), (3, 4)]):
    print(i, x + y)
print(a, b)
";
    assert_eq!(output(source), "0 3\n1 7\n2 1\n");
}

#[test]
fn test_unpack_mismatch() {
    assert_eq!(
        error("a, b = [1, 2, 3]\n"),
        "ValueError: too many values to unpack (expected 2)"
    );
}

#[test]
fn test_fstrings_and_format() {
    let source = "\
x = 3.14159
name = 'pi'
print(f'{name}={x:.2f}', '{} and {}'.format(1, 'two'), f'{7:>3}|')
";
    assert_eq!(output(source), "pi=3.14 1 and two   7|\n");
}

#[test]
fn test_modules() {
    let source = "\
import math
from collections import deque
import heapq

q = deque([1, 2])
q.appendleft(0)
h = [5, 1, 3]
heapq.heapify(h)
print(math.sqrt(16), q.popleft(), heapq.heappop(h), math.gcd(12, 18))
";
    assert_eq!(output(source), "4.0 0 1 6\n");
}

#[test]
fn test_defaultdict() {
    let source = "\
from collections import defaultdict
counts = defaultdict(int)
for ch in 'abca':
    counts[ch] += 1
print(counts['a'], counts['z'], len(counts))
";
    assert_eq!(output(source), "2 0 4\n");
}

#[test]
fn test_unknown_module() {
    assert_eq!(error("import os\n"), "ModuleNotFoundError: No module named 'os'");
}

#[test]
fn test_input_queue() {
    let source = "a = input()\nb = input('prompt: ')\nprint(a + b)\n";
    let (interp, result) = interpreter_with(source, &["x", "y"], Limits::default());
    assert!(result.is_ok());
    assert_eq!(interp.stdout(), "xy\n");
}

#[test]
fn test_input_suspends_when_queue_empty() {
    let source = "print('start')\na = input()\nprint(a)\n";
    let (interp, result) = interpreter_with(source, &[], Limits::default());
    assert!(matches!(result, Err(RuntimeError::NeedsInput { .. })));
    assert_eq!(interp.stdout(), "start\n");
}

#[test]
fn test_runtime_errors() {
    assert_eq!(error("print(1 / 0)\n"), "ZeroDivisionError: division by zero");
    assert_eq!(error("print(undefined)\n"), "NameError: name 'undefined' is not defined");
    assert_eq!(error("[1, 2][5]\n"), "IndexError: list index out of range");
    assert_eq!(
        error("'a' + 1\n"),
        "TypeError: can only concatenate str (not \"int\") to str"
    );
}

#[test]
fn test_raise_and_assert() {
    assert_eq!(error("raise ValueError('bad input')\n"), "ValueError: bad input");
    assert_eq!(error("assert 1 == 2, 'nope'\n"), "AssertionError: nope");
}

#[test]
fn test_custom_exception() {
    let source = "\
class StackEmpty(Exception):
    pass
raise StackEmpty('nothing to pop')
";
    assert_eq!(error(source), "StackEmpty: nothing to pop");
}

#[test]
fn test_integer_overflow() {
    let message = error("x = 2 ** 70\n");
    assert!(message.starts_with("OverflowError"), "{}", message);
}

#[test]
fn test_return_outside_function() {
    let message = error("return 5\n");
    assert!(message.starts_with("SyntaxError"), "{}", message);
}

#[test]
fn test_tracked_lists_log_index_access() {
    let source = "a = [10, 20, 30]\nx = a[1]\na[2] = x\nb = list(a)\ny = b[0]\n";
    let interp = run(source);
    let events = interp.access_log.drain();
    let kinds: Vec<_> = events.iter().map(|e| (e.kind, e.index)).collect();
    use crate::snapshot::AccessKind;
    assert_eq!(kinds, vec![(AccessKind::Read, 1), (AccessKind::Write, 2)]);
}

#[test]
fn test_linked_structure() {
    let source = "\
class Node:
    def __init__(self, value, next=None):
        self.value = value
        self.next = next

head = Node(1, Node(2, Node(3)))
total = 0
node = head
while node is not None:
    total += node.value
    node = node.next
print(total)
";
    assert_eq!(output(source), "6\n");
}

#[test]
fn test_builtins() {
    let source = "\
print(len('abc'), abs(-3), min(4, 2, 8), max([1, 9, 3]), sum(range(5)))
print(list(zip([1, 2], 'ab')), list(map(str, [1, 2])), any([0, 1]), all([]))
print(int('42') + 1, float('2.5'), str(7), round(2.675, 2), divmod(7, 2))
";
    assert_eq!(
        output(source),
        "3 3 2 9 10\n[(1, 'a'), (2, 'b')] ['1', '2'] True True\n43 2.5 7 2.67 (3, 1)\n"
    );
}

#[test]
fn test_round_with_digits() {
    assert_eq!(
        output("print(round(2.675, 2), round(3.14159, 3), round(2.5), round(-1.5), round(1.23456, 0))"),
        "2.67 3.142 2 -2 1.0\n"
    );
    assert_eq!(
        output("print(round(1234, -2), round(1250, -2), round(1350, -2), round(-1250, -2), round(7, 2))"),
        "1200 1200 1400 -1200 7\n"
    );
    assert_eq!(output("print(round(1234.5, -2), round(5, -20))"), "1200.0 0\n");
}

#[test]
fn test_sets() {
    let source = "\
s = {1, 2, 3}
s.add(4)
s.discard(1)
print(2 in s, len(s), sorted(s.union({9})))
";
    assert_eq!(output(source), "True 3 [2, 3, 4, 9]\n");
}
