// Limits for the script interpreter

/// Default maximum call depth before `RecursionError`
pub const DEFAULT_MAX_CALL_DEPTH: usize = 500;

/// Nested expression evaluations (counted across calls) before
/// `RecursionError`
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Default maximum number of live heap objects before `MemoryError`
pub const DEFAULT_MAX_OBJECTS: usize = 1_000_000;

/// Largest sequence a single operation may materialize (`list(range(n))`,
/// `[0] * n`, ...)
pub const MAX_MATERIALIZED_ITEMS: usize = 10_000_000;
